//! Per-track processing loop.
//!
//! A [`MidiTrack`] owns one tuner, an optional pedal changer and its outputs.
//! Everything that touches it arrives through a single bounded queue, so
//! events from several inputs are handled strictly in order without locking
//! the track state. Tuning changes from the shared navigator arrive on a
//! second channel and are applied between messages.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, never, select, Receiver, Sender, TrySendError};
use tracing::{debug, info};

use xentune_tuning::Tuning;

use crate::error::{Error, Result};
use crate::event::MidiEvent;
use crate::navigator::{TuningChange, TuningNavigator};
use crate::output_collector::{MidiOutputProducer, TrackOutput};
use crate::trigger::{PedalSettings, PedalTuningChanger};
use crate::tuner::{Tuner, TunerSettings};

const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Messages a track accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMessage {
    Midi(MidiEvent),
    /// Prepare the device and send the current tuning.
    Connect,
    /// Restore the device to 12-EDO.
    Disconnect,
    /// Disconnect if needed and stop the loop.
    Shutdown,
}

/// Sending side of a track's queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TrackHandle {
    name: Arc<str>,
    sender: Sender<TrackMessage>,
}

impl TrackHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueues without blocking.
    pub fn send(&self, message: TrackMessage) -> Result<()> {
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => Error::TrackQueueFull(self.name.to_string()),
            TrySendError::Disconnected(_) => Error::TrackClosed(self.name.to_string()),
        })
    }

    pub fn send_midi(&self, event: MidiEvent) -> Result<()> {
        self.send(TrackMessage::Midi(event))
    }

    /// Waits for queue space so the stop request is never lost.
    pub fn shutdown(&self) -> Result<()> {
        self.sender
            .send(TrackMessage::Shutdown)
            .map_err(|_| Error::TrackClosed(self.name.to_string()))
    }
}

/// Where a track gets its tuning from.
enum TuningSource {
    Fixed,
    Navigator {
        navigator: Arc<TuningNavigator>,
        changes: Receiver<TuningChange>,
    },
}

pub struct MidiTrack {
    name: Arc<str>,
    tuner: Tuner,
    pedal: Option<PedalTuningChanger>,
    source: TuningSource,
    tuning: Arc<Tuning>,
    output: TrackOutput,
    queue: Receiver<TrackMessage>,
    connected: bool,
}

impl MidiTrack {
    pub fn builder(name: impl Into<String>) -> MidiTrackBuilder {
        MidiTrackBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tuner(&self) -> &Tuner {
        &self.tuner
    }

    pub fn tuning(&self) -> &Arc<Tuning> {
        &self.tuning
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Outbound messages lost to full output buffers.
    pub fn dropped(&self) -> usize {
        self.output.dropped()
    }

    /// Handles one message. Breaks after [`TrackMessage::Shutdown`].
    pub fn process(&mut self, message: TrackMessage) -> ControlFlow<()> {
        self.sync_tuning();
        match message {
            TrackMessage::Midi(event) => self.process_event(&event),
            TrackMessage::Connect => {
                if !self.connected {
                    self.tuner.connect(&self.tuning, &mut self.output);
                    self.connected = true;
                    debug!(track = %self.name, "Track connected");
                }
            }
            TrackMessage::Disconnect => self.disconnect(),
            TrackMessage::Shutdown => {
                self.disconnect();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Drains the queue without blocking.
    pub fn process_pending(&mut self) -> ControlFlow<()> {
        self.sync_tuning();
        while let Ok(message) = self.queue.try_recv() {
            self.process(message)?;
        }
        ControlFlow::Continue(())
    }

    /// Runs the loop on a named thread until shutdown or until every handle
    /// is dropped.
    pub fn spawn(mut self) -> Result<JoinHandle<()>> {
        let thread_name = format!("xentune-track-{}", self.name);
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || self.run())?;
        Ok(handle)
    }

    fn run(&mut self) {
        info!(track = %self.name, tuner = self.tuner.kind(), "Track started");
        let queue = self.queue.clone();
        let changes = match &self.source {
            TuningSource::Navigator { changes, .. } => changes.clone(),
            TuningSource::Fixed => never(),
        };

        loop {
            select! {
                recv(queue) -> message => match message {
                    Ok(message) => {
                        if self.process(message).is_break() {
                            break;
                        }
                    }
                    Err(_) => {
                        self.disconnect();
                        break;
                    }
                },
                recv(changes) -> change => match change {
                    Ok(change) => self.retune(change.tuning),
                    Err(_) => break,
                },
            }
        }
        info!(track = %self.name, dropped = self.output.dropped(), "Track stopped");
    }

    fn process_event(&mut self, event: &MidiEvent) {
        if let Some(pedal) = self.pedal.as_mut() {
            let outcome = pedal.process(event);
            if let Some(request) = outcome.request {
                if let TuningSource::Navigator { navigator, .. } = &self.source {
                    navigator.apply(request);
                }
                self.sync_tuning();
            }
            if !outcome.forward {
                return;
            }
        }
        self.tuner.process(event, &mut self.output);
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.tuner.disconnect(&mut self.output);
            self.connected = false;
            debug!(track = %self.name, "Track disconnected");
        }
    }

    /// Applies the latest pending navigator change, skipping intermediate ones.
    fn sync_tuning(&mut self) {
        let TuningSource::Navigator { changes, .. } = &self.source else {
            return;
        };
        let latest = changes.try_iter().last();
        if let Some(change) = latest {
            self.retune(change.tuning);
        }
    }

    fn retune(&mut self, tuning: Arc<Tuning>) {
        if Arc::ptr_eq(&tuning, &self.tuning) {
            return;
        }
        self.tuning = tuning;
        if self.connected {
            self.tuner.tune(&self.tuning, &mut self.output);
        }
    }
}

impl std::fmt::Debug for MidiTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiTrack")
            .field("name", &self.name)
            .field("tuner", &self.tuner.kind())
            .field("tuning", &self.tuning.name())
            .field("connected", &self.connected)
            .finish()
    }
}

/// Builder for [`MidiTrack`].
///
/// # Example
/// ```ignore
/// let (producer, consumer) = midi_output_channel();
/// let (track, handle) = MidiTrack::builder("lead")
///     .tuner(TunerSettings::mono_pitch_bend(vec![0]))
///     .pedal(PedalSettings::default())
///     .navigator(navigator)
///     .output(producer)
///     .build()?;
/// ```
pub struct MidiTrackBuilder {
    name: String,
    tuner: TunerSettings,
    pedal: Option<PedalSettings>,
    navigator: Option<Arc<TuningNavigator>>,
    tuning: Option<Tuning>,
    output: Option<MidiOutputProducer>,
    tuning_output: Option<MidiOutputProducer>,
    queue_capacity: usize,
}

impl MidiTrackBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tuner: TunerSettings::default(),
            pedal: None,
            navigator: None,
            tuning: None,
            output: None,
            tuning_output: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default: MTS, non-real-time 1-byte, all channels
    pub fn tuner(mut self, settings: TunerSettings) -> Self {
        self.tuner = settings;
        self
    }

    pub fn pedal(mut self, settings: PedalSettings) -> Self {
        self.pedal = Some(settings);
        self
    }

    /// Follow the navigator's current tuning.
    pub fn navigator(mut self, navigator: Arc<TuningNavigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn has_navigator(&self) -> bool {
        self.navigator.is_some()
    }

    /// Fixed tuning when no navigator is set. Default: 12-EDO
    pub fn tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = Some(tuning);
        self
    }

    pub fn output(mut self, producer: MidiOutputProducer) -> Self {
        self.output = Some(producer);
        self
    }

    /// Separate device receiving only tuning SysEx.
    pub fn tuning_output(mut self, producer: MidiOutputProducer) -> Self {
        self.tuning_output = Some(producer);
        self
    }

    /// Default: 256
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<(MidiTrack, TrackHandle)> {
        let tuner = Tuner::from_settings(&self.tuner)?;
        let pedal = self
            .pedal
            .as_ref()
            .map(PedalTuningChanger::from_settings)
            .transpose()?;
        if pedal.is_some() && self.navigator.is_none() {
            return Err(Error::InvalidConfig(format!(
                "track '{}' has a tuning changer but no tuning list to navigate",
                self.name
            )));
        }
        let Some(primary) = self.output else {
            return Err(Error::InvalidConfig(format!(
                "track '{}' has no output",
                self.name
            )));
        };
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfig(
                "track queue capacity must be greater than zero".to_string(),
            ));
        }

        let mut output = TrackOutput::new(primary);
        if let Some(tuning_output) = self.tuning_output {
            output = output.with_tuning_output(tuning_output);
        }

        let (source, tuning) = match self.navigator {
            Some(navigator) => {
                let changes = navigator.subscribe();
                let tuning = navigator.current_tuning();
                (TuningSource::Navigator { navigator, changes }, tuning)
            }
            None => (
                TuningSource::Fixed,
                Arc::new(self.tuning.unwrap_or_else(Tuning::equal_temperament)),
            ),
        };

        let (sender, queue) = bounded(self.queue_capacity);
        let name: Arc<str> = Arc::from(self.name);
        let track = MidiTrack {
            name: Arc::clone(&name),
            tuner,
            pedal,
            source,
            tuning,
            output,
            queue,
            connected: false,
        };
        Ok((track, TrackHandle { name, sender }))
    }
}

impl std::fmt::Debug for MidiTrackBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiTrackBuilder")
            .field("name", &self.name)
            .field("tuner", &self.tuner)
            .field("pedal", &self.pedal)
            .finish()
    }
}
