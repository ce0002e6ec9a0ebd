//! XentuneEngine that coordinates the tuning list and MIDI tracks

use std::sync::Arc;

use xentune_tuning::TuningList;

#[cfg(feature = "midi")]
use crate::Result;
#[cfg(feature = "midi")]
use crossbeam_channel::Receiver;
#[cfg(feature = "midi")]
use parking_lot::Mutex;
#[cfg(feature = "midi")]
use std::thread::JoinHandle;
#[cfg(feature = "midi")]
use tracing::{info, warn};
#[cfg(feature = "midi")]
use xentune_tuning::Tuning;
#[cfg(feature = "midi")]
use xentune_midi::{
    MidiTrackBuilder, TrackHandle, TrackMessage, TuningChange, TuningChangeRequest,
    TuningNavigator,
};

/// Main engine that owns a resolved tuning list and the tracks playing it.
///
/// With the `midi` feature, the engine holds the shared navigator: UI calls
/// (`next`, `previous`, `jump`) and pedal presses on any track move the same
/// current index, and every track retunes when it changes. Dropping the
/// engine shuts all tracks down and waits for their threads.
///
/// # Example
///
/// ```ignore
/// use xentune::prelude::*;
///
/// let engine = XentuneEngine::builder().composition(composition).build()?;
///
/// let (producer, consumer) = midi_output_channel();
/// let lead = engine.add_track(
///     MidiTrack::builder("lead")
///         .tuner(TunerSettings::mono_pitch_bend(vec![0]))
///         .pedal(PedalSettings::default())
///         .output(producer),
/// )?;
///
/// lead.send_midi(MidiEvent::note_on(0, 64, 100))?;
/// engine.next();
/// ```
pub struct XentuneEngine {
    tunings: Arc<TuningList>,

    #[cfg(feature = "midi")]
    navigator: Arc<TuningNavigator>,

    /// Spawned tracks and their threads
    #[cfg(feature = "midi")]
    tracks: Mutex<Vec<(TrackHandle, JoinHandle<()>)>>,
}

impl XentuneEngine {
    /// Create a new engine builder
    pub fn builder() -> crate::XentuneEngineBuilder {
        crate::XentuneEngineBuilder::default()
    }

    pub(crate) fn from_parts(
        tunings: Arc<TuningList>,
        #[cfg(feature = "midi")] navigator: Arc<TuningNavigator>,
    ) -> Self {
        Self {
            tunings,
            #[cfg(feature = "midi")]
            navigator,
            #[cfg(feature = "midi")]
            tracks: Mutex::new(Vec::new()),
        }
    }

    pub fn tunings(&self) -> &Arc<TuningList> {
        &self.tunings
    }

    pub fn tuning_names(&self) -> Vec<String> {
        self.tunings.names()
    }

    pub fn tuning_count(&self) -> usize {
        self.tunings.len()
    }
}

// =============================================================================
// Navigation
// =============================================================================

#[cfg(feature = "midi")]
impl XentuneEngine {
    pub fn navigator(&self) -> &Arc<TuningNavigator> {
        &self.navigator
    }

    pub fn current_index(&self) -> usize {
        self.navigator.current_index()
    }

    /// The tuning currently sounding, after memory fill if enabled.
    pub fn current_tuning(&self) -> Arc<Tuning> {
        self.navigator.current_tuning()
    }

    /// Next tuning, wrapping to the first.
    pub fn next(&self) -> Option<TuningChange> {
        self.navigator.next()
    }

    /// Previous tuning, wrapping to the last.
    pub fn previous(&self) -> Option<TuningChange> {
        self.navigator.previous()
    }

    /// Index past the end selects the last tuning.
    pub fn jump(&self, index: usize) -> Option<TuningChange> {
        self.navigator.jump(index)
    }

    pub fn apply(&self, request: TuningChangeRequest) -> Option<TuningChange> {
        self.navigator.apply(request)
    }

    /// Receives `old -> new` index changes from every source.
    pub fn subscribe(&self) -> Receiver<TuningChange> {
        self.navigator.subscribe()
    }
}

// =============================================================================
// Tracks
// =============================================================================

#[cfg(feature = "midi")]
impl XentuneEngine {
    /// Wires the track to the navigator, connects it and starts its thread.
    ///
    /// `Connect` is queued before the thread exists, so a failure leaves no
    /// thread behind.
    pub fn add_track(&self, builder: MidiTrackBuilder) -> Result<TrackHandle> {
        let (track, handle) = builder.navigator(Arc::clone(&self.navigator)).build()?;
        handle.send(TrackMessage::Connect)?;
        let join = track.spawn()?;
        info!(track = handle.name(), "Track added");
        self.tracks.lock().push((handle.clone(), join));
        Ok(handle)
    }

    pub fn track_names(&self) -> Vec<String> {
        self.tracks
            .lock()
            .iter()
            .map(|(handle, _)| handle.name().to_string())
            .collect()
    }

    /// Stops every track, leaving devices in 12-EDO.
    pub fn shutdown(&self) {
        let tracks = std::mem::take(&mut *self.tracks.lock());
        for (handle, _) in &tracks {
            // A track that already stopped has nothing left to restore.
            let _ = handle.shutdown();
        }
        for (handle, join) in tracks {
            if join.join().is_err() {
                warn!(track = handle.name(), "Track thread panicked");
            }
        }
    }
}

#[cfg(feature = "midi")]
impl Drop for XentuneEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for XentuneEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("XentuneEngine");
        s.field("tunings", &self.tunings.names());
        #[cfg(feature = "midi")]
        s.field("current_index", &self.navigator.current_index())
            .field("tracks", &self.tracks.lock().len());
        s.finish()
    }
}
