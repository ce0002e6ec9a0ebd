//! Lock-free collection of outbound messages from tracks.
//!
//! Each track owns the producer half of a ring buffer; the device layer
//! drains the consumer halves, optionally through one aggregator.

use parking_lot::Mutex;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use tracing::warn;

use crate::output::{MidiOutputMessage, MidiSink};

const DEFAULT_CAPACITY: usize = 1024;

/// Producer side, owned by a track.
pub struct MidiOutputProducer {
    producer: HeapProd<MidiOutputMessage>,
}

impl MidiOutputProducer {
    /// Returns the message back if the ring buffer is full.
    #[inline]
    pub fn push(&mut self, message: MidiOutputMessage) -> Result<(), MidiOutputMessage> {
        self.producer.try_push(message)
    }
}

/// Consumer side, drained by the device layer.
pub struct MidiOutputConsumer {
    consumer: HeapCons<MidiOutputMessage>,
}

impl MidiOutputConsumer {
    #[inline]
    pub fn pop(&mut self) -> Option<MidiOutputMessage> {
        self.consumer.try_pop()
    }

    pub fn drain_all(&mut self) -> Vec<MidiOutputMessage> {
        let mut messages = Vec::with_capacity(self.consumer.occupied_len());
        while let Some(message) = self.consumer.try_pop() {
            messages.push(message);
        }
        messages
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.consumer.is_empty()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.consumer.occupied_len()
    }
}

pub fn midi_output_channel() -> (MidiOutputProducer, MidiOutputConsumer) {
    midi_output_channel_with_capacity(DEFAULT_CAPACITY)
}

pub fn midi_output_channel_with_capacity(
    capacity: usize,
) -> (MidiOutputProducer, MidiOutputConsumer) {
    let rb = HeapRb::new(capacity);
    let (producer, consumer) = rb.split();
    (
        MidiOutputProducer { producer },
        MidiOutputConsumer { consumer },
    )
}

/// Merges multiple `MidiOutputConsumer`s into a single drain point.
pub struct MidiOutputAggregator {
    consumers: Mutex<Vec<MidiOutputConsumer>>,
}

impl MidiOutputAggregator {
    pub fn new() -> Self {
        Self {
            consumers: Mutex::new(Vec::new()),
        }
    }

    pub fn add_consumer(&self, consumer: MidiOutputConsumer) {
        self.consumers.lock().push(consumer);
    }

    /// Uses `try_lock` so the device thread never blocks.
    pub fn drain_all(&self) -> Vec<MidiOutputMessage> {
        let Some(mut consumers) = self.consumers.try_lock() else {
            return Vec::new();
        };
        consumers
            .iter_mut()
            .flat_map(|consumer| consumer.drain_all())
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        match self.consumers.try_lock() {
            Some(consumers) => consumers.iter().any(|c| c.has_pending()),
            None => false,
        }
    }
}

impl Default for MidiOutputAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// A track's outputs: the primary device and an optional tuning-only device.
///
/// SysEx tuning data goes to the tuning output when one is set, leaving
/// performance messages alone on the primary output. Messages that do not
/// fit are dropped.
pub struct TrackOutput {
    primary: MidiOutputProducer,
    tuning: Option<MidiOutputProducer>,
    dropped: usize,
}

impl TrackOutput {
    pub fn new(primary: MidiOutputProducer) -> Self {
        Self {
            primary,
            tuning: None,
            dropped: 0,
        }
    }

    pub fn with_tuning_output(mut self, tuning: MidiOutputProducer) -> Self {
        self.tuning = Some(tuning);
        self
    }

    /// Messages lost to full ring buffers so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn push(producer: &mut MidiOutputProducer, dropped: &mut usize, message: MidiOutputMessage) {
        if producer.push(message).is_err() {
            *dropped += 1;
            warn!(dropped = *dropped, "MIDI output buffer full, message dropped");
        }
    }
}

impl MidiSink for TrackOutput {
    fn send(&mut self, message: MidiOutputMessage) {
        Self::push(&mut self.primary, &mut self.dropped, message);
    }

    fn send_tuning(&mut self, message: MidiOutputMessage) {
        match self.tuning.as_mut() {
            Some(tuning) => Self::push(tuning, &mut self.dropped, message),
            None => Self::push(&mut self.primary, &mut self.dropped, message),
        }
    }
}
