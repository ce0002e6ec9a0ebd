//! MIDI output layer for Xentune.
//!
//! Carries resolved tunings to devices: MTS SysEx, monophonic pitch-bend
//! retuning, and pedal-driven navigation through a tuning list. Each track
//! processes its events on a single-consumer queue and writes into lock-free
//! output buffers drained by the device layer.

pub mod error;
pub use error::{Error, Result};

pub(crate) mod event;
pub use event::MidiEvent;

pub use midi_msg::{Channel, ChannelVoiceMsg, ControlChange, MidiMsg};

pub mod output;
pub use output::{MidiOutputMessage, MidiSink};

pub mod output_collector;
pub use output_collector::{
    midi_output_channel, midi_output_channel_with_capacity, MidiOutputAggregator,
    MidiOutputConsumer, MidiOutputProducer, TrackOutput,
};

pub mod mts;
pub use mts::{ChannelMask, MtsEncoder, MtsFormat};

pub mod pitch_bend;
pub use pitch_bend::{MonoPitchBendTuner, NoteState, PitchBendSensitivity};

pub mod trigger;
pub use trigger::{
    PedalSettings, PedalTuningChanger, TriggerOutcome, TriggerState, TuningChangeRequest,
};

pub mod tuner;
pub use tuner::{tuner_ids, MtsTuner, Tuner, TunerSettings};

pub mod navigator;
pub use navigator::{ActiveTuning, TuningChange, TuningNavigator};

pub mod track;
pub use track::{MidiTrack, MidiTrackBuilder, TrackHandle, TrackMessage};
