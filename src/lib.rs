//! # Xentune - Microtonal Tuning Engine
//!
//! Resolves scale-based compositions into keyboard tunings and plays them
//! through MIDI devices.
//!
//! ## Architecture
//!
//! Xentune is an umbrella crate that coordinates:
//! - **xentune-tuning** - Tuning pipeline (intervals, mappers, fills, reducers, tuning lists)
//! - **xentune-midi** - MIDI output (MTS SysEx, pitch-bend tuning, pedal navigation, tracks)
//!
//! ## Quick Start
//!
//! ```ignore
//! use xentune::prelude::*;
//!
//! let composition = Composition::new(TuningReference::standard(PitchClass::D))
//!     .with_spec(TuningSpec::new(minor))
//!     .with_spec(TuningSpec::new(major).transposed(Interval::ratio(8, 5)?));
//!
//! let engine = XentuneEngine::builder().composition(composition).build()?;
//!
//! let (producer, consumer) = midi_output_channel();
//! let track = engine.add_track(
//!     MidiTrack::builder("synth")
//!         .tuner(TunerSettings::mts(MtsFormat::RealTime2Byte))
//!         .output(producer),
//! )?;
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Tuning pipeline and MIDI output
//! - `midi` - MIDI output layer

/// Re-export of xentune-tuning for direct access
pub use xentune_tuning as tuning;

pub use xentune_tuning::{
    build_tuning_list, Composition, FillSettings, GlobalFill, Interval, KeyMapping,
    MapperSettings, MemoryFill, PartialTuning, PitchClass, ReducerSettings, Scale,
    SoftChromaticGenus, Tuning, TuningList, TuningMapper, TuningReducer, TuningReference,
    TuningSpec,
};

// MIDI subsystem
#[cfg(feature = "midi")]
pub use xentune_midi as midi;

#[cfg(feature = "midi")]
pub use xentune_midi::{
    midi_output_channel, MidiEvent, MidiOutputConsumer, MidiOutputMessage, MidiTrack,
    MidiTrackBuilder, MtsFormat, PedalSettings, TrackHandle, TrackMessage, TunerSettings,
    TuningChange, TuningChangeRequest, TuningNavigator,
};

mod error;
pub use error::{Error, Result};

mod builder;
mod engine;

pub use builder::XentuneEngineBuilder;
pub use engine::XentuneEngine;

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{XentuneEngine, XentuneEngineBuilder};

    // Composition model
    pub use crate::tuning::{
        Composition, GlobalFill, Interval, PitchClass, ReducerSettings, Scale, Tuning,
        TuningReference, TuningSpec,
    };

    // MIDI
    #[cfg(feature = "midi")]
    pub use crate::midi::{
        midi_output_channel, MidiEvent, MidiTrack, MtsFormat, PedalSettings, TunerSettings,
    };
}
