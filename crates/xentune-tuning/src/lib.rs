//! Tuning resolution pipeline for Xentune.
//!
//! Turns a [`Composition`] (ordered scales with transpositions) into an
//! immutable [`TuningList`]: each scale is mapped onto the 12 keyboard pitch
//! classes, gaps are filled, and consecutive tunings are optionally merged.
//!
//! Everything here runs once at load time and performs no I/O.

pub mod error;
pub use error::{Error, Result};

pub mod interval;
pub use interval::{
    cents_to_hz, cents_to_real_value, hz_to_cents, ratio_to_cents, real_value_to_cents, Interval,
};

pub mod pitch_class;
pub use pitch_class::{
    round_with_tolerance, PitchClass, OCTAVE_CENTS, PITCH_CLASS_COUNT, SEMITONE_CENTS,
};

pub mod reference;
pub use reference::{TuningReference, CONCERT_A_HZ, CONCERT_A_NOTE};

pub mod tuning;
pub use tuning::{PartialTuning, Tuning, TuningList, MAX_DEVIATION_CENTS};

pub mod composition;
pub use composition::{
    Composition, FillSettings, GlobalFill, KeyMapping, MapperSettings, ReducerSettings, Scale,
    SoftChromaticGenus, TuningSpec,
};

pub mod mapper;
pub use mapper::{AutoMapper, ManualMapper, TuningMapper};

pub mod fill;
pub use fill::{local_fill, MemoryFill};

pub mod reducer;
pub use reducer::TuningReducer;

pub mod registry;

pub(crate) mod assembly;
pub use assembly::build_tuning_list;
