//! Centralized error type for the xentune umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Tuning(#[from] xentune_tuning::Error),

    #[cfg(feature = "midi")]
    #[error("MIDI: {0}")]
    Midi(#[from] xentune_midi::Error),

    #[error("Engine has no composition to load")]
    MissingComposition,
}

pub type Result<T> = std::result::Result<T, Error>;
