//! Error types for the MIDI output layer.
//!
//! Everything here is raised while tuners and tracks are configured. Message
//! processing itself never fails; only enqueueing onto a
//! stopped or saturated track does.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Unknown tuner, MTS format or tuning changer identifier.
    #[error("Unknown {kind} '{id}'")]
    PluginConfiguration { kind: &'static str, id: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Tuning list is empty")]
    EmptyTuningList,

    #[error("MIDI track '{0}' is no longer running")]
    TrackClosed(String),

    #[error("MIDI track '{0}' queue is full")]
    TrackQueueFull(String),

    #[error(transparent)]
    Tuning(#[from] xentune_tuning::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
