//! Error types for xentune-tuning.

use thiserror::Error;

use crate::pitch_class::PitchClass;

/// Result type alias for tuning resolution.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving a composition into a tuning list.
///
/// Every variant is a load-time failure: nothing partial is handed on.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A ratio component, real value or frequency was not strictly positive.
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    /// A mapped deviation fell outside the (-100, 100) cent window of its key.
    #[error("Tuning mapper overflow: {pitch_class} would deviate by {deviation:.2} cents")]
    TuningMapperOverflow {
        pitch_class: PitchClass,
        deviation: f64,
    },

    /// Filling left unset slots behind (usually a disabled global fill).
    #[error("Incomplete tuning '{tuning}': no value for {missing:?}")]
    IncompleteTunings {
        tuning: String,
        missing: Vec<PitchClass>,
    },

    /// Unknown identifier for a mapper, reducer or other tagged variant.
    #[error("Unknown {kind} '{id}'")]
    PluginConfiguration { kind: &'static str, id: String },

    /// Invalid configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
