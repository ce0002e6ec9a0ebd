//! Scale-to-keyboard mappers.
//!
//! A mapper places each scale pitch on one of the 12 pitch classes and records
//! its deviation, producing a [`PartialTuning`]. Pitch classes no scale pitch
//! lands on stay unset for the fill stage.
//!
//! - [`ManualMapper`] - caller-supplied pitch class to degree assignment
//! - [`AutoMapper`] - nearest key with quarter-tone and soft chromatic handling

mod auto;
mod manual;

pub use auto::AutoMapper;
pub use manual::ManualMapper;

use crate::composition::{MapperSettings, Scale};
use crate::error::{Error, Result};
use crate::pitch_class::{PitchClass, OCTAVE_CENTS};
use crate::reference::TuningReference;
use crate::tuning::{PartialTuning, MAX_DEVIATION_CENTS};

/// Closed set of mapper variants.
#[derive(Debug, Clone, PartialEq)]
pub enum TuningMapper {
    Manual(ManualMapper),
    Auto(AutoMapper),
}

impl TuningMapper {
    /// Resolves settings through the registry. Unknown `type`s fail.
    pub fn from_settings(settings: &MapperSettings) -> Result<Self> {
        crate::registry::resolve_mapper(settings)
    }

    /// Maps `scale` with its root `root_cents` above C.
    pub fn map(&self, scale: &Scale, root_cents: f64) -> Result<PartialTuning> {
        let mut tuning = match self {
            TuningMapper::Manual(mapper) => mapper.map(scale, root_cents)?,
            TuningMapper::Auto(mapper) => mapper.map(scale, root_cents)?,
        };
        tuning.set_name(scale.name.clone());
        Ok(tuning)
    }

    /// Maps `scale` with its root at `reference`.
    pub fn map_with_reference(
        &self,
        scale: &Scale,
        reference: &TuningReference,
    ) -> Result<PartialTuning> {
        self.map(scale, reference.root_cents()?)
    }
}

/// Position of a scale degree within the octave above C.
fn position_cents(root_cents: f64, degree_cents: f64) -> f64 {
    (root_cents + degree_cents).rem_euclid(OCTAVE_CENTS)
}

/// Deviation of `position` from `pitch_class`, taking the nearer wrap of the octave.
///
/// C is reachable both at 0 and at 1200 cents; the smaller magnitude wins.
fn wrapped_deviation(position: f64, pitch_class: PitchClass) -> f64 {
    let deviation = (position - pitch_class.cents()).rem_euclid(OCTAVE_CENTS);
    if deviation > OCTAVE_CENTS / 2.0 {
        deviation - OCTAVE_CENTS
    } else {
        deviation
    }
}

/// Places degree `degree` of `scale` on `pitch_class`, failing on overflow.
fn assign_degree(
    tuning: &mut PartialTuning,
    scale: &Scale,
    root_cents: f64,
    pitch_class: PitchClass,
    degree: usize,
) -> Result<()> {
    let interval = scale.degree(degree).ok_or_else(|| {
        Error::InvalidConfig(format!(
            "{pitch_class} is mapped to degree {degree}, but scale '{}' has {} degrees",
            scale.name,
            scale.len()
        ))
    })?;
    let position = position_cents(root_cents, interval.to_cents());
    let deviation = wrapped_deviation(position, pitch_class);
    if deviation.abs() >= MAX_DEVIATION_CENTS {
        return Err(Error::TuningMapperOverflow {
            pitch_class,
            deviation,
        });
    }
    tuning.set(pitch_class, deviation)
}
