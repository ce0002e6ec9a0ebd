//! Where a scale's first degree sits on the keyboard.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interval::hz_to_cents;
use crate::pitch_class::{PitchClass, OCTAVE_CENTS};

/// Reference pitch for A4.
pub const CONCERT_A_HZ: f64 = 440.0;

/// MIDI note number for A4.
pub const CONCERT_A_NOTE: u8 = 69;

/// Anchors a scale's root against the 12-EDO keyboard grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TuningReference {
    /// The root sits `offset_cents` away from the 12-EDO position of `base`.
    PitchClass {
        base: PitchClass,
        #[serde(default)]
        offset_cents: f64,
    },
    /// The root `base` sounds at `base_hz` on a grid where
    /// `concert_pitch_class` sounds at `concert_hz`.
    ConcertPitch {
        base: PitchClass,
        base_hz: f64,
        #[serde(default = "default_concert_pitch_class")]
        concert_pitch_class: PitchClass,
        #[serde(default = "default_concert_hz")]
        concert_hz: f64,
    },
}

fn default_concert_pitch_class() -> PitchClass {
    PitchClass::A
}

fn default_concert_hz() -> f64 {
    CONCERT_A_HZ
}

impl TuningReference {
    /// Root on the 12-EDO position of `base`.
    pub fn standard(base: PitchClass) -> Self {
        TuningReference::PitchClass {
            base,
            offset_cents: 0.0,
        }
    }

    pub fn base_pitch_class(&self) -> PitchClass {
        match *self {
            TuningReference::PitchClass { base, .. } | TuningReference::ConcertPitch { base, .. } => {
                base
            }
        }
    }

    /// Offset of the root from its 12-EDO position, folded into `(-600, 600]`.
    pub fn base_offset_cents(&self) -> Result<f64> {
        match *self {
            TuningReference::PitchClass { offset_cents, .. } => Ok(offset_cents),
            TuningReference::ConcertPitch {
                base,
                base_hz,
                concert_pitch_class,
                concert_hz,
            } => {
                let grid_cents = base.cents() - concert_pitch_class.cents();
                let offset = hz_to_cents(base_hz, concert_hz)? - grid_cents;
                Ok(fold_half_octave(offset))
            }
        }
    }

    /// Position of the root in cents above C, unreduced.
    pub fn root_cents(&self) -> Result<f64> {
        Ok(self.base_pitch_class().cents() + self.base_offset_cents()?)
    }
}

impl Default for TuningReference {
    fn default() -> Self {
        Self::standard(PitchClass::C)
    }
}

fn fold_half_octave(cents: f64) -> f64 {
    let folded = cents.rem_euclid(OCTAVE_CENTS);
    if folded > OCTAVE_CENTS / 2.0 {
        folded - OCTAVE_CENTS
    } else {
        folded
    }
}
