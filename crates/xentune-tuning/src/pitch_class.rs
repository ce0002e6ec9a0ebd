//! The twelve keyboard pitch classes.
//!
//! A pitch class is octave-invariant: `PitchClass::new(14)` is D. Its standard
//! 12-EDO position is `index * 100` cents above C.
//!
//! # Example
//! ```
//! use xentune_tuning::PitchClass;
//!
//! let d: PitchClass = "D".parse().unwrap();
//! assert_eq!(d, PitchClass::D);
//! assert_eq!(d.cents(), 200.0);
//! assert_eq!(PitchClass::new(-1), PitchClass::B);
//! ```

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of pitch classes on a conventional keyboard.
pub const PITCH_CLASS_COUNT: usize = 12;

/// Cents in one 12-EDO semitone.
pub const SEMITONE_CENTS: f64 = 100.0;

/// Cents in one octave.
pub const OCTAVE_CENTS: f64 = 1200.0;

const SHARP_NAMES: [&str; PITCH_CLASS_COUNT] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Keyboard pitch class 0-11, where 0 = C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PitchClass(u8);

impl PitchClass {
    pub const C: PitchClass = PitchClass(0);
    pub const CS: PitchClass = PitchClass(1);
    pub const D: PitchClass = PitchClass(2);
    pub const DS: PitchClass = PitchClass(3);
    pub const E: PitchClass = PitchClass(4);
    pub const F: PitchClass = PitchClass(5);
    pub const FS: PitchClass = PitchClass(6);
    pub const G: PitchClass = PitchClass(7);
    pub const GS: PitchClass = PitchClass(8);
    pub const A: PitchClass = PitchClass(9);
    pub const AS: PitchClass = PitchClass(10);
    pub const B: PitchClass = PitchClass(11);

    /// Wraps any integer onto 0-11.
    pub const fn new(value: i32) -> Self {
        PitchClass(value.rem_euclid(PITCH_CLASS_COUNT as i32) as u8)
    }

    /// Pitch class of a MIDI note number.
    pub const fn from_note(note: u8) -> Self {
        PitchClass(note % PITCH_CLASS_COUNT as u8)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Standard 12-EDO position above C.
    #[inline]
    pub fn cents(self) -> f64 {
        self.0 as f64 * SEMITONE_CENTS
    }

    /// All twelve pitch classes in ascending order from C.
    pub fn all() -> impl Iterator<Item = PitchClass> {
        (0..PITCH_CLASS_COUNT as u8).map(PitchClass)
    }

    pub fn name(self) -> &'static str {
        SHARP_NAMES[self.index()]
    }
}

impl From<PitchClass> for u8 {
    fn from(pc: PitchClass) -> u8 {
        pc.0
    }
}

impl From<PitchClass> for String {
    fn from(pc: PitchClass) -> String {
        pc.name().to_string()
    }
}

impl TryFrom<String> for PitchClass {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = Error;

    /// Accepts note names with any number of `#`/`b` accidentals, or a bare integer.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i32>() {
            return Ok(PitchClass::new(n));
        }

        let mut chars = s.chars();
        let letter = chars
            .next()
            .ok_or_else(|| Error::InvalidConfig("empty pitch class name".to_string()))?;
        let base = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => {
                return Err(Error::InvalidConfig(format!(
                    "invalid pitch class name '{s}'"
                )))
            }
        };

        let mut offset = 0;
        for accidental in chars {
            offset += match accidental {
                '#' | 's' | '♯' => 1,
                'b' | '♭' => -1,
                _ => {
                    return Err(Error::InvalidConfig(format!(
                        "invalid accidental in pitch class '{s}'"
                    )))
                }
            };
        }
        Ok(PitchClass::new(base + offset))
    }
}

/// Rounds to the nearest integer, except near an exact half.
///
/// When the fractional part lies within `tolerance` of 0.5 the direction is
/// forced: `half_down` floors, otherwise the value is ceiled.
pub fn round_with_tolerance(value: f64, half_down: bool, tolerance: f64) -> i64 {
    let floor = value.floor();
    let fraction = value - floor;
    if (fraction - 0.5).abs() <= tolerance {
        if half_down {
            floor as i64
        } else {
            floor as i64 + 1
        }
    } else {
        value.round() as i64
    }
}
