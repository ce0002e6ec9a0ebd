//! Musical intervals and their conversions.
//!
//! An [`Interval`] is held in one of four forms: a whole-number ratio, a real
//! ratio, cents, or steps of an equal division of the octave. All forms agree
//! on `cents = 1200 * log2(real_value)`.
//!
//! Arithmetic keeps the form when both operands share it and falls back to
//! cents otherwise.
//!
//! # Example
//! ```
//! use xentune_tuning::Interval;
//!
//! let fifth = Interval::ratio(3, 2).unwrap();
//! let fourth = Interval::ratio(4, 3).unwrap();
//! assert_eq!(fifth + fourth, Interval::ratio(2, 1).unwrap());
//! assert!((fifth.to_cents() - 701.955).abs() < 0.001);
//!
//! let quarter_tone: Interval = "1\\24".parse().unwrap();
//! assert_eq!(quarter_tone.to_cents(), 50.0);
//! ```

use core::fmt;
use core::ops::{Add, Sub};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pitch_class::OCTAVE_CENTS;

/// A musical distance between two pitches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Interval {
    repr: Repr,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Repr {
    Ratio { numerator: u64, denominator: u64 },
    Real(f64),
    Cents(f64),
    Edo { divisions: u32, steps: i64 },
}

impl Interval {
    /// Whole-number ratio `numerator / denominator`, reduced.
    pub fn ratio(numerator: i64, denominator: i64) -> Result<Self> {
        if numerator <= 0 || denominator <= 0 {
            return Err(Error::InvalidInterval(format!(
                "ratio {numerator}/{denominator} must have positive components"
            )));
        }
        Ok(Self::reduced_ratio(numerator as u64, denominator as u64))
    }

    /// Real-valued frequency ratio.
    pub fn real(value: f64) -> Result<Self> {
        if !(value.is_finite() && value > 0.0) {
            return Err(Error::InvalidInterval(format!(
                "real value {value} must be positive"
            )));
        }
        Ok(Self {
            repr: Repr::Real(value),
        })
    }

    pub fn cents(cents: f64) -> Self {
        Self {
            repr: Repr::Cents(cents),
        }
    }

    /// `steps` steps of `divisions`-EDO.
    pub fn edo(divisions: u32, steps: i64) -> Result<Self> {
        if divisions == 0 {
            return Err(Error::InvalidInterval(
                "equal division of the octave needs at least one step".to_string(),
            ));
        }
        Ok(Self {
            repr: Repr::Edo { divisions, steps },
        })
    }

    /// Interval from `base_hz` up to `freq_hz`.
    pub fn from_hz(freq_hz: f64, base_hz: f64) -> Result<Self> {
        Ok(Self::cents(hz_to_cents(freq_hz, base_hz)?))
    }

    pub fn unison() -> Self {
        Self::reduced_ratio(1, 1)
    }

    pub fn octave() -> Self {
        Self::reduced_ratio(2, 1)
    }

    fn reduced_ratio(numerator: u64, denominator: u64) -> Self {
        let divisor = gcd(numerator, denominator);
        Self {
            repr: Repr::Ratio {
                numerator: numerator / divisor,
                denominator: denominator / divisor,
            },
        }
    }

    pub fn to_cents(&self) -> f64 {
        match self.repr {
            Repr::Ratio {
                numerator,
                denominator,
            } => OCTAVE_CENTS * (numerator as f64 / denominator as f64).log2(),
            Repr::Real(value) => OCTAVE_CENTS * value.log2(),
            Repr::Cents(cents) => cents,
            Repr::Edo { divisions, steps } => OCTAVE_CENTS * steps as f64 / divisions as f64,
        }
    }

    pub fn to_real_value(&self) -> f64 {
        match self.repr {
            Repr::Ratio {
                numerator,
                denominator,
            } => numerator as f64 / denominator as f64,
            Repr::Real(value) => value,
            _ => cents_to_real_value(self.to_cents()),
        }
    }

    /// Frequency reached by moving this interval up from `base_hz`.
    pub fn to_hz(&self, base_hz: f64) -> Result<f64> {
        cents_to_hz(self.to_cents(), base_hz)
    }

    /// Reduces into one octave: `[0, 1200)` cents, `[1, 2)` as a ratio.
    pub fn normalize(&self) -> Self {
        let repr = match self.repr {
            Repr::Ratio {
                mut numerator,
                mut denominator,
            } => {
                let fallback = Repr::Real(octave_reduce(numerator as f64 / denominator as f64));
                while denominator.checked_mul(2).map_or(true, |d| numerator >= d) {
                    if numerator % 2 == 0 {
                        numerator /= 2;
                    } else {
                        let Some(doubled) = denominator.checked_mul(2) else {
                            return Self { repr: fallback };
                        };
                        denominator = doubled;
                    }
                }
                while numerator < denominator {
                    if denominator % 2 == 0 {
                        denominator /= 2;
                    } else {
                        let Some(doubled) = numerator.checked_mul(2) else {
                            return Self { repr: fallback };
                        };
                        numerator = doubled;
                    }
                }
                return Self::reduced_ratio(numerator, denominator);
            }
            Repr::Real(value) => Repr::Real(octave_reduce(value)),
            Repr::Cents(cents) => Repr::Cents(cents.rem_euclid(OCTAVE_CENTS)),
            Repr::Edo { divisions, steps } => Repr::Edo {
                divisions,
                steps: steps.rem_euclid(divisions as i64),
            },
        };
        Self { repr }
    }

    /// Reflects around the octave: a fifth becomes a fourth.
    ///
    /// Only defined for intervals between unison and octave inclusive.
    pub fn invert(&self) -> Result<Self> {
        let cents = self.to_cents();
        if !(-1e-9..=OCTAVE_CENTS + 1e-9).contains(&cents) {
            return Err(Error::InvalidInterval(format!(
                "cannot invert {self}: not within one octave"
            )));
        }
        let repr = match self.repr {
            Repr::Ratio {
                numerator,
                denominator,
            } => match denominator.checked_mul(2) {
                Some(doubled) => return Ok(Self::reduced_ratio(doubled, numerator)),
                None => Repr::Real(2.0 * denominator as f64 / numerator as f64),
            },
            Repr::Real(value) => Repr::Real(2.0 / value),
            Repr::Cents(cents) => Repr::Cents(OCTAVE_CENTS - cents),
            Repr::Edo { divisions, steps } => Repr::Edo {
                divisions,
                steps: divisions as i64 - steps,
            },
        };
        Ok(Self { repr })
    }

    /// True when both intervals denote the same pitch distance within `tolerance` cents.
    pub fn approx_eq(&self, other: &Interval, tolerance: f64) -> bool {
        (self.to_cents() - other.to_cents()).abs() <= tolerance
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::unison()
    }
}

impl Add for Interval {
    type Output = Interval;

    fn add(self, rhs: Interval) -> Interval {
        match (self.repr, rhs.repr) {
            (
                Repr::Ratio {
                    numerator: n1,
                    denominator: d1,
                },
                Repr::Ratio {
                    numerator: n2,
                    denominator: d2,
                },
            ) => match (n1.checked_mul(n2), d1.checked_mul(d2)) {
                (Some(n), Some(d)) => Interval::reduced_ratio(n, d),
                _ => Interval::cents(self.to_cents() + rhs.to_cents()),
            },
            (Repr::Real(a), Repr::Real(b)) => {
                real_or_cents(a * b, || self.to_cents() + rhs.to_cents())
            }
            (
                Repr::Edo {
                    divisions: div_a,
                    steps: a,
                },
                Repr::Edo {
                    divisions: div_b,
                    steps: b,
                },
            ) if div_a == div_b => match a.checked_add(b) {
                Some(steps) => Interval {
                    repr: Repr::Edo {
                        divisions: div_a,
                        steps,
                    },
                },
                None => Interval::cents(self.to_cents() + rhs.to_cents()),
            },
            _ => Interval::cents(self.to_cents() + rhs.to_cents()),
        }
    }
}

impl Sub for Interval {
    type Output = Interval;

    fn sub(self, rhs: Interval) -> Interval {
        match (self.repr, rhs.repr) {
            (
                Repr::Ratio {
                    numerator: n1,
                    denominator: d1,
                },
                Repr::Ratio {
                    numerator: n2,
                    denominator: d2,
                },
            ) => match (n1.checked_mul(d2), d1.checked_mul(n2)) {
                (Some(n), Some(d)) => Interval::reduced_ratio(n, d),
                _ => Interval::cents(self.to_cents() - rhs.to_cents()),
            },
            (Repr::Real(a), Repr::Real(b)) => {
                real_or_cents(a / b, || self.to_cents() - rhs.to_cents())
            }
            (
                Repr::Edo {
                    divisions: div_a,
                    steps: a,
                },
                Repr::Edo {
                    divisions: div_b,
                    steps: b,
                },
            ) if div_a == div_b => match a.checked_sub(b) {
                Some(steps) => Interval {
                    repr: Repr::Edo {
                        divisions: div_a,
                        steps,
                    },
                },
                None => Interval::cents(self.to_cents() - rhs.to_cents()),
            },
            _ => Interval::cents(self.to_cents() - rhs.to_cents()),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            Repr::Ratio {
                numerator,
                denominator,
            } => write!(f, "{numerator}/{denominator}"),
            Repr::Real(value) => write!(f, "{value}"),
            Repr::Cents(cents) => write!(f, "{cents}c"),
            Repr::Edo { divisions, steps } => write!(f, "{steps}\\{divisions}"),
        }
    }
}

impl FromStr for Interval {
    type Err = Error;

    /// Parses `3/2`, `701.955c`, `7\12` or a bare real ratio like `1.5`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::InvalidInterval(format!("cannot parse interval '{s}'"));

        if let Some(cents) = s.strip_suffix('c') {
            return cents
                .trim()
                .parse::<f64>()
                .map(Interval::cents)
                .map_err(|_| invalid());
        }
        if let Some((numerator, denominator)) = s.split_once('/') {
            let numerator = numerator.trim().parse::<i64>().map_err(|_| invalid())?;
            let denominator = denominator.trim().parse::<i64>().map_err(|_| invalid())?;
            return Interval::ratio(numerator, denominator);
        }
        if let Some((steps, divisions)) = s.split_once('\\') {
            let steps = steps.trim().parse::<i64>().map_err(|_| invalid())?;
            let divisions = divisions.trim().parse::<u32>().map_err(|_| invalid())?;
            return Interval::edo(divisions, steps);
        }
        let value = s.parse::<f64>().map_err(|_| invalid())?;
        Interval::real(value)
    }
}

impl TryFrom<String> for Interval {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> String {
        interval.to_string()
    }
}

/// Keeps a real product only while it is a valid ratio; cents do not
/// underflow or overflow at musical scales.
fn real_or_cents(value: f64, cents: impl FnOnce() -> f64) -> Interval {
    if value.is_finite() && value > 0.0 {
        Interval {
            repr: Repr::Real(value),
        }
    } else {
        Interval::cents(cents())
    }
}

/// Octave reduction of a positive finite ratio into `[1, 2)`.
fn octave_reduce(value: f64) -> f64 {
    let reduced = value / value.log2().floor().exp2();
    if reduced >= 2.0 {
        reduced / 2.0
    } else if reduced < 1.0 {
        reduced * 2.0
    } else {
        reduced
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

pub fn real_value_to_cents(real_value: f64) -> Result<f64> {
    Ok(Interval::real(real_value)?.to_cents())
}

pub fn cents_to_real_value(cents: f64) -> f64 {
    2.0_f64.powf(cents / OCTAVE_CENTS)
}

pub fn ratio_to_cents(numerator: i64, denominator: i64) -> Result<f64> {
    Ok(Interval::ratio(numerator, denominator)?.to_cents())
}

/// Cents from `base_hz` up to `freq_hz`.
pub fn hz_to_cents(freq_hz: f64, base_hz: f64) -> Result<f64> {
    if !(freq_hz > 0.0 && base_hz > 0.0) {
        return Err(Error::InvalidInterval(format!(
            "frequencies must be positive (got {freq_hz} Hz over {base_hz} Hz)"
        )));
    }
    Ok(OCTAVE_CENTS * (freq_hz / base_hz).log2())
}

pub fn cents_to_hz(cents: f64, base_hz: f64) -> Result<f64> {
    if !(base_hz > 0.0) {
        return Err(Error::InvalidInterval(format!(
            "base frequency {base_hz} Hz must be positive"
        )));
    }
    Ok(base_hz * cents_to_real_value(cents))
}
