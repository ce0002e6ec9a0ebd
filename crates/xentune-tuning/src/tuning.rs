//! Per-key tuning deviations.
//!
//! A [`PartialTuning`] holds an optional deviation for each of the 12 pitch
//! classes; a [`Tuning`] holds all 12. Deviations are cents away from the key's
//! standard 12-EDO position and always lie strictly inside (-100, 100).
//!
//! The pipeline produces partial tunings per scale, fills their gaps, and
//! resolves them into the immutable [`TuningList`] consumed at performance time.

use core::fmt;

use crate::error::{Error, Result};
use crate::pitch_class::{PitchClass, PITCH_CLASS_COUNT, SEMITONE_CENTS};
use crate::reference::CONCERT_A_NOTE;

/// Largest magnitude a deviation may reach before it belongs to another key.
pub const MAX_DEVIATION_CENTS: f64 = SEMITONE_CENTS;

fn check_deviation(pitch_class: PitchClass, deviation: f64) -> Result<f64> {
    if deviation.is_finite() && deviation.abs() < MAX_DEVIATION_CENTS {
        Ok(deviation)
    } else {
        Err(Error::TuningMapperOverflow {
            pitch_class,
            deviation,
        })
    }
}

/// Twelve optional deviations plus a display name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartialTuning {
    name: String,
    deviations: [Option<f64>; PITCH_CLASS_COUNT],
}

impl PartialTuning {
    /// A tuning with every slot unset.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deviations: [None; PITCH_CLASS_COUNT],
        }
    }

    pub fn from_deviations(
        name: impl Into<String>,
        deviations: [Option<f64>; PITCH_CLASS_COUNT],
    ) -> Result<Self> {
        let mut tuning = Self::new(name);
        for (pitch_class, deviation) in PitchClass::all().zip(deviations) {
            if let Some(deviation) = deviation {
                tuning.set(pitch_class, deviation)?;
            }
        }
        Ok(tuning)
    }

    /// Sets a slot; fails when the deviation reaches a neighbouring key.
    pub fn set(&mut self, pitch_class: PitchClass, deviation: f64) -> Result<()> {
        self.deviations[pitch_class.index()] = Some(check_deviation(pitch_class, deviation)?);
        Ok(())
    }

    #[inline]
    pub fn get(&self, pitch_class: PitchClass) -> Option<f64> {
        self.deviations[pitch_class.index()]
    }

    #[inline]
    pub fn is_set(&self, pitch_class: PitchClass) -> bool {
        self.deviations[pitch_class.index()].is_some()
    }

    pub fn deviations(&self) -> &[Option<f64>; PITCH_CLASS_COUNT] {
        &self.deviations
    }

    pub fn set_count(&self) -> usize {
        self.deviations.iter().filter(|d| d.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.set_count() == 0
    }

    pub fn is_complete(&self) -> bool {
        self.set_count() == PITCH_CLASS_COUNT
    }

    pub fn unset_pitch_classes(&self) -> Vec<PitchClass> {
        PitchClass::all().filter(|pc| !self.is_set(*pc)).collect()
    }

    /// Copies the fallback's values into unset slots. Set slots are kept.
    pub fn fill(&self, fallback: &PartialTuning) -> PartialTuning {
        let mut filled = self.clone();
        for (slot, fallback) in filled.deviations.iter_mut().zip(fallback.deviations) {
            if slot.is_none() {
                *slot = fallback;
            }
        }
        filled
    }

    /// Same as [`fill`](Self::fill) with a complete fallback, so nothing stays unset.
    pub fn fill_complete(&self, fallback: &Tuning) -> Tuning {
        let mut deviations = fallback.deviations;
        for (slot, own) in deviations.iter_mut().zip(self.deviations) {
            if let Some(own) = own {
                *slot = own;
            }
        }
        Tuning {
            name: self.name.clone(),
            deviations,
        }
    }

    /// Converts into a [`Tuning`] when every slot is set.
    pub fn resolve(&self) -> Result<Tuning> {
        let mut deviations = [0.0; PITCH_CLASS_COUNT];
        for (slot, value) in deviations.iter_mut().zip(self.deviations) {
            match value {
                Some(value) => *slot = value,
                None => {
                    return Err(Error::IncompleteTunings {
                        tuning: self.name.clone(),
                        missing: self.unset_pitch_classes(),
                    })
                }
            }
        }
        Ok(Tuning {
            name: self.name.clone(),
            deviations,
        })
    }

    /// True when every slot set in both differs by at most `tolerance` cents.
    pub fn is_compatible(&self, other: &PartialTuning, tolerance: f64) -> bool {
        self.deviations
            .iter()
            .zip(other.deviations.iter())
            .all(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => (a - b).abs() <= tolerance,
                _ => true,
            })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl fmt::Display for PartialTuning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        for (pitch_class, deviation) in PitchClass::all().zip(self.deviations) {
            match deviation {
                Some(deviation) => write!(f, " {pitch_class}={deviation:+.2}")?,
                None => write!(f, " {pitch_class}=-")?,
            }
        }
        Ok(())
    }
}

/// Twelve resolved deviations plus a display name.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
    name: String,
    deviations: [f64; PITCH_CLASS_COUNT],
}

impl Tuning {
    /// Standard 12-EDO: every deviation is zero.
    pub fn equal_temperament() -> Self {
        Self {
            name: "12-EDO".to_string(),
            deviations: [0.0; PITCH_CLASS_COUNT],
        }
    }

    pub fn from_deviations(
        name: impl Into<String>,
        deviations: [f64; PITCH_CLASS_COUNT],
    ) -> Result<Self> {
        for (pitch_class, deviation) in PitchClass::all().zip(deviations) {
            check_deviation(pitch_class, deviation)?;
        }
        Ok(Self {
            name: name.into(),
            deviations,
        })
    }

    #[inline]
    pub fn deviation(&self, pitch_class: PitchClass) -> f64 {
        self.deviations[pitch_class.index()]
    }

    /// Deviation of the key a MIDI note sits on.
    #[inline]
    pub fn note_deviation(&self, note: u8) -> f64 {
        self.deviations[PitchClass::from_note(note).index()]
    }

    pub fn deviations(&self) -> &[f64; PITCH_CLASS_COUNT] {
        &self.deviations
    }

    /// Frequency of a MIDI note with the given A4 reference.
    pub fn note_to_freq(&self, note: u8, concert_a_hz: f64) -> f64 {
        let semitones =
            note as f64 - CONCERT_A_NOTE as f64 + self.note_deviation(note) / SEMITONE_CENTS;
        concert_a_hz * 2.0_f64.powf(semitones / 12.0)
    }

    pub fn to_partial(&self) -> PartialTuning {
        PartialTuning {
            name: self.name.clone(),
            deviations: self.deviations.map(Some),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self::equal_temperament()
    }
}

impl fmt::Display for Tuning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        for (pitch_class, deviation) in PitchClass::all().zip(self.deviations) {
            write!(f, " {pitch_class}={deviation:+.2}")?;
        }
        Ok(())
    }
}

/// Ordered, immutable list of resolved tunings.
///
/// Each entry keeps the partial tuning it was resolved from (before the
/// global fill) so gaps can be refilled from live history.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TuningList {
    tunings: Vec<Tuning>,
    partials: Vec<PartialTuning>,
}

impl TuningList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, tuning: Tuning, partial: PartialTuning) {
        self.tunings.push(tuning);
        self.partials.push(partial);
    }

    /// Builds a list from already resolved tunings.
    pub fn from_tunings(tunings: Vec<Tuning>) -> Self {
        let partials = tunings.iter().map(Tuning::to_partial).collect();
        Self { tunings, partials }
    }

    pub fn len(&self) -> usize {
        self.tunings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tunings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Tuning> {
        self.tunings.get(index)
    }

    /// The partial tuning entry `index` was resolved from.
    pub fn partial(&self, index: usize) -> Option<&PartialTuning> {
        self.partials.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tuning> {
        self.tunings.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.tunings.iter().map(|t| t.name().to_string()).collect()
    }

    /// Index after `index`, wrapping to the start.
    pub fn next_index(&self, index: usize) -> usize {
        if self.is_empty() {
            0
        } else {
            (index + 1) % self.len()
        }
    }

    /// Index before `index`, wrapping to the end.
    pub fn previous_index(&self, index: usize) -> usize {
        if self.is_empty() {
            0
        } else if index == 0 || index >= self.len() {
            self.len() - 1
        } else {
            index - 1
        }
    }

    /// Clamps `index` to the last valid index.
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.len().saturating_sub(1))
    }
}

impl core::ops::Index<usize> for TuningList {
    type Output = Tuning;

    fn index(&self, index: usize) -> &Tuning {
        &self.tunings[index]
    }
}

impl<'a> IntoIterator for &'a TuningList {
    type Item = &'a Tuning;
    type IntoIter = core::slice::Iter<'a, Tuning>;

    fn into_iter(self) -> Self::IntoIter {
        self.tunings.iter()
    }
}
