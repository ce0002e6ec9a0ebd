//! Composition model handed in by the format/config collaborators.
//!
//! Everything here is plain serializable data. Identifier fields (`type`) are
//! resolved through [`crate::registry`] when the composition is loaded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::pitch_class::{PitchClass, PITCH_CLASS_COUNT};
use crate::reference::TuningReference;

/// Named ordered list of intervals measured from the scale root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub name: String,
    pub intervals: Vec<Interval>,
}

impl Scale {
    pub fn new(name: impl Into<String>, intervals: Vec<Interval>) -> Result<Self> {
        let scale = Self {
            name: name.into(),
            intervals,
        };
        scale.validate()?;
        Ok(scale)
    }

    /// Builds a scale from cents values.
    pub fn from_cents(name: impl Into<String>, cents: &[f64]) -> Result<Self> {
        Self::new(name, cents.iter().map(|c| Interval::cents(*c)).collect())
    }

    /// Scales must be non-empty and sorted, either ascending or descending.
    pub fn validate(&self) -> Result<()> {
        if self.intervals.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "scale '{}' has no intervals",
                self.name
            )));
        }
        let cents = self.cents();
        let ascending = cents.windows(2).all(|w| w[0] <= w[1]);
        let descending = cents.windows(2).all(|w| w[0] >= w[1]);
        if !(ascending || descending) {
            return Err(Error::InvalidConfig(format!(
                "scale '{}' is not sorted",
                self.name
            )));
        }
        Ok(())
    }

    pub fn degree(&self, index: usize) -> Option<Interval> {
        self.intervals.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn cents(&self) -> Vec<f64> {
        self.intervals.iter().map(Interval::to_cents).collect()
    }
}

/// Sparse pitch class to scale-degree assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<PitchClass, usize>",
    into = "BTreeMap<PitchClass, usize>"
)]
pub struct KeyMapping([Option<usize>; PITCH_CLASS_COUNT]);

impl KeyMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, pitch_class: PitchClass, degree: usize) -> Self {
        self.0[pitch_class.index()] = Some(degree);
        self
    }

    pub fn get(&self, pitch_class: PitchClass) -> Option<usize> {
        self.0[pitch_class.index()]
    }

    /// Mapped pairs in pitch-class order.
    pub fn iter(&self) -> impl Iterator<Item = (PitchClass, usize)> + '_ {
        PitchClass::all().filter_map(|pc| self.get(pc).map(|degree| (pc, degree)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

impl From<BTreeMap<PitchClass, usize>> for KeyMapping {
    fn from(map: BTreeMap<PitchClass, usize>) -> Self {
        map.into_iter()
            .fold(KeyMapping::new(), |mapping, (pc, degree)| mapping.with(pc, degree))
    }
}

impl From<KeyMapping> for BTreeMap<PitchClass, usize> {
    fn from(mapping: KeyMapping) -> Self {
        mapping.iter().collect()
    }
}

/// How strongly a quarter-tone / augmented-second / quarter-tone run is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoftChromaticGenus {
    /// Middle interval of at least 210 cents.
    #[default]
    Strict,
    /// Middle interval of at least 190 cents.
    Pseudo,
    Off,
}

impl SoftChromaticGenus {
    /// Smallest middle interval that counts as an augmented second.
    pub fn threshold_cents(self) -> Option<f64> {
        match self {
            SoftChromaticGenus::Strict => Some(210.0),
            SoftChromaticGenus::Pseudo => Some(190.0),
            SoftChromaticGenus::Off => None,
        }
    }
}

/// Mapper configuration; `kind` picks the variant (`auto` or `manual`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperSettings {
    #[serde(rename = "type")]
    pub kind: String,
    /// Map exact quarter tones to the lower key.
    pub map_quarter_tones_low: bool,
    /// Distance from a half semitone, in semitones, that counts as a quarter tone.
    pub quarter_tone_tolerance: f64,
    pub soft_chromatic_genus: SoftChromaticGenus,
    /// Manual mapping, or explicit overrides for the automatic mapper.
    pub mapping: KeyMapping,
}

impl MapperSettings {
    pub fn auto() -> Self {
        Self::default()
    }

    pub fn manual(mapping: KeyMapping) -> Self {
        Self {
            kind: "manual".to_string(),
            mapping,
            ..Self::default()
        }
    }
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            kind: "auto".to_string(),
            map_quarter_tones_low: false,
            quarter_tone_tolerance: 0.02,
            soft_chromatic_genus: SoftChromaticGenus::Strict,
            mapping: KeyMapping::new(),
        }
    }
}

/// Static local fills applied at load time, plus the runtime memory-fill toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FillSettings {
    /// Fill gaps from the nearest preceding tuning.
    pub back: bool,
    /// Fill gaps from the nearest following tuning.
    pub fore: bool,
    /// Fill gaps from the most recently sounded tuning during performance.
    /// Read by [`Composition::memory_fill`].
    pub memory: bool,
}

/// Reducer configuration; `kind` picks `direct` or `merge`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerSettings {
    #[serde(rename = "type")]
    pub kind: String,
    /// Largest deviation difference, in cents, that still counts as equal.
    pub tolerance: f64,
}

impl ReducerSettings {
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn merge(tolerance: f64) -> Self {
        Self {
            kind: "merge".to_string(),
            tolerance,
        }
    }
}

impl Default for ReducerSettings {
    fn default() -> Self {
        Self {
            kind: "direct".to_string(),
            tolerance: 2.0,
        }
    }
}

/// One entry of a composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub transposition: Interval,
    /// Replace the running transposition instead of adding to it.
    #[serde(default)]
    pub reset_transposition: bool,
    pub scale: Scale,
    #[serde(default)]
    pub mapper: Option<MapperSettings>,
    #[serde(default)]
    pub fill: Option<FillSettings>,
    #[serde(default)]
    pub reducer: Option<ReducerSettings>,
}

impl TuningSpec {
    pub fn new(scale: Scale) -> Self {
        Self {
            name: None,
            transposition: Interval::unison(),
            reset_transposition: false,
            scale,
            mapper: None,
            fill: None,
            reducer: None,
        }
    }

    pub fn transposed(mut self, transposition: Interval) -> Self {
        self.transposition = transposition;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_mapper(mut self, mapper: MapperSettings) -> Self {
        self.mapper = Some(mapper);
        self
    }

    pub fn with_fill(mut self, fill: FillSettings) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn with_reducer(mut self, reducer: ReducerSettings) -> Self {
        self.reducer = Some(reducer);
        self
    }

    /// Explicit name, or the scale's name.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.scale.name)
    }
}

/// Fallback applied to slots no local fill could reach.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GlobalFill {
    /// Unset slots keep their standard 12-EDO position.
    #[default]
    EqualTemperament,
    /// A tuning of its own, mapped like any spec; its own gaps fall back to 12-EDO.
    Spec(TuningSpec),
    /// No fallback: unset slots fail the load.
    Disabled,
}

/// Everything the pipeline needs to produce a tuning list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Composition {
    pub reference: TuningReference,
    pub specs: Vec<TuningSpec>,
    pub mapper: MapperSettings,
    pub fill: FillSettings,
    pub reducer: ReducerSettings,
    pub global_fill: GlobalFill,
}

impl Composition {
    pub fn new(reference: TuningReference) -> Self {
        Self {
            reference,
            ..Self::default()
        }
    }

    pub fn with_spec(mut self, spec: TuningSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn with_mapper(mut self, mapper: MapperSettings) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_fill(mut self, fill: FillSettings) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_reducer(mut self, reducer: ReducerSettings) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn with_global_fill(mut self, global_fill: GlobalFill) -> Self {
        self.global_fill = global_fill;
        self
    }

    /// Whether performance should fill gaps from the last sounded tuning.
    ///
    /// Memory fill acts on the whole performance, so one spec asking for it
    /// turns it on.
    pub fn memory_fill(&self) -> bool {
        self.fill.memory || self.specs.iter().any(|spec| spec.fill.is_some_and(|f| f.memory))
    }

    /// Runs the full pipeline. See [`crate::assembly::build_tuning_list`].
    pub fn resolve(&self) -> Result<crate::TuningList> {
        crate::assembly::build_tuning_list(self)
    }
}
