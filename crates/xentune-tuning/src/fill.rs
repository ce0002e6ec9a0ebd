//! Gap filling for partial tunings.
//!
//! Local fills (back and fore) run once at load time over the ordered
//! sequence of mapped tunings. Memory fill runs at performance time against
//! whatever tuning actually sounded last; the two never share state.

use crate::composition::FillSettings;
use crate::tuning::{PartialTuning, Tuning};

/// Applies back- and fore-fill over `partials`.
///
/// `settings[i]` is the effective fill configuration of `partials[i]`. A
/// slot is filled from the nearest preceding (back) or following (fore)
/// tuning that has it set in its own mapping; back-fill runs first, so a
/// tuning with both enabled prefers its predecessors.
pub fn local_fill(partials: &[PartialTuning], settings: &[FillSettings]) -> Vec<PartialTuning> {
    debug_assert_eq!(partials.len(), settings.len());

    let mut filled: Vec<PartialTuning> = partials.to_vec();

    // Running union of everything seen so far, nearest wins.
    let mut seen = PartialTuning::default();
    for (index, original) in partials.iter().enumerate() {
        if settings.get(index).is_some_and(|s| s.back) {
            filled[index] = filled[index].fill(&seen);
        }
        seen = original.fill(&seen);
    }

    let mut seen = PartialTuning::default();
    for (index, original) in partials.iter().enumerate().rev() {
        if settings.get(index).is_some_and(|s| s.fore) {
            filled[index] = filled[index].fill(&seen);
        }
        seen = original.fill(&seen);
    }

    filled
}

/// Runtime fill from the most recently sounded tuning.
#[derive(Debug, Clone, Default)]
pub struct MemoryFill {
    sounded: Option<Tuning>,
}

impl MemoryFill {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers `tuning` as the one currently sounding.
    pub fn record(&mut self, tuning: &Tuning) {
        self.sounded = Some(tuning.clone());
    }

    pub fn sounded(&self) -> Option<&Tuning> {
        self.sounded.as_ref()
    }

    /// Fills the gaps of `partial` from the last sounded tuning.
    ///
    /// Before anything has sounded the load-time resolution is used as is.
    pub fn apply(&self, partial: &PartialTuning, resolved: &Tuning) -> Tuning {
        match &self.sounded {
            Some(sounded) => {
                let mut tuning = partial.fill_complete(sounded);
                tuning.set_name(resolved.name());
                tuning
            }
            None => resolved.clone(),
        }
    }

    pub fn clear(&mut self) {
        self.sounded = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch_class::PitchClass;

    fn partial(name: &str, values: &[(PitchClass, f64)]) -> PartialTuning {
        let mut tuning = PartialTuning::new(name);
        for (pc, value) in values {
            tuning.set(*pc, *value).unwrap();
        }
        tuning
    }

    fn back() -> FillSettings {
        FillSettings {
            back: true,
            ..FillSettings::default()
        }
    }

    fn fore() -> FillSettings {
        FillSettings {
            fore: true,
            ..FillSettings::default()
        }
    }

    #[test]
    fn test_back_fill_uses_nearest_predecessor() {
        let partials = vec![
            partial("a", &[(PitchClass::C, 1.0), (PitchClass::D, 2.0)]),
            partial("b", &[(PitchClass::C, 3.0)]),
            partial("c", &[]),
        ];
        let filled = local_fill(&partials, &[back(), back(), back()]);

        assert_eq!(filled[0], partials[0]);
        assert_eq!(filled[1].get(PitchClass::C), Some(3.0));
        assert_eq!(filled[1].get(PitchClass::D), Some(2.0));
        assert_eq!(filled[2].get(PitchClass::C), Some(3.0));
        assert_eq!(filled[2].get(PitchClass::D), Some(2.0));
        assert_eq!(filled[2].name(), "c");
    }

    #[test]
    fn test_fore_fill_uses_nearest_successor() {
        let partials = vec![
            partial("a", &[]),
            partial("b", &[(PitchClass::E, -14.0)]),
            partial("c", &[(PitchClass::E, 10.0), (PitchClass::F, 5.0)]),
        ];
        let filled = local_fill(&partials, &[fore(), fore(), FillSettings::default()]);

        assert_eq!(filled[0].get(PitchClass::E), Some(-14.0));
        assert_eq!(filled[0].get(PitchClass::F), Some(5.0));
        assert_eq!(filled[1].get(PitchClass::E), Some(-14.0));
        assert_eq!(filled[1].get(PitchClass::F), Some(5.0));
        assert_eq!(filled[2], partials[2]);
    }

    #[test]
    fn test_disabled_fill_leaves_gaps() {
        let partials = vec![
            partial("a", &[(PitchClass::C, 1.0)]),
            partial("b", &[]),
        ];
        let filled = local_fill(&partials, &[FillSettings::default(); 2]);
        assert_eq!(filled, partials);
    }

    #[test]
    fn test_back_before_fore() {
        let both = FillSettings {
            back: true,
            fore: true,
            memory: false,
        };
        let partials = vec![
            partial("a", &[(PitchClass::G, 1.0)]),
            partial("b", &[]),
            partial("c", &[(PitchClass::G, 9.0), (PitchClass::A, 4.0)]),
        ];
        let filled = local_fill(&partials, &[both; 3]);
        assert_eq!(filled[1].get(PitchClass::G), Some(1.0));
        assert_eq!(filled[1].get(PitchClass::A), Some(4.0));
    }

    #[test]
    fn test_memory_fill() {
        let partial = partial("b", &[(PitchClass::C, 7.0)]);
        let resolved = partial.fill_complete(&Tuning::equal_temperament());

        let mut memory = MemoryFill::new();
        assert_eq!(memory.apply(&partial, &resolved), resolved);

        let sounded = Tuning::from_deviations("a", [-20.0; 12]).unwrap();
        memory.record(&sounded);
        let tuning = memory.apply(&partial, &resolved);
        assert_eq!(tuning.deviation(PitchClass::C), 7.0);
        assert_eq!(tuning.deviation(PitchClass::D), -20.0);
        assert_eq!(tuning.name(), "b");

        memory.clear();
        assert!(memory.sounded().is_none());
    }
}
