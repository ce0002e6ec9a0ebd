use tracing::debug;

use crate::composition::{KeyMapping, MapperSettings, Scale, SoftChromaticGenus};
use crate::error::Result;
use crate::pitch_class::{round_with_tolerance, PitchClass, SEMITONE_CENTS};
use crate::tuning::{PartialTuning, MAX_DEVIATION_CENTS};

use super::{assign_degree, position_cents};

/// Largest interval, in cents, that still reads as a quarter-tone step.
const QUARTER_TONE_STEP_MAX_CENTS: f64 = 163.0;

/// Two degrees this close on the same key are the same pitch (octave duplicates).
const DUPLICATE_EPSILON_CENTS: f64 = 1e-6;

/// Places every scale pitch on its nearest key.
///
/// Exact quarter tones go to the upper key unless `map_quarter_tones_low` is
/// set. In a quarter-tone / augmented-second / quarter-tone run the lower
/// pitch of the augmented second always takes the lower key, which keeps the
/// augmented second audible on the keyboard. A pitch whose key is already
/// taken retries the other neighbour.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoMapper {
    map_quarter_tones_low: bool,
    quarter_tone_tolerance: f64,
    soft_chromatic_genus: SoftChromaticGenus,
    overrides: KeyMapping,
}

impl AutoMapper {
    pub fn new() -> Self {
        Self::from_settings(&MapperSettings::default())
    }

    pub fn from_settings(settings: &MapperSettings) -> Self {
        Self {
            map_quarter_tones_low: settings.map_quarter_tones_low,
            quarter_tone_tolerance: settings.quarter_tone_tolerance,
            soft_chromatic_genus: settings.soft_chromatic_genus,
            overrides: settings.mapping,
        }
    }

    pub fn map_quarter_tones_low(mut self, low: bool) -> Self {
        self.map_quarter_tones_low = low;
        self
    }

    pub fn soft_chromatic_genus(mut self, genus: SoftChromaticGenus) -> Self {
        self.soft_chromatic_genus = genus;
        self
    }

    /// Explicit assignments that win over the automatic ones.
    pub fn overrides(mut self, overrides: KeyMapping) -> Self {
        self.overrides = overrides;
        self
    }

    pub(crate) fn map(&self, scale: &Scale, root_cents: f64) -> Result<PartialTuning> {
        let mut tuning = PartialTuning::new(scale.name.clone());
        let mut mapped_degrees = vec![false; scale.len()];

        for (pitch_class, degree) in self.overrides.iter() {
            assign_degree(&mut tuning, scale, root_cents, pitch_class, degree)?;
            mapped_degrees[degree] = true;
        }

        let forced_low = self.soft_chromatic_degrees(scale);
        for (degree, cents) in scale.cents().into_iter().enumerate() {
            if mapped_degrees[degree] {
                continue;
            }
            let position = position_cents(root_cents, cents);
            let half_down = self.map_quarter_tones_low || forced_low[degree];
            let nearest = round_with_tolerance(
                position / SEMITONE_CENTS,
                half_down,
                self.quarter_tone_tolerance,
            );
            let pitch_class = PitchClass::new(nearest as i32);
            let deviation = position - nearest as f64 * SEMITONE_CENTS;

            match tuning.get(pitch_class) {
                None => tuning.set(pitch_class, deviation)?,
                Some(existing) if (existing - deviation).abs() < DUPLICATE_EPSILON_CENTS => {
                    debug!(degree, %pitch_class, "Skipping duplicate scale pitch");
                }
                Some(_) => {
                    let other = if deviation >= 0.0 {
                        nearest + 1
                    } else {
                        nearest - 1
                    };
                    let other_pitch_class = PitchClass::new(other as i32);
                    let other_deviation = position - other as f64 * SEMITONE_CENTS;
                    if tuning.is_set(other_pitch_class)
                        || other_deviation.abs() >= MAX_DEVIATION_CENTS
                    {
                        debug!(
                            degree,
                            %pitch_class,
                            "Both neighbouring keys taken, scale pitch left unmapped"
                        );
                    } else {
                        debug!(
                            degree,
                            from = %pitch_class,
                            to = %other_pitch_class,
                            "Key occupied, mapping to other neighbour"
                        );
                        tuning.set(other_pitch_class, other_deviation)?;
                    }
                }
            }
        }
        Ok(tuning)
    }

    /// Degrees that must round down to keep an augmented second intact.
    fn soft_chromatic_degrees(&self, scale: &Scale) -> Vec<bool> {
        let cents = scale.cents();
        let mut forced = vec![false; cents.len()];
        let Some(threshold) = self.soft_chromatic_genus.threshold_cents() else {
            return forced;
        };

        let steps: Vec<f64> = cents.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        for (k, run) in steps.windows(3).enumerate() {
            if run[0] <= QUARTER_TONE_STEP_MAX_CENTS
                && run[2] <= QUARTER_TONE_STEP_MAX_CENTS
                && run[1] >= threshold
            {
                // the lower end of the augmented second
                let lower = if cents[k + 1] <= cents[k + 2] {
                    k + 1
                } else {
                    k + 2
                };
                debug!(
                    degree = lower,
                    augmented_second = run[1],
                    "Soft chromatic genus detected"
                );
                forced[lower] = true;
            }
        }
        forced
    }
}

impl Default for AutoMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SOFT_CHROMATIC: [f64; 8] = [0.0, 150.0, 300.0, 500.0, 650.0, 883.0, 1000.0, 1200.0];

    fn scale(cents: &[f64]) -> Scale {
        Scale::from_cents("test", cents).unwrap()
    }

    #[test]
    fn test_equal_temperament_scale_maps_exactly() {
        let major = scale(&[0.0, 200.0, 400.0, 500.0, 700.0, 900.0, 1100.0, 1200.0]);
        let tuning = AutoMapper::new().map(&major, PitchClass::C.cents()).unwrap();
        assert_eq!(tuning.set_count(), 7);
        for pc in [0, 2, 4, 5, 7, 9, 11] {
            assert_relative_eq!(tuning.get(PitchClass::new(pc)).unwrap(), 0.0);
        }
        assert!(!tuning.is_set(PitchClass::CS));
    }

    #[test]
    fn test_soft_chromatic_strict_maps_diminished_fifth_low() {
        let tuning = AutoMapper::new()
            .map_quarter_tones_low(false)
            .soft_chromatic_genus(SoftChromaticGenus::Strict)
            .map(&scale(&SOFT_CHROMATIC), PitchClass::D.cents())
            .unwrap();

        // 650 cents above D lands on A-flat, leaving A unset
        assert_relative_eq!(tuning.get(PitchClass::GS).unwrap(), 50.0, epsilon = 1e-9);
        assert!(!tuning.is_set(PitchClass::A));
        assert_relative_eq!(tuning.get(PitchClass::B).unwrap(), -17.0, epsilon = 1e-9);

        // Other quarter tones still go up
        assert_relative_eq!(tuning.get(PitchClass::E).unwrap(), -50.0, epsilon = 1e-9);
        assert!(!tuning.is_set(PitchClass::DS));
        assert_relative_eq!(tuning.get(PitchClass::D).unwrap(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(tuning.get(PitchClass::C).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_soft_chromatic_off_maps_diminished_fifth_high() {
        let tuning = AutoMapper::new()
            .soft_chromatic_genus(SoftChromaticGenus::Off)
            .map(&scale(&SOFT_CHROMATIC), PitchClass::D.cents())
            .unwrap();
        assert_relative_eq!(tuning.get(PitchClass::A).unwrap(), -50.0, epsilon = 1e-9);
        assert!(!tuning.is_set(PitchClass::GS));
    }

    #[test]
    fn test_soft_chromatic_pseudo_accepts_narrow_augmented_second() {
        // 150 / 200 / 150 around F#: too narrow for strict, enough for pseudo
        let narrow = scale(&[0.0, 500.0, 650.0, 850.0, 1000.0, 1200.0]);
        let pseudo = AutoMapper::new()
            .soft_chromatic_genus(SoftChromaticGenus::Pseudo)
            .map(&narrow, PitchClass::C.cents())
            .unwrap();
        assert_relative_eq!(pseudo.get(PitchClass::FS).unwrap(), 50.0, epsilon = 1e-9);
        assert!(!pseudo.is_set(PitchClass::G));
        assert_relative_eq!(pseudo.get(PitchClass::A).unwrap(), -50.0, epsilon = 1e-9);

        let strict = AutoMapper::new()
            .soft_chromatic_genus(SoftChromaticGenus::Strict)
            .map(&narrow, PitchClass::C.cents())
            .unwrap();
        assert_relative_eq!(strict.get(PitchClass::G).unwrap(), -50.0, epsilon = 1e-9);
        assert!(!strict.is_set(PitchClass::FS));

        // a 170 cent lower step is no longer a quarter-tone step
        let wide = scale(&[0.0, 480.0, 650.0, 850.0, 1000.0, 1200.0]);
        let tuning = AutoMapper::new()
            .soft_chromatic_genus(SoftChromaticGenus::Pseudo)
            .map(&wide, PitchClass::C.cents())
            .unwrap();
        assert_relative_eq!(tuning.get(PitchClass::G).unwrap(), -50.0, epsilon = 1e-9);
        assert!(!tuning.is_set(PitchClass::FS));
    }

    #[test]
    fn test_quarter_tones_low() {
        let tuning = AutoMapper::new()
            .map_quarter_tones_low(true)
            .soft_chromatic_genus(SoftChromaticGenus::Off)
            .map(&scale(&[0.0, 150.0]), PitchClass::C.cents())
            .unwrap();
        assert_relative_eq!(tuning.get(PitchClass::CS).unwrap(), 50.0, epsilon = 1e-9);
        assert!(!tuning.is_set(PitchClass::D));
    }

    #[test]
    fn test_occupied_key_retries_other_neighbour() {
        // 150 and 170 both round to D; the second is pushed to C#
        let tuning = AutoMapper::new()
            .soft_chromatic_genus(SoftChromaticGenus::Off)
            .map(&scale(&[0.0, 150.0, 170.0]), PitchClass::C.cents())
            .unwrap();
        assert_relative_eq!(tuning.get(PitchClass::D).unwrap(), -50.0, epsilon = 1e-9);
        assert_relative_eq!(tuning.get(PitchClass::CS).unwrap(), 70.0, epsilon = 1e-9);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let overrides = KeyMapping::new().with(PitchClass::DS, 1);
        let tuning = AutoMapper::new()
            .overrides(overrides)
            .map(&scale(&[0.0, 230.0, 400.0]), PitchClass::C.cents())
            .unwrap();
        // 230 cents would round to D, the override keeps it on D#
        assert_relative_eq!(tuning.get(PitchClass::DS).unwrap(), -70.0, epsilon = 1e-9);
        assert!(!tuning.is_set(PitchClass::D));
        assert_relative_eq!(tuning.get(PitchClass::E).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_descending_scale() {
        let descending = scale(&[1200.0, 1000.0, 883.0, 650.0, 500.0, 300.0, 150.0, 0.0]);
        let tuning = AutoMapper::new()
            .map(&descending, PitchClass::D.cents())
            .unwrap();
        assert_relative_eq!(tuning.get(PitchClass::GS).unwrap(), 50.0, epsilon = 1e-9);
        assert!(!tuning.is_set(PitchClass::A));
    }
}
