//! Integration tests for xentune-tuning.
//!
//! These tests run whole compositions through mapping, filling and reducing.

mod helpers;

use approx::assert_relative_eq;
use helpers::*;
use xentune_tuning::{
    Composition, Error, FillSettings, GlobalFill, KeyMapping, MapperSettings, PitchClass,
    ReducerSettings, Scale, SoftChromaticGenus, TuningReference, TuningSpec,
};

// ---------------------------------------------------------------------------
// 1. End-to-end modulation
// ---------------------------------------------------------------------------

#[test]
fn test_modulation_direct() {
    let list = modulation().resolve().unwrap();

    assert_eq!(list.len(), 3);
    assert_eq!(list.names(), vec!["minor", "major", "Romanian minor"]);

    let first = &list[0];
    assert_relative_eq!(first.deviation(PitchClass::D), 0.0, epsilon = CENTS_EPSILON);
    assert_relative_eq!(first.deviation(PitchClass::E), 3.91, epsilon = CENTS_EPSILON);
    // just minor third above D
    assert_relative_eq!(first.deviation(PitchClass::F), 15.64, epsilon = CENTS_EPSILON);
    // C# is not in the scale and keeps its 12-EDO position
    assert_relative_eq!(first.deviation(PitchClass::CS), 0.0);
}

#[test]
fn test_modulation_transposes_cumulatively() {
    let list = modulation().resolve().unwrap();

    // Major on B-flat (D + 8/5): its root sits 13.69 cents sharp
    assert_relative_eq!(list[1].deviation(PitchClass::AS), 13.69, epsilon = CENTS_EPSILON);

    // Romanian minor on G (8/5 * 5/3 = 8/3, a fourth above D)
    assert_relative_eq!(list[2].deviation(PitchClass::G), -1.96, epsilon = CENTS_EPSILON);
}

#[test]
fn test_modulation_merge_never_grows() {
    let merged = modulation()
        .with_reducer(ReducerSettings::merge(2.0))
        .resolve()
        .unwrap();
    assert!(merged.len() <= 3);
    assert!(!merged.is_empty());
}

#[test]
fn test_merge_identical_specs() {
    let composition = Composition::new(TuningReference::standard(PitchClass::D))
        .with_reducer(ReducerSettings::merge(2.0))
        .with_spec(TuningSpec::new(major()).named("A"))
        .with_spec(TuningSpec::new(major()).named("B"));
    let list = composition.resolve().unwrap();
    assert_eq!(list.names(), vec!["A + B"]);
}

// ---------------------------------------------------------------------------
// 2. Mapper behaviour through a composition
// ---------------------------------------------------------------------------

#[test]
fn test_soft_chromatic_through_composition() {
    let scale = soft_chromatic();
    let strict = Composition::new(TuningReference::standard(PitchClass::D))
        .with_spec(TuningSpec::new(scale.clone()))
        .resolve()
        .unwrap();
    assert_relative_eq!(strict[0].deviation(PitchClass::GS), 50.0, epsilon = 1e-9);
    assert_relative_eq!(strict[0].deviation(PitchClass::A), 0.0);

    let off = Composition::new(TuningReference::standard(PitchClass::D))
        .with_mapper(MapperSettings {
            soft_chromatic_genus: SoftChromaticGenus::Off,
            ..MapperSettings::default()
        })
        .with_spec(TuningSpec::new(scale))
        .resolve()
        .unwrap();
    assert_relative_eq!(off[0].deviation(PitchClass::A), -50.0, epsilon = 1e-9);
    assert_relative_eq!(off[0].deviation(PitchClass::GS), 0.0);
}

#[test]
fn test_manual_mapper_overflow_aborts_load() {
    let mapping = KeyMapping::new().with(PitchClass::C, 2);
    let composition = Composition::new(TuningReference::standard(PitchClass::D))
        .with_spec(TuningSpec::new(major()).with_mapper(MapperSettings::manual(mapping)));
    assert!(matches!(
        composition.resolve(),
        Err(Error::TuningMapperOverflow { .. })
    ));
}

#[test]
fn test_concert_pitch_reference() {
    // D sounding at 293.0 Hz, a little flat of 12-EDO (293.66 Hz)
    let reference = TuningReference::ConcertPitch {
        base: PitchClass::D,
        base_hz: 293.0,
        concert_pitch_class: PitchClass::A,
        concert_hz: 440.0,
    };
    let list = Composition::new(reference)
        .with_spec(TuningSpec::new(major()))
        .resolve()
        .unwrap();
    let expected = 1200.0 * (293.0_f64 / 293.664_767_7).log2();
    assert_relative_eq!(list[0].deviation(PitchClass::D), expected, epsilon = 1e-3);
}

// ---------------------------------------------------------------------------
// 3. Fills
// ---------------------------------------------------------------------------

#[test]
fn test_fore_fill_and_disabled_global_fill() {
    let pentatonic = Scale::from_cents("penta", &[0.0, 200.0, 400.0, 700.0, 900.0]).unwrap();
    let sharp: Vec<f64> = (0..12).map(|i| i as f64 * 100.0 + 5.0).collect();
    let chromatic = Scale::from_cents("chromatic", &sharp).unwrap();

    let composition = Composition::default()
        .with_global_fill(GlobalFill::Disabled)
        .with_spec(TuningSpec::new(pentatonic).with_fill(FillSettings {
            fore: true,
            ..FillSettings::default()
        }))
        .with_spec(TuningSpec::new(chromatic));
    let list = composition.resolve().unwrap();

    assert_relative_eq!(list[0].deviation(PitchClass::C), 0.0);
    assert_relative_eq!(list[0].deviation(PitchClass::CS), 5.0, epsilon = 1e-9);
    assert_relative_eq!(list[1].deviation(PitchClass::C), 5.0, epsilon = 1e-9);

    // Local fills are already part of the stored partial
    assert!(list.partial(0).unwrap().is_complete());
}

// ---------------------------------------------------------------------------
// 4. Configuration
// ---------------------------------------------------------------------------

#[test]
fn test_composition_from_json() {
    let json = r#"{
        "reference": {"type": "pitch-class", "base": "D"},
        "reducer": {"type": "direct"},
        "specs": [
            {"scale": {"name": "minor", "intervals": ["1/1", "9/8", "6/5", "4/3", "3/2", "8/5", "9/5", "2/1"]}},
            {"transposition": "8/5", "scale": {"name": "major", "intervals": ["1/1", "9/8", "5/4", "4/3", "3/2", "5/3", "15/8", "2/1"]}}
        ]
    }"#;
    let composition: Composition = serde_json::from_str(json).unwrap();
    let list = composition.resolve().unwrap();
    assert_eq!(list.len(), 2);
    assert_relative_eq!(list[0].deviation(PitchClass::E), 3.91, epsilon = CENTS_EPSILON);
}

#[test]
fn test_unknown_reducer_id() {
    let composition = Composition::default()
        .with_reducer(ReducerSettings {
            kind: "average".to_string(),
            tolerance: 1.0,
        })
        .with_spec(TuningSpec::new(major()));
    match composition.resolve() {
        Err(Error::PluginConfiguration { kind, id }) => {
            assert_eq!(kind, "tuning reducer");
            assert_eq!(id, "average");
        }
        other => panic!("expected plugin configuration error, got {other:?}"),
    }
}
