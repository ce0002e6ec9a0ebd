//! Scale and composition fixtures shared by the tuning tests.
//!
//! The root `xentune` tests include this file through their own helpers
//! module, so it only names `xentune_tuning` items.

#![allow(dead_code)]

use xentune_tuning::{
    Composition, Interval, PitchClass, ReducerSettings, Scale, TuningReference, TuningSpec,
};

/// Deviation tolerance for values quoted to two decimals.
pub const CENTS_EPSILON: f64 = 0.02;

/// Scale from ratio strings such as `"9/8"`.
pub fn ratio_scale(name: &str, ratios: &[&str]) -> Scale {
    let intervals = ratios
        .iter()
        .map(|r| r.parse::<Interval>().expect("Invalid ratio in fixture"))
        .collect();
    Scale::new(name, intervals).expect("Invalid fixture scale")
}

pub fn minor() -> Scale {
    ratio_scale("minor", &["1/1", "9/8", "6/5", "4/3", "3/2", "8/5", "9/5", "2/1"])
}

pub fn major() -> Scale {
    ratio_scale("major", &["1/1", "9/8", "5/4", "4/3", "3/2", "5/3", "15/8", "2/1"])
}

pub fn romanian_minor() -> Scale {
    ratio_scale(
        "Romanian minor",
        &["1/1", "9/8", "6/5", "45/32", "3/2", "5/3", "9/5", "2/1"],
    )
}

/// Maqam-like scale with a soft chromatic tetrachord on D.
pub fn soft_chromatic() -> Scale {
    Scale::from_cents(
        "soft chromatic",
        &[0.0, 150.0, 300.0, 500.0, 650.0, 883.0, 1000.0, 1200.0],
    )
    .expect("Invalid fixture scale")
}

pub fn ratio(numerator: i64, denominator: i64) -> Interval {
    Interval::ratio(numerator, denominator).expect("Invalid fixture ratio")
}

/// D minor, then major at a minor sixth, then Romanian minor at a major
/// sixth, each reduced directly.
pub fn modulation() -> Composition {
    Composition::new(TuningReference::standard(PitchClass::D))
        .with_reducer(ReducerSettings::direct())
        .with_spec(TuningSpec::new(minor()))
        .with_spec(TuningSpec::new(major()).transposed(ratio(8, 5)))
        .with_spec(TuningSpec::new(romanian_minor()).transposed(ratio(5, 3)))
}
