//! Tolerance constants for tuning tests.
//!
//! Different values are quoted to different precision.

/// Floating point rounding errors (ratio and cents conversions).
pub const FLOAT_EPSILON: f64 = 1e-9;

/// Deviations quoted to two decimals in reference tables.
pub const CENTS_EPSILON: f64 = 0.02;

/// 1-byte MTS resolution is one cent per step.
pub const MTS_1_BYTE_EPSILON: f64 = 0.5;

/// Hz comparisons for frequencies derived from rounded deviations.
pub const HZ_EPSILON: f64 = 0.01;
