//! Test helpers and fixtures for Xentune integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-9): Exact conversions
//! - `CENTS_EPSILON` (0.02): Deviations quoted to two decimals
//! - `MTS_1_BYTE_EPSILON` (0.5): 1-byte MTS rounding
//! - `HZ_EPSILON` (0.01): Frequencies

#![allow(dead_code)]

pub mod tolerances;

#[path = "../../crates/xentune-tuning/tests/helpers/mod.rs"]
mod fixtures;

pub use fixtures::{major, minor, modulation, ratio, ratio_scale, romanian_minor, soft_chromatic};

use xentune::prelude::*;

/// Engine over [`modulation`].
pub fn test_engine() -> XentuneEngine {
    XentuneEngine::builder()
        .composition(modulation())
        .build()
        .expect("Failed to create test engine")
}

/// Installs a test-writer subscriber once; set `RUST_LOG`-style filters by
/// editing the max level here when debugging.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
