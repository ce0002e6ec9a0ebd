//! String-keyed constructors for the tagged pipeline variants.
//!
//! Settings name their variant with a `type` identifier. Identifiers are
//! matched case-insensitively; unknown ones fail with
//! [`Error::PluginConfiguration`] before anything is mapped.

use crate::composition::{MapperSettings, ReducerSettings};
use crate::error::{Error, Result};
use crate::mapper::{AutoMapper, ManualMapper, TuningMapper};
use crate::reducer::TuningReducer;

type MapperConstructor = fn(&MapperSettings) -> Result<TuningMapper>;
type ReducerConstructor = fn(&ReducerSettings) -> Result<TuningReducer>;

const MAPPERS: &[(&str, MapperConstructor)] = &[
    ("auto", auto_mapper),
    ("automatic", auto_mapper),
    ("manual", manual_mapper),
];

const REDUCERS: &[(&str, ReducerConstructor)] = &[
    ("direct", direct_reducer),
    ("merge", merge_reducer),
];

fn auto_mapper(settings: &MapperSettings) -> Result<TuningMapper> {
    Ok(TuningMapper::Auto(AutoMapper::from_settings(settings)))
}

fn manual_mapper(settings: &MapperSettings) -> Result<TuningMapper> {
    if settings.mapping.is_empty() {
        return Err(Error::InvalidConfig(
            "manual mapper needs at least one mapped pitch class".to_string(),
        ));
    }
    Ok(TuningMapper::Manual(ManualMapper::new(settings.mapping)))
}

fn direct_reducer(_: &ReducerSettings) -> Result<TuningReducer> {
    Ok(TuningReducer::Direct)
}

fn merge_reducer(settings: &ReducerSettings) -> Result<TuningReducer> {
    if !settings.tolerance.is_finite() || settings.tolerance < 0.0 {
        return Err(Error::InvalidConfig(format!(
            "merge tolerance must be a non-negative number of cents, got {}",
            settings.tolerance
        )));
    }
    Ok(TuningReducer::Merge {
        tolerance: settings.tolerance,
    })
}

fn lookup<T: Copy>(table: &[(&str, T)], kind: &'static str, id: &str) -> Result<T> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(id.trim()))
        .map(|(_, constructor)| *constructor)
        .ok_or_else(|| Error::PluginConfiguration {
            kind,
            id: id.to_string(),
        })
}

pub fn resolve_mapper(settings: &MapperSettings) -> Result<TuningMapper> {
    let constructor = lookup(MAPPERS, "tuning mapper", &settings.kind)?;
    constructor(settings)
}

pub fn resolve_reducer(settings: &ReducerSettings) -> Result<TuningReducer> {
    let constructor = lookup(REDUCERS, "tuning reducer", &settings.kind)?;
    constructor(settings)
}

/// Identifiers accepted in `MapperSettings::kind`.
pub fn mapper_ids() -> impl Iterator<Item = &'static str> {
    MAPPERS.iter().map(|(name, _)| *name)
}

/// Identifiers accepted in `ReducerSettings::kind`.
pub fn reducer_ids() -> impl Iterator<Item = &'static str> {
    REDUCERS.iter().map(|(name, _)| *name)
}
