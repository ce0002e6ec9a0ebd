//! Tuning list assembly: mapping, filling and reducing a whole composition.

use tracing::{debug, info};

use crate::composition::{Composition, GlobalFill, TuningSpec};
use crate::error::Result;
use crate::fill::local_fill;
use crate::interval::Interval;
use crate::mapper::TuningMapper;
use crate::reducer::{reduce_each, TuningReducer};
use crate::tuning::{PartialTuning, Tuning, TuningList};

/// Resolves `composition` into its immutable tuning list.
///
/// Each spec is mapped against the reference shifted by the running
/// transposition. The mapped tunings are locally filled, reduced, and their
/// remaining gaps are taken from the global fill. Every identifier is
/// resolved before the first scale is mapped, so configuration errors never
/// surface halfway through.
pub fn build_tuning_list(composition: &Composition) -> Result<TuningList> {
    let root_cents = composition.reference.root_cents()?;

    let default_mapper = TuningMapper::from_settings(&composition.mapper)?;
    let mappers = composition
        .specs
        .iter()
        .map(|spec| match &spec.mapper {
            Some(settings) => TuningMapper::from_settings(settings),
            None => Ok(default_mapper.clone()),
        })
        .collect::<Result<Vec<_>>>()?;
    let reducers = composition
        .specs
        .iter()
        .map(|spec| {
            TuningReducer::from_settings(spec.reducer.as_ref().unwrap_or(&composition.reducer))
        })
        .collect::<Result<Vec<_>>>()?;
    let fills: Vec<_> = composition
        .specs
        .iter()
        .map(|spec| spec.fill.unwrap_or(composition.fill))
        .collect();

    let mut transposition = Interval::unison();
    let mut partials = Vec::with_capacity(composition.specs.len());
    for (spec, mapper) in composition.specs.iter().zip(&mappers) {
        transposition = next_transposition(transposition, spec);
        let mut partial = mapper.map(&spec.scale, root_cents + transposition.to_cents())?;
        partial.set_name(spec.display_name());
        debug!(
            spec = spec.display_name(),
            transposition = %transposition,
            tuning = %partial,
            "Mapped tuning spec"
        );
        partials.push(partial);
    }

    let filled = local_fill(&partials, &fills);
    let global = global_fill_tuning(composition, root_cents, &default_mapper)?;
    let list = reduce_each(&filled, &reducers, global.as_ref())?;

    info!(
        specs = composition.specs.len(),
        tunings = list.len(),
        "Resolved composition"
    );
    Ok(list)
}

/// Running transposition after `spec`, normalized to one octave.
fn next_transposition(current: Interval, spec: &TuningSpec) -> Interval {
    let next = if spec.reset_transposition {
        spec.transposition
    } else {
        current + spec.transposition
    };
    next.normalize()
}

fn global_fill_tuning(
    composition: &Composition,
    root_cents: f64,
    default_mapper: &TuningMapper,
) -> Result<Option<Tuning>> {
    match &composition.global_fill {
        GlobalFill::EqualTemperament => Ok(Some(Tuning::equal_temperament())),
        GlobalFill::Disabled => Ok(None),
        GlobalFill::Spec(spec) => {
            let mapper = match &spec.mapper {
                Some(settings) => TuningMapper::from_settings(settings)?,
                None => default_mapper.clone(),
            };
            let transposition = next_transposition(Interval::unison(), spec);
            let partial: PartialTuning =
                mapper.map(&spec.scale, root_cents + transposition.to_cents())?;
            let mut tuning = partial.fill_complete(&Tuning::equal_temperament());
            tuning.set_name(spec.display_name());
            debug!(tuning = %tuning, "Resolved global fill");
            Ok(Some(tuning))
        }
    }
}
