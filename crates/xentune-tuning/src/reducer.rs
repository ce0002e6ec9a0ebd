//! Reducers turn the ordered partial tunings into the final [`TuningList`].

use tracing::debug;

use crate::composition::ReducerSettings;
use crate::error::Result;
use crate::tuning::{PartialTuning, Tuning, TuningList};

/// Closed set of reducer variants.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TuningReducer {
    /// One output tuning per input tuning.
    #[default]
    Direct,
    /// Consecutive compatible tunings are merged into one.
    Merge {
        /// Largest deviation difference, in cents, that still counts as equal.
        tolerance: f64,
    },
}

impl TuningReducer {
    /// Resolves settings through the registry. Unknown `type`s fail.
    pub fn from_settings(settings: &ReducerSettings) -> Result<Self> {
        crate::registry::resolve_reducer(settings)
    }

    /// Reduces `partials` and fills what is left from `global_fill`.
    ///
    /// With no global fill every output tuning must already be complete,
    /// otherwise [`Error::IncompleteTunings`](crate::Error::IncompleteTunings)
    /// is returned.
    pub fn reduce(
        &self,
        partials: &[PartialTuning],
        global_fill: Option<&Tuning>,
    ) -> Result<TuningList> {
        reduce_each(partials, &vec![*self; partials.len()], global_fill)
    }
}

/// Reduces with a reducer per input tuning.
///
/// `reducers[i]` decides how `partials[i]` joins the running merge: a
/// `Direct` entry always stands alone, a `Merge` entry joins when it is
/// compatible with the accumulation under its own tolerance.
pub(crate) fn reduce_each(
    partials: &[PartialTuning],
    reducers: &[TuningReducer],
    global_fill: Option<&Tuning>,
) -> Result<TuningList> {
    debug_assert_eq!(partials.len(), reducers.len());

    let mut list = TuningList::new();
    let mut pending: Option<PartialTuning> = None;

    for (partial, reducer) in partials.iter().zip(reducers) {
        match *reducer {
            TuningReducer::Direct => {
                if let Some(merged) = pending.take() {
                    flush(&mut list, merged, global_fill)?;
                }
                flush(&mut list, partial.clone(), global_fill)?;
            }
            TuningReducer::Merge { tolerance } => {
                pending = Some(match pending.take() {
                    Some(merged) if merged.is_compatible(partial, tolerance) => {
                        debug!(into = merged.name(), tuning = partial.name(), "Merging tuning");
                        let mut combined = merged.fill(partial);
                        combined.set_name(format!("{} + {}", merged.name(), partial.name()));
                        combined
                    }
                    Some(merged) => {
                        flush(&mut list, merged, global_fill)?;
                        partial.clone()
                    }
                    None => partial.clone(),
                });
            }
        }
    }
    if let Some(merged) = pending {
        flush(&mut list, merged, global_fill)?;
    }
    Ok(list)
}

fn flush(list: &mut TuningList, partial: PartialTuning, global_fill: Option<&Tuning>) -> Result<()> {
    let tuning = match global_fill {
        Some(global) => partial.fill_complete(global),
        None => partial.resolve()?,
    };
    debug!(tuning = %tuning, "Resolved tuning");
    list.push(tuning, partial);
    Ok(())
}
