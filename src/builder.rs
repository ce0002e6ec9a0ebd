//! Builder for configuring and constructing a `XentuneEngine`.

use std::sync::Arc;

use tracing::info;
use xentune_tuning::{Composition, TuningList};

use crate::{Error, Result, XentuneEngine};

#[cfg(feature = "midi")]
use xentune_midi::TuningNavigator;

/// The composition is resolved once in [`build`](Self::build); any pipeline
/// error aborts the load and no engine is produced.
///
/// # Example
///
/// ```ignore
/// use xentune::prelude::*;
///
/// let engine = XentuneEngine::builder()
///     .composition(composition)
///     .memory_fill(true)
///     .build()?;
///
/// println!("{:?}", engine.tuning_names());
/// ```
#[derive(Debug, Default)]
pub struct XentuneEngineBuilder {
    composition: Option<Composition>,
    tunings: Option<TuningList>,
    #[cfg(feature = "midi")]
    memory_fill: bool,
}

impl XentuneEngineBuilder {
    pub fn composition(mut self, composition: Composition) -> Self {
        self.composition = Some(composition);
        self
    }

    /// Use an already resolved list instead of a composition.
    pub fn tunings(mut self, tunings: TuningList) -> Self {
        self.tunings = Some(tunings);
        self
    }

    /// Fill gaps of each tuning from the one that sounded before it.
    /// Also enabled by `fill.memory` on the composition.
    /// Default: false
    #[cfg(feature = "midi")]
    pub fn memory_fill(mut self, enabled: bool) -> Self {
        self.memory_fill = enabled;
        self
    }

    pub fn build(self) -> Result<XentuneEngine> {
        let tunings = match (self.tunings, &self.composition) {
            (Some(tunings), _) => tunings,
            (None, Some(composition)) => composition.resolve()?,
            (None, None) => return Err(Error::MissingComposition),
        };
        let tunings = Arc::new(tunings);
        info!(tunings = tunings.len(), names = ?tunings.names(), "Tuning list loaded");

        #[cfg(feature = "midi")]
        let navigator = {
            let navigator = TuningNavigator::new(Arc::clone(&tunings))?;
            let memory_fill = self.memory_fill
                || self.composition.as_ref().is_some_and(Composition::memory_fill);
            if memory_fill {
                info!("Memory fill enabled");
            }
            Arc::new(if memory_fill {
                navigator.with_memory_fill()
            } else {
                navigator
            })
        };

        Ok(XentuneEngine::from_parts(
            tunings,
            #[cfg(feature = "midi")]
            navigator,
        ))
    }
}
