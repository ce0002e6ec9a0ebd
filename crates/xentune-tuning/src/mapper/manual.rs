use crate::composition::{KeyMapping, Scale};
use crate::error::Result;
use crate::tuning::PartialTuning;

use super::assign_degree;

/// Maps exactly the pitch classes listed in a [`KeyMapping`].
#[derive(Debug, Clone, PartialEq)]
pub struct ManualMapper {
    mapping: KeyMapping,
}

impl ManualMapper {
    pub fn new(mapping: KeyMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &KeyMapping {
        &self.mapping
    }

    pub(crate) fn map(&self, scale: &Scale, root_cents: f64) -> Result<PartialTuning> {
        let mut tuning = PartialTuning::new(scale.name.clone());
        for (pitch_class, degree) in self.mapping.iter() {
            assign_degree(&mut tuning, scale, root_cents, pitch_class, degree)?;
        }
        Ok(tuning)
    }
}
