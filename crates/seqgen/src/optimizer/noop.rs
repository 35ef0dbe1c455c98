use crate::{
    Result,
    optimizer::{AccessCallback, GenerationState, TenantStates},
};

/// Hands out every value the structure produces, one access per identifier.
///
/// Values below 1 are skipped so that a structure starting at 0 or lower
/// never yields an unusable identifier.
#[derive(Clone, Debug)]
pub struct NoopOptimizer {
    increment_size: i64,
    states: TenantStates<Option<i64>>,
}

impl NoopOptimizer {
    pub(crate) fn new(increment_size: i64) -> Self {
        Self {
            increment_size,
            states: TenantStates::new(None),
        }
    }

    pub fn increment_size(&self) -> i64 {
        self.increment_size
    }

    /// A structure read without optimization still honors a configured
    /// increment larger than one.
    pub fn applies_increment_size_to_source_values(&self) -> bool {
        self.increment_size > 1
    }

    pub(crate) fn generate<C>(&mut self, callback: &mut C) -> Result<i64>
    where
        C: AccessCallback + ?Sized,
    {
        let mut value = callback.next_value()?;
        while value < 1 {
            value = callback.next_value()?;
        }
        *self.states.locate(callback.tenant_identifier()) = Some(value);
        Ok(value)
    }

    pub(crate) fn state(&self, tenant: Option<&str>) -> Option<GenerationState> {
        self.states.get(tenant).map(|last| GenerationState {
            last_source_value: *last,
            last_value: *last,
            hi_value: None,
        })
    }
}
