use crate::{
    Error, Result,
    optimizer::{AccessCallback, GenerationState, TenantStates, advance},
};

#[derive(Clone, Debug, Default)]
struct PooledLoState {
    last_source_value: Option<i64>,
    upper_limit: i64,
    last_value: i64,
}

/// The structure stores the low end of each block; identifiers are served
/// from the fetched value up to, but excluding, `value + increment_size`.
#[derive(Clone, Debug)]
pub struct PooledLoOptimizer {
    increment_size: i64,
    states: TenantStates<PooledLoState>,
}

impl PooledLoOptimizer {
    pub(crate) fn new(increment_size: i64) -> Self {
        Self {
            increment_size,
            states: TenantStates::new(PooledLoState::default()),
        }
    }

    pub fn increment_size(&self) -> i64 {
        self.increment_size
    }

    pub(crate) fn generate<C>(&mut self, callback: &mut C) -> Result<i64>
    where
        C: AccessCallback + ?Sized,
    {
        let increment_size = self.increment_size;
        let state = self.states.locate(callback.tenant_identifier());

        if state.last_source_value.is_none() || state.last_value >= state.upper_limit - 1 {
            let source = callback.next_value()?;
            let upper_limit = source
                .checked_add(increment_size)
                .ok_or(Error::Overflow("pooled-lo upper limit"))?;

            #[cfg(feature = "tracing")]
            tracing::debug!(source, upper_limit, "pooled-lo block rollover");

            state.last_source_value = Some(source);
            state.upper_limit = upper_limit;
            state.last_value = source.max(1) - 1;
        }

        advance(&mut state.last_value)
    }

    pub(crate) fn state(&self, tenant: Option<&str>) -> Option<GenerationState> {
        self.states.get(tenant).map(|s| match s.last_source_value {
            None => GenerationState::default(),
            Some(source) => GenerationState {
                last_source_value: Some(source),
                last_value: Some(s.last_value),
                hi_value: Some(s.upper_limit),
            },
        })
    }
}
