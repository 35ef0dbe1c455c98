use crate::{
    Error, Result,
    optimizer::{AccessCallback, GenerationState, TenantStates, advance},
};

#[derive(Clone, Debug, Default)]
struct PooledState {
    /// Inclusive upper end of the current block, as stored in the database.
    hi_value: Option<i64>,
    last_value: i64,
}

/// The structure stores the high end of each block; identifiers are served
/// from `hi - (increment_size - 1)` up to and including `hi`.
///
/// A freshly created structure returns its initial value first. That value is
/// the low end of the first block rather than a high end, so the optimizer
/// fetches once more to learn where the block ends.
#[derive(Clone, Debug)]
pub struct PooledOptimizer {
    increment_size: i64,
    initial_value: Option<i64>,
    states: TenantStates<PooledState>,
}

impl PooledOptimizer {
    pub(crate) fn new(increment_size: i64, initial_value: Option<i64>) -> Self {
        Self {
            increment_size,
            initial_value,
            states: TenantStates::new(PooledState::default()),
        }
    }

    pub fn increment_size(&self) -> i64 {
        self.increment_size
    }

    /// The value just below the block ending at `hi_value`.
    fn block_floor(hi_value: i64, increment_size: i64) -> Result<i64> {
        hi_value
            .checked_sub(increment_size)
            .ok_or(Error::Overflow("pooled block start"))
    }

    pub(crate) fn generate<C>(&mut self, callback: &mut C) -> Result<i64>
    where
        C: AccessCallback + ?Sized,
    {
        let increment_size = self.increment_size;
        let initial_value = self.initial_value;
        let state = self.states.locate(callback.tenant_identifier());

        match state.hi_value {
            None => {
                let value = callback.next_value()?;

                #[cfg(feature = "tracing")]
                {
                    if value < 1 {
                        tracing::warn!(value, "pooled optimizer received an initial value below 1");
                    }
                }

                let fresh = match initial_value {
                    None => value < increment_size,
                    Some(initial) => value == initial,
                };
                if fresh {
                    let hi_value = callback.next_value()?;
                    state.last_value = value
                        .checked_sub(1)
                        .ok_or(Error::Overflow("pooled block start"))?;
                    state.hi_value = Some(hi_value);
                } else {
                    state.last_value = Self::block_floor(value, increment_size)?;
                    state.hi_value = Some(value);
                }
            }
            Some(hi_value) if state.last_value >= hi_value => {
                let hi_value = callback.next_value()?;
                let last_value = Self::block_floor(hi_value, increment_size)?;

                #[cfg(feature = "tracing")]
                tracing::debug!(hi_value, first = last_value + 1, "pooled block rollover");

                state.hi_value = Some(hi_value);
                state.last_value = last_value;
            }
            Some(_) => {}
        }

        advance(&mut state.last_value)
    }

    pub(crate) fn state(&self, tenant: Option<&str>) -> Option<GenerationState> {
        self.states.get(tenant).map(|s| GenerationState {
            last_source_value: s.hi_value,
            last_value: s.hi_value.map(|_| s.last_value),
            hi_value: s.hi_value,
        })
    }
}
