use crate::{
    Error, Result,
    optimizer::{AccessCallback, GenerationState, TenantStates},
};

#[derive(Clone, Debug)]
struct LegacyHiLoState {
    last_source_value: Option<i64>,
    hi: i64,
    lo: i64,
}

/// The historical hi/lo variant.
///
/// Each block number is worth `increment_size + 1` values (`max_lo + 1`), and
/// identifiers are `hi + lo`. The block for source value 0 starts at `lo = 1`
/// so that 0 is never handed out.
///
/// With `increment_size = 3`, source values 0, 1, 2 give
/// `1 2 3 | 4 5 6 7 | 8 9 10 11`.
#[derive(Clone, Debug)]
pub struct LegacyHiLoOptimizer {
    max_lo: i64,
    states: TenantStates<LegacyHiLoState>,
}

impl LegacyHiLoOptimizer {
    pub(crate) fn new(increment_size: i64) -> Self {
        Self {
            max_lo: increment_size,
            states: TenantStates::new(LegacyHiLoState {
                last_source_value: None,
                hi: 0,
                lo: 0,
            }),
        }
    }

    pub fn increment_size(&self) -> i64 {
        self.max_lo
    }

    pub(crate) fn generate<C>(&mut self, callback: &mut C) -> Result<i64>
    where
        C: AccessCallback + ?Sized,
    {
        let max_lo = self.max_lo;
        let state = self.states.locate(callback.tenant_identifier());

        if state.last_source_value.is_none() || state.lo > max_lo {
            let block_size = max_lo
                .checked_add(1)
                .ok_or(Error::Overflow("legacy hi/lo block size"))?;
            let source = callback.next_value()?;
            let hi = source
                .checked_mul(block_size)
                .ok_or(Error::Overflow("legacy hi/lo block base"))?;

            #[cfg(feature = "tracing")]
            tracing::debug!(source, hi, "legacy hi/lo block rollover");

            state.last_source_value = Some(source);
            state.lo = if source == 0 { 1 } else { 0 };
            state.hi = hi;
        }

        let value = state
            .hi
            .checked_add(state.lo)
            .ok_or(Error::Overflow("next identifier"))?;
        // lo <= max_lo < i64::MAX here
        state.lo += 1;
        Ok(value)
    }

    pub(crate) fn state(&self, tenant: Option<&str>) -> Option<GenerationState> {
        self.states.get(tenant).map(|s| match s.last_source_value {
            None => GenerationState::default(),
            Some(source) => GenerationState {
                last_source_value: Some(source),
                last_value: Some(s.hi + s.lo - 1),
                hi_value: Some(s.hi),
            },
        })
    }
}
