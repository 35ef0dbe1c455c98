use crate::{
    Error, Result,
    optimizer::{AccessCallback, GenerationState, TenantStates, advance},
};

#[derive(Clone, Debug, Default)]
struct HiLoState {
    last_source_value: Option<i64>,
    /// Exclusive upper end of the current block.
    upper_limit: i64,
    last_value: i64,
}

/// The hi/lo algorithm.
///
/// The structure yields block numbers (`hi`), advancing by one; every block
/// number is worth `increment_size` identifiers computed locally:
///
/// ```text
/// source 1 -> upper limit 1*N + 1 -> values 1 ..= N
/// source 2 -> upper limit 2*N + 1 -> values N+1 ..= 2N
/// ```
///
/// Every fetch, the first one included, repositions the generator at the
/// bottom of the fetched block. Generators sharing one structure therefore
/// never serve from each other's blocks.
///
/// # Example
/// ```
/// use seqgen::{OptimizerDescriptor, build_optimizer};
///
/// let mut optimizer = build_optimizer(OptimizerDescriptor::HiLo, 3, None).unwrap();
/// let mut source = 0;
/// let mut next = || {
///     source += 1;
///     Ok::<_, seqgen::Error>(source)
/// };
/// let ids: Vec<i64> = (0..4).map(|_| optimizer.generate(&mut next).unwrap()).collect();
/// assert_eq!(ids, [1, 2, 3, 4]);
/// assert_eq!(optimizer.last_source_value(), Some(2));
/// assert_eq!(optimizer.hi_value(), Some(7));
/// ```
#[derive(Clone, Debug)]
pub struct HiLoOptimizer {
    increment_size: i64,
    states: TenantStates<HiLoState>,
}

impl HiLoOptimizer {
    pub(crate) fn new(increment_size: i64) -> Self {
        Self {
            increment_size,
            states: TenantStates::new(HiLoState::default()),
        }
    }

    pub fn increment_size(&self) -> i64 {
        self.increment_size
    }

    /// The exclusive upper limit of the block for `source`, and the value
    /// just below its first identifier.
    fn block(source: i64, increment_size: i64) -> Result<(i64, i64)> {
        let upper_limit = source
            .checked_mul(increment_size)
            .and_then(|v| v.checked_add(1))
            .ok_or(Error::Overflow("hi/lo upper limit"))?;
        let floor = source
            .checked_sub(1)
            .and_then(|v| v.checked_mul(increment_size))
            .ok_or(Error::Overflow("hi/lo block start"))?;
        Ok((upper_limit, floor))
    }

    pub(crate) fn generate<C>(&mut self, callback: &mut C) -> Result<i64>
    where
        C: AccessCallback + ?Sized,
    {
        let increment_size = self.increment_size;
        let state = self.states.locate(callback.tenant_identifier());

        match state.last_source_value {
            None => {
                let mut source = callback.next_value()?;
                while source < 1 {
                    source = callback.next_value()?;
                }
                let (upper_limit, floor) = Self::block(source, increment_size)?;
                state.last_source_value = Some(source);
                state.upper_limit = upper_limit;
                state.last_value = floor;
            }
            Some(_) if state.last_value >= state.upper_limit - 1 => {
                let source = callback.next_value()?;
                let (upper_limit, floor) = Self::block(source, increment_size)?;

                #[cfg(feature = "tracing")]
                tracing::debug!(source, upper_limit, last_value = state.last_value, "hi/lo block rollover");

                state.last_source_value = Some(source);
                state.upper_limit = upper_limit;
                state.last_value = floor;
            }
            Some(_) => {}
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
