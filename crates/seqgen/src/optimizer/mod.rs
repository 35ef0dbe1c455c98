//! Optimizers turn raw values from a database structure into identifiers.
//!
//! Each strategy is a variant of [`Optimizer`] owning its own state. All
//! variants require serialized access (`&mut self`); [`LockedOptimizer`] is
//! the shareable wrapper generators use.

mod descriptor;
mod hilo;
mod legacy_hilo;
mod lock;
mod noop;
mod pooled;
mod pooled_lo;

pub use descriptor::*;
pub use hilo::*;
pub use legacy_hilo::*;
pub use lock::*;
pub use noop::*;
pub use pooled::*;
pub use pooled_lo::*;

use std::collections::HashMap;

use crate::{ConfigError, Error, Result};

/// The optimizer's view of a database structure.
///
/// `next_value` performs one physical access. The tenant identifier selects
/// which block state the optimizer works on.
pub trait AccessCallback {
    /// Fetches the next raw value from the backing structure.
    ///
    /// # Errors
    ///
    /// Whatever the structure reports; optimizers propagate it untouched.
    fn next_value(&mut self) -> Result<i64>;

    fn tenant_identifier(&self) -> Option<&str> {
        None
    }
}

impl<F> AccessCallback for F
where
    F: FnMut() -> Result<i64>,
{
    fn next_value(&mut self) -> Result<i64> {
        self()
    }
}

/// A read-only snapshot of one tenant's optimizer state.
///
/// `hi_value` is the strategy's high-water mark: the exclusive upper limit of
/// the block for `hilo` and `pooled-lo`, the inclusive stored value for
/// `pooled`, the block base for `legacy-hilo`, and `None` for `none`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationState {
    pub last_source_value: Option<i64>,
    pub last_value: Option<i64>,
    pub hi_value: Option<i64>,
}

/// One state for sessions without a tenant, plus one per tenant seen.
#[derive(Clone, Debug)]
pub(crate) struct TenantStates<S> {
    initial: S,
    default: S,
    tenants: HashMap<String, S>,
}

impl<S: Clone> TenantStates<S> {
    pub(crate) fn new(initial: S) -> Self {
        Self {
            default: initial.clone(),
            initial,
            tenants: HashMap::new(),
        }
    }

    pub(crate) fn locate(&mut self, tenant: Option<&str>) -> &mut S {
        match tenant {
            None => &mut self.default,
            Some(tenant) => self
                .tenants
                .entry(tenant.to_owned())
                .or_insert_with(|| self.initial.clone()),
        }
    }

    pub(crate) fn get(&self, tenant: Option<&str>) -> Option<&S> {
        match tenant {
            None => Some(&self.default),
            Some(tenant) => self.tenants.get(tenant),
        }
    }
}

/// Advances `last_value` by one and returns it.
///
/// Strategies keep the last identifier served rather than the next one, so a
/// block ending at `i64::MAX` can still serve its top value.
#[inline]
pub(crate) fn advance(last_value: &mut i64) -> Result<i64> {
    *last_value = last_value
        .checked_add(1)
        .ok_or(Error::Overflow("next identifier"))?;
    Ok(*last_value)
}

/// A configured optimization strategy and its state.
#[derive(Clone, Debug)]
pub enum Optimizer {
    None(NoopOptimizer),
    HiLo(HiLoOptimizer),
    LegacyHiLo(LegacyHiLoOptimizer),
    Pooled(PooledOptimizer),
    PooledLo(PooledLoOptimizer),
}

impl Optimizer {
    /// Builds an optimizer from its strategy name.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownStrategy`] for unknown names, plus anything
    /// [`build_optimizer`] rejects.
    pub fn from_strategy(
        name: &str,
        increment_size: i64,
        initial_value: Option<i64>,
    ) -> Result<Self, ConfigError> {
        build_optimizer(name.parse()?, increment_size, initial_value)
    }

    /// Produces the next identifier, calling back into the structure only
    /// when the current block is exhausted.
    ///
    /// # Errors
    ///
    /// Errors from `callback` are propagated as-is; the optimizer state is
    /// left as it was before the failed access.
    pub fn generate<C>(&mut self, callback: &mut C) -> Result<i64>
    where
        C: AccessCallback + ?Sized,
    {
        match self {
            Self::None(o) => o.generate(callback),
            Self::HiLo(o) => o.generate(callback),
            Self::LegacyHiLo(o) => o.generate(callback),
            Self::Pooled(o) => o.generate(callback),
            Self::PooledLo(o) => o.generate(callback),
        }
    }

    pub fn descriptor(&self) -> OptimizerDescriptor {
        match self {
            Self::None(_) => OptimizerDescriptor::None,
            Self::HiLo(_) => OptimizerDescriptor::HiLo,
            Self::LegacyHiLo(_) => OptimizerDescriptor::LegacyHiLo,
            Self::Pooled(_) => OptimizerDescriptor::Pooled,
            Self::PooledLo(_) => OptimizerDescriptor::PooledLo,
        }
    }

    pub fn increment_size(&self) -> i64 {
        match self {
            Self::None(o) => o.increment_size(),
            Self::HiLo(o) => o.increment_size(),
            Self::LegacyHiLo(o) => o.increment_size(),
            Self::Pooled(o) => o.increment_size(),
            Self::PooledLo(o) => o.increment_size(),
        }
    }

    /// Whether the structure should advance by the increment size on each
    /// access (the stored value is a block boundary) rather than by one.
    pub fn applies_increment_size_to_source_values(&self) -> bool {
        match self {
            Self::None(o) => o.applies_increment_size_to_source_values(),
            _ => self.descriptor().is_pooled(),
        }
    }

    /// State of the given tenant, `None` if that tenant never generated.
    pub fn state(&self, tenant: Option<&str>) -> Option<GenerationState> {
        match self {
            Self::None(o) => o.state(tenant),
            Self::HiLo(o) => o.state(tenant),
            Self::LegacyHiLo(o) => o.state(tenant),
            Self::Pooled(o) => o.state(tenant),
            Self::PooledLo(o) => o.state(tenant),
        }
    }

    /// The raw value most recently fetched for sessions without a tenant.
    pub fn last_source_value(&self) -> Option<i64> {
        self.state(None).and_then(|s| s.last_source_value)
    }

    /// The identifier most recently handed out to sessions without a tenant.
    pub fn last_value(&self) -> Option<i64> {
        self.state(None).and_then(|s| s.last_value)
    }

    pub fn hi_value(&self) -> Option<i64> {
        self.state(None).and_then(|s| s.hi_value)
    }
}
