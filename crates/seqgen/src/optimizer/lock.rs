use std::sync::Arc;

use crate::{
    GenerationState, Optimizer, OptimizerDescriptor, Result,
    mutex::{Mutex, lock},
    optimizer::AccessCallback,
};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// An [`Optimizer`] behind a mutex, shareable across threads.
///
/// The lock is taken before the block-exhaustion check and held for the whole
/// call, including any physical access. Two threads therefore never both
/// refill the same block, and values stay strictly increasing in the order the
/// lock was acquired.
///
/// Cloning shares the underlying optimizer.
#[derive(Clone, Debug)]
pub struct LockedOptimizer {
    #[cfg(feature = "cache-padded")]
    state: Arc<crossbeam_utils::CachePadded<Mutex<Optimizer>>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Arc<Mutex<Optimizer>>,
    descriptor: OptimizerDescriptor,
    increment_size: i64,
    applies_increment_size: bool,
}

impl LockedOptimizer {
    pub fn new(optimizer: Optimizer) -> Self {
        Self {
            descriptor: optimizer.descriptor(),
            increment_size: optimizer.increment_size(),
            applies_increment_size: optimizer.applies_increment_size_to_source_values(),
            #[cfg(feature = "cache-padded")]
            state: Arc::new(crossbeam_utils::CachePadded::new(Mutex::new(optimizer))),
            #[cfg(not(feature = "cache-padded"))]
            state: Arc::new(Mutex::new(optimizer)),
        }
    }

    /// Generates the next identifier under the lock.
    ///
    /// # Errors
    ///
    /// - Anything [`Optimizer::generate`] returns.
    /// - [`Error::LockPoisoned`] if another thread panicked while holding the
    ///   lock (std mutex only).
    ///
    /// [`Error::LockPoisoned`]: crate::Error
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip_all, fields(optimizer = %self.descriptor)))]
    pub fn try_generate<C>(&self, callback: &mut C) -> Result<i64>
    where
        C: AccessCallback + ?Sized,
    {
        let mut optimizer = lock(&self.state)?;
        optimizer.generate(callback)
    }

    pub fn descriptor(&self) -> OptimizerDescriptor {
        self.descriptor
    }

    pub fn increment_size(&self) -> i64 {
        self.increment_size
    }

    pub fn applies_increment_size_to_source_values(&self) -> bool {
        self.applies_increment_size
    }

    /// Snapshot of the state used by sessions without a tenant.
    pub fn state(&self) -> Result<GenerationState> {
        Ok(self.state_for(None)?.unwrap_or_default())
    }

    /// Snapshot of one tenant's state, `None` if the tenant never generated.
    pub fn state_for(&self, tenant: Option<&str>) -> Result<Option<GenerationState>> {
        Ok(lock(&self.state)?.state(tenant))
    }
}
