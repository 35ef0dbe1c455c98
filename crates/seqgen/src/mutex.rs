#[cfg(feature = "parking-lot")]
pub use parking_lot::{Mutex, MutexGuard};
#[cfg(not(feature = "parking-lot"))]
pub use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::Error;

/// Acquires `mutex`, mapping poisoning to [`Error::LockPoisoned`] when the std
/// mutex is in use.
///
/// With the `parking-lot` feature enabled, mutexes do not poison and this
/// never fails.
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, Error> {
    #[cfg(feature = "parking-lot")]
    {
        Ok(mutex.lock())
    }
    #[cfg(not(feature = "parking-lot"))]
    {
        Ok(mutex.lock()?)
    }
}
