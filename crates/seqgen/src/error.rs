//! Error types for identifier generation.
//!
//! Two families are kept apart:
//!
//! - [`ConfigError`]: raised while configuring a generator, or when the backing
//!   sequence/table turns out not to exist. These are fatal and never retried.
//! - [`Error`]: everything that can make a single `generate` call fail. The
//!   enclosing transaction is expected to roll back; nothing here retries on
//!   its own except the table structure's optimistic update loop.

use core::fmt;

use crate::{IdentifierType, database::StoreError};

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors detected while configuring a generator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The `optimizer` parameter named a strategy that does not exist.
    #[error("unknown optimizer strategy `{0}`")]
    UnknownStrategy(String),

    /// A required parameter was not supplied.
    #[error("missing required parameter `{0}`")]
    MissingParameter(String),

    /// A parameter was supplied but could not be used.
    #[error("invalid value `{value}` for parameter `{name}`: {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    /// The sequence or table backing a generator does not exist or cannot be
    /// read.
    #[error("backing structure `{name}` is unreachable: {reason}")]
    StructureUnreachable { name: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(name: &str, value: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_owned(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// All errors a `generate` call can surface.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A configuration problem, including a backing structure found missing
    /// during the first physical access.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A transient failure reported by the database. Not retried here.
    #[error("database access failed: {0}")]
    Store(#[source] StoreError),

    /// Every attempt of the optimistic update loop lost its race.
    #[error("gave up on `{table}` after {attempts} conflicting updates")]
    ConflictRetriesExhausted { table: String, attempts: u32 },

    /// Block arithmetic left the range of `i64`.
    #[error("arithmetic overflow while computing {0}")]
    Overflow(&'static str),

    /// The generated value does not fit the identifier's declared type.
    #[error("generated value {value} does not fit identifier type {target}")]
    IdentifierOverflow { value: i64, target: IdentifierType },

    /// The optimizer lock was **poisoned** by a panicking thread.
    ///
    /// When the `parking-lot` feature is enabled, mutexes do **not** poison,
    /// so this variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("lock poisoned by a panicking thread")]
    LockPoisoned,
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        if err.is_structural() {
            Self::Config(ConfigError::StructureUnreachable {
                name: err.object_name().unwrap_or_default().to_owned(),
                reason: err.to_string(),
            })
        } else {
            Self::Store(err)
        }
    }
}

#[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
#[cfg(not(feature = "parking-lot"))]
use crate::mutex::{MutexGuard, PoisonError};
#[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
