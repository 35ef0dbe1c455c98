//! The relational store, seen from the identifier layer.
//!
//! Generators never talk SQL to a driver directly. They go through
//! [`Database`], a narrow, object-safe trait covering exactly the statements
//! the structures need: advance a sequence, and read / insert /
//! compare-and-set a counter row. A [`Session`] carries the database handle
//! (and tenant) for the duration of one `generate` call.

mod memory;
mod schema;

pub use memory::*;
pub use schema::*;

/// Features of the underlying database relevant to identifier generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capabilities {
    /// Whether native sequences are available. Sequence-style generators fall
    /// back to a table when they are not.
    pub supports_sequences: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            supports_sequences: true,
        }
    }
}

/// Errors reported by a [`Database`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("sequence `{0}` does not exist")]
    UnknownSequence(String),

    #[error("table `{0}` does not exist")]
    UnknownTable(String),

    #[error("column `{column}` of `{table}` could not be read")]
    Unreadable { table: String, column: String },

    #[error("`{0}` already exists")]
    AlreadyExists(String),

    /// Connection loss, lock timeout and the like.
    #[error("{0}")]
    Io(String),
}

impl StoreError {
    /// `true` when the failure means the backing structure is missing or
    /// malformed, as opposed to a transient problem.
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::UnknownSequence(_) | Self::UnknownTable(_) | Self::Unreadable { .. }
        )
    }

    /// The sequence or table the error refers to, when known.
    pub fn object_name(&self) -> Option<&str> {
        match self {
            Self::UnknownSequence(name) | Self::UnknownTable(name) | Self::AlreadyExists(name) => {
                Some(name)
            }
            Self::Unreadable { table, .. } => Some(table),
            Self::Io(_) => None,
        }
    }
}

/// The key column and value of one row in a segmented generator table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Segment<'a> {
    pub column: &'a str,
    pub value: &'a str,
}

/// Addresses the counter cell a table structure reads and updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CounterRow<'a> {
    pub table: &'a str,
    pub value_column: &'a str,
    /// `None` for single-row tables.
    pub segment: Option<Segment<'a>>,
}

/// Access to the physical sequences and tables backing generators.
///
/// Every method is a single statement executed atomically by the store.
/// Implementations must be usable from many threads; generators hold no
/// connection of their own.
pub trait Database: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    /// Advances `sequence` and returns its new value.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownSequence`] if it does not exist.
    fn next_sequence_value(&self, sequence: &str) -> Result<i64, StoreError>;

    /// Reads the counter, `Ok(None)` if the row does not exist.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownTable`] if the table does not exist.
    fn select_value(&self, row: &CounterRow<'_>) -> Result<Option<i64>, StoreError>;

    /// Inserts the counter row with `value`.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyExists`] if another writer created it first.
    fn insert_value(&self, row: &CounterRow<'_>, value: i64) -> Result<(), StoreError>;

    /// Sets the counter to `new` only if it currently holds `expected`.
    /// Returns the number of rows changed: `0` means the row moved on.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownTable`] if the table does not exist.
    fn update_value(&self, row: &CounterRow<'_>, new: i64, expected: i64) -> Result<u64, StoreError>;

    /// Creates a sequence or table (and its seed row).
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyExists`] if the object exists.
    fn create_object(&self, object: &SchemaObject) -> Result<(), StoreError>;

    /// Drops a sequence or table.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownSequence`] / [`StoreError::UnknownTable`] if it
    /// does not exist.
    fn drop_object(&self, object: &SchemaObject) -> Result<(), StoreError>;
}

/// The per-call context a generator runs in.
///
/// Holds the database handle and the tenant the calling session belongs to.
/// Optimizers keep independent blocks per tenant.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    database: &'a dyn Database,
    tenant: Option<&'a str>,
}

impl<'a> Session<'a> {
    pub fn new(database: &'a dyn Database) -> Self {
        Self {
            database,
            tenant: None,
        }
    }

    pub fn with_tenant(database: &'a dyn Database, tenant: &'a str) -> Self {
        Self {
            database,
            tenant: Some(tenant),
        }
    }

    pub fn database(&self) -> &'a dyn Database {
        self.database
    }

    pub fn tenant_identifier(&self) -> Option<&'a str> {
        self.tenant
    }
}

impl core::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("tenant", &self.tenant)
            .finish_non_exhaustive()
    }
}
