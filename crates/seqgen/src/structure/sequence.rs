use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{Result, SchemaObject, Session};

/// A database sequence used as the source of raw values.
///
/// The sequence itself advances by [`Self::physical_increment`]: the block
/// size for optimizers that store block boundaries in the database (pooled
/// strategies), `1` for optimizers that multiply the raw value locally
/// (hi/lo).
#[derive(Debug)]
pub struct SequenceStructure {
    name: String,
    initial_value: i64,
    increment_size: i64,
    physical_increment: i64,
    sql: String,
    accessed: AtomicU64,
}

impl SequenceStructure {
    pub fn new(
        name: impl Into<String>,
        initial_value: i64,
        increment_size: i64,
        applies_increment_size: bool,
    ) -> Self {
        let name = name.into();
        let sql = format!("select next value for {name}");
        Self {
            name,
            initial_value,
            increment_size,
            physical_increment: if applies_increment_size {
                increment_size
            } else {
                1
            },
            sql,
            accessed: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_value(&self) -> i64 {
        self.initial_value
    }

    pub fn increment_size(&self) -> i64 {
        self.increment_size
    }

    /// What the sequence is declared to advance by.
    pub fn physical_increment(&self) -> i64 {
        self.physical_increment
    }

    /// The statement issued on each physical access.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of successful physical fetches so far.
    pub fn times_accessed(&self) -> u64 {
        self.accessed.load(Ordering::Relaxed)
    }

    /// Fetches the next raw value from the sequence.
    ///
    /// # Errors
    ///
    /// A missing sequence is a [`crate::ConfigError::StructureUnreachable`];
    /// anything else the database reports is an [`crate::Error::Store`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, session), fields(sequence = %self.name)))]
    pub fn next_value(&self, session: &Session<'_>) -> Result<i64> {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %self.sql);

        let value = session.database().next_sequence_value(&self.name)?;
        self.accessed.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }

    pub fn schema_object(&self) -> SchemaObject {
        SchemaObject::Sequence {
            name: self.name.clone(),
            initial_value: self.initial_value,
            increment: self.physical_increment,
        }
    }
}
