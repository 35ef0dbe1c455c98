//! Database structures: where raw values come from.
//!
//! A structure performs one *physical access* per [`DatabaseStructure::next_value`]
//! call and counts it. Optimizers decide how many identifiers each raw value
//! is worth.

mod sequence;
mod table;

pub use sequence::*;
pub use table::*;

use crate::{Result, SchemaObject, Session};

/// The backing counter of a generator.
#[derive(Debug)]
pub enum DatabaseStructure {
    Sequence(SequenceStructure),
    Table(TableStructure),
}

impl DatabaseStructure {
    /// The sequence or table name.
    pub fn name(&self) -> &str {
        match self {
            Self::Sequence(s) => s.name(),
            Self::Table(t) => t.table_name(),
        }
    }

    /// Number of physical accesses performed so far.
    pub fn times_accessed(&self) -> u64 {
        match self {
            Self::Sequence(s) => s.times_accessed(),
            Self::Table(t) => t.times_accessed(),
        }
    }

    pub fn increment_size(&self) -> i64 {
        match self {
            Self::Sequence(s) => s.increment_size(),
            Self::Table(t) => t.increment_size(),
        }
    }

    pub fn initial_value(&self) -> i64 {
        match self {
            Self::Sequence(s) => s.initial_value(),
            Self::Table(t) => t.initial_value(),
        }
    }

    /// `true` when backed by a native sequence.
    pub fn is_physical_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    /// Fetches the next raw value.
    ///
    /// # Errors
    ///
    /// See [`SequenceStructure::next_value`] and [`TableStructure::next_value`].
    pub fn next_value(&self, session: &Session<'_>) -> Result<i64> {
        match self {
            Self::Sequence(s) => s.next_value(session),
            Self::Table(t) => t.next_value(session),
        }
    }

    pub fn schema_object(&self) -> SchemaObject {
        match self {
            Self::Sequence(s) => s.schema_object(),
            Self::Table(t) => t.schema_object(),
        }
    }
}
