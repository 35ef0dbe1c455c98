use std::collections::HashMap;

use crate::{
    database::{Capabilities, CounterRow, Database, SchemaObject, StoreError},
    mutex::{Mutex, MutexGuard, lock},
};

/// Row key used by single-row tables.
const SINGLE_ROW: &str = "";

struct MemorySequence {
    /// `None` once the value past `i64::MAX` would be needed.
    next: Option<i64>,
    increment: i64,
}

struct MemoryTable {
    segment_column: Option<String>,
    value_column: String,
    rows: HashMap<String, i64>,
}

impl MemoryTable {
    fn key<'r>(&self, name: &str, row: &CounterRow<'r>) -> Result<&'r str, StoreError> {
        let unreadable = |column: &str| StoreError::Unreadable {
            table: name.to_owned(),
            column: column.to_owned(),
        };
        if row.value_column != self.value_column {
            return Err(unreadable(row.value_column));
        }
        match (&self.segment_column, row.segment) {
            (None, None) => Ok(SINGLE_ROW),
            (Some(column), Some(segment)) if *column == segment.column => Ok(segment.value),
            (_, Some(segment)) => Err(unreadable(segment.column)),
            (Some(column), None) => Err(unreadable(column)),
        }
    }
}

#[derive(Default)]
struct State {
    sequences: HashMap<String, MemorySequence>,
    tables: HashMap<String, MemoryTable>,
}

impl State {
    fn table(&mut self, name: &str) -> Result<&mut MemoryTable, StoreError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_owned()))
    }
}

/// A [`Database`] kept entirely in memory.
///
/// Every statement runs under one mutex, so each call is atomic the way a
/// single auto-committed statement would be. Used by the test-suite, the
/// benchmarks and the CLI; it is also a convenient stand-in for embedded
/// deployments that persist identifiers elsewhere.
pub struct MemoryDatabase {
    capabilities: Capabilities,
    state: Mutex<State>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    /// An empty database supporting sequences.
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::default())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        lock(&self.state).map_err(|e| StoreError::Io(format!("memory database: {e}")))
    }

    /// Creates every object in `objects`, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first object that cannot be created.
    pub fn create_all<'o>(
        &self,
        objects: impl IntoIterator<Item = &'o SchemaObject>,
    ) -> Result<(), StoreError> {
        objects
            .into_iter()
            .try_for_each(|object| self.create_object(object))
    }

    /// The value the next `next_sequence_value` call would return.
    pub fn peek_sequence(&self, name: &str) -> Option<i64> {
        self.state().ok()?.sequences.get(name).and_then(|s| s.next)
    }

    /// The stored counter of a table row; `segment` is `None` for single-row
    /// tables.
    pub fn counter_value(&self, table: &str, segment: Option<&str>) -> Option<i64> {
        let state = self.state().ok()?;
        state
            .tables
            .get(table)?
            .rows
            .get(segment.unwrap_or(SINGLE_ROW))
            .copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state()
            .map(|s| s.sequences.contains_key(name) || s.tables.contains_key(name))
            .unwrap_or(false)
    }
}

impl Database for MemoryDatabase {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn next_sequence_value(&self, sequence: &str) -> Result<i64, StoreError> {
        if !self.capabilities.supports_sequences {
            return Err(StoreError::UnknownSequence(sequence.to_owned()));
        }
        let mut state = self.state()?;
        let seq = state
            .sequences
            .get_mut(sequence)
            .ok_or_else(|| StoreError::UnknownSequence(sequence.to_owned()))?;
        let value = seq
            .next
            .ok_or_else(|| StoreError::Io(format!("sequence `{sequence}` exhausted")))?;
        seq.next = value.checked_add(seq.increment);
        Ok(value)
    }

    fn select_value(&self, row: &CounterRow<'_>) -> Result<Option<i64>, StoreError> {
        let mut state = self.state()?;
        let table = state.table(row.table)?;
        let key = table.key(row.table, row)?;
        Ok(table.rows.get(key).copied())
    }

    fn insert_value(&self, row: &CounterRow<'_>, value: i64) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let table = state.table(row.table)?;
        let key = table.key(row.table, row)?;
        if table.rows.contains_key(key) {
            return Err(StoreError::AlreadyExists(format!("{}[{key}]", row.table)));
        }
        table.rows.insert(key.to_owned(), value);
        Ok(())
    }

    fn update_value(&self, row: &CounterRow<'_>, new: i64, expected: i64) -> Result<u64, StoreError> {
        let mut state = self.state()?;
        let table = state.table(row.table)?;
        let key = table.key(row.table, row)?;
        match table.rows.get_mut(key) {
            Some(current) if *current == expected => {
                *current = new;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn create_object(&self, object: &SchemaObject) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let name = object.name();
        if state.sequences.contains_key(name) || state.tables.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_owned()));
        }
        match object {
            SchemaObject::Sequence {
                initial_value,
                increment,
                ..
            } => {
                if !self.capabilities.supports_sequences {
                    return Err(StoreError::Io("sequences are not supported".to_owned()));
                }
                state.sequences.insert(
                    name.to_owned(),
                    MemorySequence {
                        next: Some(*initial_value),
                        increment: *increment,
                    },
                );
            }
            SchemaObject::Table {
                segment_column,
                value_column,
                seed_value,
                ..
            } => {
                let mut rows = HashMap::new();
                if let Some(seed) = seed_value {
                    rows.insert(SINGLE_ROW.to_owned(), *seed);
                }
                state.tables.insert(
                    name.to_owned(),
                    MemoryTable {
                        segment_column: segment_column.as_ref().map(|(column, _)| column.clone()),
                        value_column: value_column.clone(),
                        rows,
                    },
                );
            }
        }
        Ok(())
    }

    fn drop_object(&self, object: &SchemaObject) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let name = object.name();
        match object {
            SchemaObject::Sequence { .. } => state
                .sequences
                .remove(name)
                .map(drop)
                .ok_or_else(|| StoreError::UnknownSequence(name.to_owned())),
            SchemaObject::Table { .. } => state
                .tables
                .remove(name)
                .map(drop)
                .ok_or_else(|| StoreError::UnknownTable(name.to_owned())),
        }
    }
}
