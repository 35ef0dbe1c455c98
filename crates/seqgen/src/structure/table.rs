use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    ConfigError, Error, Result, SchemaObject, Session,
    database::{CounterRow, Segment, StoreError},
};

/// The key of the row a segmented table structure owns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentKey {
    pub column: String,
    pub value: String,
    /// Declared `varchar` length, for schema export.
    pub length: u32,
}

/// A counter kept in a table row, advanced with optimistic concurrency.
///
/// Two layouts are supported:
/// - single-row: the table holds exactly one row, seeded at creation time;
/// - segmented: one row per generator, keyed by a segment column. A missing
///   row is inserted with the initial value on first access.
///
/// Every access reads the counter, then issues an update guarded by the value
/// just read. If another writer got there first the update changes no rows
/// and the whole read-update cycle is repeated, at most `retry_limit` times.
#[derive(Debug)]
pub struct TableStructure {
    table: String,
    value_column: String,
    segment: Option<SegmentKey>,
    initial_value: i64,
    increment_size: i64,
    step: i64,
    retry_limit: u32,
    select_sql: String,
    update_sql: String,
    insert_sql: Option<String>,
    accessed: AtomicU64,
}

impl TableStructure {
    /// Creates a structure over `table`.
    ///
    /// `applies_increment_size` decides whether each access moves the stored
    /// counter by `increment_size` or by one.
    pub fn new(
        table: impl Into<String>,
        value_column: impl Into<String>,
        segment: Option<SegmentKey>,
        initial_value: i64,
        increment_size: i64,
        applies_increment_size: bool,
    ) -> Self {
        let table = table.into();
        let value_column = value_column.into();

        let (select_sql, update_sql, insert_sql) = match &segment {
            Some(SegmentKey { column, .. }) => (
                format!("select tbl.{value_column} from {table} tbl where tbl.{column}=? for update"),
                format!("update {table} set {value_column}=? where {value_column}=? and {column}=?"),
                Some(format!("insert into {table} ({column}, {value_column}) values (?,?)")),
            ),
            None => (
                format!("select {value_column} from {table} for update"),
                format!("update {table} set {value_column}=? where {value_column}=?"),
                None,
            ),
        };

        Self {
            table,
            value_column,
            segment,
            initial_value,
            increment_size,
            step: if applies_increment_size {
                increment_size
            } else {
                1
            },
            retry_limit: crate::config::DEFAULT_RETRY_LIMIT,
            select_sql,
            update_sql,
            insert_sql,
            accessed: AtomicU64::new(0),
        }
    }

    /// Overrides the bound on optimistic update attempts per access.
    #[must_use]
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit.max(1);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    pub fn segment(&self) -> Option<&SegmentKey> {
        self.segment.as_ref()
    }

    pub fn initial_value(&self) -> i64 {
        self.initial_value
    }

    pub fn increment_size(&self) -> i64 {
        self.increment_size
    }

    /// How far each access moves the stored counter.
    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    pub fn update_sql(&self) -> &str {
        &self.update_sql
    }

    pub fn insert_sql(&self) -> Option<&str> {
        self.insert_sql.as_deref()
    }

    /// Number of successful read-update cycles so far.
    pub fn times_accessed(&self) -> u64 {
        self.accessed.load(Ordering::Relaxed)
    }

    fn row(&self) -> CounterRow<'_> {
        CounterRow {
            table: &self.table,
            value_column: &self.value_column,
            segment: self.segment.as_ref().map(|s| Segment {
                column: &s.column,
                value: &s.value,
            }),
        }
    }

    /// Reads the current counter and moves it forward by [`Self::step`],
    /// returning the value read.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::StructureUnreachable`] if the table is missing, or a
    ///   single-row table was never seeded.
    /// - [`Error::ConflictRetriesExhausted`] if every attempt lost its race.
    /// - [`Error::Store`] for transient database failures.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, session), fields(table = %self.table)))]
    pub fn next_value(&self, session: &Session<'_>) -> Result<i64> {
        let database = session.database();
        let row = self.row();

        for _attempt in 1..=self.retry_limit {
            #[cfg(feature = "tracing")]
            tracing::debug!(sql = %self.select_sql, attempt = _attempt);

            let current = match database.select_value(&row)? {
                Some(current) => current,
                None => match self.insert_sql.as_deref() {
                    Some(_insert_sql) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(sql = %_insert_sql, value = self.initial_value);

                        match database.insert_value(&row, self.initial_value) {
                            Ok(()) => self.initial_value,
                            // Another writer created the row, read it again.
                            Err(StoreError::AlreadyExists(_)) => continue,
                            Err(e) => return Err(e.into()),
                        }
                    }
                    None => {
                        return Err(ConfigError::StructureUnreachable {
                            name: self.table.clone(),
                            reason: "the table holds no value row and must be seeded".to_owned(),
                        }
                        .into());
                    }
                },
            };

            let next = current
                .checked_add(self.step)
                .ok_or(Error::Overflow("next table value"))?;

            #[cfg(feature = "tracing")]
            tracing::debug!(sql = %self.update_sql, new = next, expected = current);

            if database.update_value(&row, next, current)? > 0 {
                self.accessed.fetch_add(1, Ordering::Relaxed);
                return Ok(current);
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(table = %self.table, "optimistic update lost its race, retrying");
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(table = %self.table, attempts = self.retry_limit, "giving up on contended table");

        Err(Error::ConflictRetriesExhausted {
            table: self.table.clone(),
            attempts: self.retry_limit,
        })
    }

    pub fn schema_object(&self) -> SchemaObject {
        SchemaObject::Table {
            name: self.table.clone(),
            segment_column: self.segment.as_ref().map(|s| (s.column.clone(), s.length)),
            value_column: self.value_column.clone(),
            seed_value: match self.segment {
                Some(_) => None,
                None => Some(self.initial_value),
            },
        }
    }
}
