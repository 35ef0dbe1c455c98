use portable_atomic::{AtomicU32, Ordering};

use crate::{
    Capabilities, CounterRow, Database, MemoryDatabase, SchemaObject, StoreError,
};

/// How far a simulated competing process moves a row when it wins a race.
pub(crate) const COMPETITOR_BUMP: i64 = 1000;

/// Wraps a [`MemoryDatabase`] and injects faults.
///
/// - `conflicts`: the next N updates lose their race to a competitor which
///   bumps the row by [`COMPETITOR_BUMP`] first.
/// - `io_failures`: the next N sequence / select statements fail with a
///   transient error.
pub(crate) struct FaultyDatabase {
    pub(crate) inner: MemoryDatabase,
    conflicts: AtomicU32,
    io_failures: AtomicU32,
}

impl FaultyDatabase {
    pub(crate) fn new(inner: MemoryDatabase) -> Self {
        Self {
            inner,
            conflicts: AtomicU32::new(0),
            io_failures: AtomicU32::new(0),
        }
    }

    pub(crate) fn conflict_next(&self, n: u32) {
        self.conflicts.store(n, Ordering::SeqCst);
    }

    pub(crate) fn fail_next(&self, n: u32) {
        self.io_failures.store(n, Ordering::SeqCst);
    }

    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn io(&self) -> Result<(), StoreError> {
        if Self::take(&self.io_failures) {
            Err(StoreError::Io("connection reset".to_owned()))
        } else {
            Ok(())
        }
    }
}

impl Database for FaultyDatabase {
    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn next_sequence_value(&self, sequence: &str) -> Result<i64, StoreError> {
        self.io()?;
        self.inner.next_sequence_value(sequence)
    }

    fn select_value(&self, row: &CounterRow<'_>) -> Result<Option<i64>, StoreError> {
        self.io()?;
        self.inner.select_value(row)
    }

    fn insert_value(&self, row: &CounterRow<'_>, value: i64) -> Result<(), StoreError> {
        self.inner.insert_value(row, value)
    }

    fn update_value(&self, row: &CounterRow<'_>, new: i64, expected: i64) -> Result<u64, StoreError> {
        if Self::take(&self.conflicts) {
            let bumped = expected + COMPETITOR_BUMP;
            assert_eq!(self.inner.update_value(row, bumped, expected)?, 1);
            return Ok(0);
        }
        self.inner.update_value(row, new, expected)
    }

    fn create_object(&self, object: &SchemaObject) -> Result<(), StoreError> {
        self.inner.create_object(object)
    }

    fn drop_object(&self, object: &SchemaObject) -> Result<(), StoreError> {
        self.inner.drop_object(object)
    }
}
