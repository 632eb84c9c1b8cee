//! In-memory storage backend.
//!
//! Mirrors the hosted collaborator's CRUD contract without I/O. Writes can be
//! made to fail on purpose so callers can exercise their persistence-failure
//! paths.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::errors::{Result, SplitError};

use super::{ensure_row_id, merge_patch, row_id, Record, RowFilter, SessionUser, StorageBackend, Table};

#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<Table, Vec<Record>>,
    session: Option<SessionUser>,
    failing_writes: usize,
    read_only: Option<Table>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose session reports `user` as the signed-in account.
    pub fn with_session(user: SessionUser) -> Self {
        let storage = Self::default();
        if let Ok(mut inner) = storage.inner.lock() {
            inner.session = Some(user);
        }
        storage
    }

    /// Makes the next `count` writes fail with a persistence error.
    pub fn fail_next_writes(&self, count: usize) -> Result<()> {
        self.lock()?.failing_writes = count;
        Ok(())
    }

    /// Rejects every write to `table` until cleared with `None`.
    pub fn set_read_only(&self, table: Option<Table>) -> Result<()> {
        self.lock()?.read_only = table;
        Ok(())
    }

    pub fn row_count(&self, table: Table) -> Result<usize> {
        Ok(self.lock()?.tables.get(&table).map_or(0, Vec::len))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|err| SplitError::Storage(format!("memory storage lock poisoned: {err}")))
    }
}

impl Inner {
    fn check_write(&mut self, table: Table) -> Result<()> {
        if self.read_only == Some(table) {
            return Err(SplitError::Storage(format!("`{}` is read-only", table)));
        }
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(SplitError::Storage(format!(
                "simulated write failure on `{}`",
                table
            )));
        }
        Ok(())
    }
}

impl StorageBackend for MemoryStorage {
    fn insert_row(&self, table: Table, mut record: Record) -> Result<Record> {
        let mut inner = self.lock()?;
        inner.check_write(table)?;
        let id = ensure_row_id(&mut record);
        let rows = inner.tables.entry(table).or_default();
        if rows.iter().any(|row| row_id(row) == Some(id.as_str())) {
            return Err(SplitError::Storage(format!(
                "duplicate id `{}` in `{}`",
                id, table
            )));
        }
        rows.push(record.clone());
        Ok(record)
    }

    fn update_row(&self, table: Table, id: &str, patch: Record) -> Result<Record> {
        let mut inner = self.lock()?;
        inner.check_write(table)?;
        let row = inner
            .tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|row| row_id(row) == Some(id)))
            .ok_or_else(|| SplitError::NotFound(format!("row `{}` in `{}`", id, table)))?;
        merge_patch(row, patch);
        Ok(row.clone())
    }

    fn select_rows(&self, table: Table, filter: &RowFilter) -> Result<Vec<Record>> {
        let inner = self.lock()?;
        Ok(inner
            .tables
            .get(&table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default())
    }

    fn current_user(&self) -> Result<Option<SessionUser>> {
        Ok(self.lock()?.session.clone())
    }
}
