//! Contract of the hosted row-storage collaborator plus local backends.
//!
//! The split ledger treats storage as an opaque CRUD service: rows are JSON
//! objects keyed by an `id` column and owned through a `user_id` column.

pub mod json_backend;
pub mod memory;
pub mod records;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::Result;
use crate::ledger::ParticipantId;

pub use json_backend::JsonStorage;
pub use memory::MemoryStorage;

/// A stored row.
pub type Record = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Participants,
    Groups,
    GroupMembers,
    Expenses,
    ExpenseSplits,
    ActivityLogs,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Participants,
        Table::Groups,
        Table::GroupMembers,
        Table::Expenses,
        Table::ExpenseSplits,
        Table::ActivityLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Participants => "participants",
            Table::Groups => "groups",
            Table::GroupMembers => "group_members",
            Table::Expenses => "expenses",
            Table::ExpenseSplits => "expense_splits",
            Table::ActivityLogs => "activity_logs",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality filter over row columns; an empty filter selects every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFilter {
    conditions: Vec<(String, Value)>,
}

impl RowFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(column, expected)| record.get(column) == Some(expected))
    }
}

/// Authenticated user reported by the collaborator's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: ParticipantId,
    pub email: String,
}

/// Abstraction over the remote structured-storage and auth service.
pub trait StorageBackend: Send + Sync {
    /// Inserts a row, assigning an `id` when the record has none.
    fn insert_row(&self, table: Table, record: Record) -> Result<Record>;
    /// Merges `patch` into the row identified by `id`.
    fn update_row(&self, table: Table, id: &str, patch: Record) -> Result<Record>;
    fn select_rows(&self, table: Table, filter: &RowFilter) -> Result<Vec<Record>>;
    fn current_user(&self) -> Result<Option<SessionUser>>;
}

impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn insert_row(&self, table: Table, record: Record) -> Result<Record> {
        (**self).insert_row(table, record)
    }

    fn update_row(&self, table: Table, id: &str, patch: Record) -> Result<Record> {
        (**self).update_row(table, id, patch)
    }

    fn select_rows(&self, table: Table, filter: &RowFilter) -> Result<Vec<Record>> {
        (**self).select_rows(table, filter)
    }

    fn current_user(&self) -> Result<Option<SessionUser>> {
        (**self).current_user()
    }
}

/// Ensures the record carries a string `id`, generating one if needed.
pub(crate) fn ensure_row_id(record: &mut Record) -> String {
    match record.get("id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => {
            let id = Uuid::new_v4().to_string();
            record.insert("id".into(), Value::String(id.clone()));
            id
        }
    }
}

pub(crate) fn row_id(record: &Record) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

pub(crate) fn merge_patch(target: &mut Record, patch: Record) {
    for (column, value) in patch {
        if column != "id" {
            target.insert(column, value);
        }
    }
}
