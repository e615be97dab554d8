//! Relational store: durable rows for reviews, restaurants, users and admins,
//! plus the review event log and projection checkpoints.
//!
//! Rows are typed through the [`Record`] trait and reached through a
//! [`Table`] accessor:
//!
//! ```ignore
//! use restaurant_reviews::store::{InMemoryRecordStore, TablesExt};
//!
//! let store = InMemoryRecordStore::new();
//! let saved = store.table::<Restaurant>().insert(restaurant)?;
//! let loaded = store.table::<Restaurant>().get(saved.data.restaurant_id)?;
//! ```
//!
//! Multi-row writes go through a [`Batch`], which the store applies atomically:
//! either every operation lands or none does.

mod batch;
mod in_memory;
mod record_store;
mod table;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub use batch::{Batch, CommitReceipt};
pub use in_memory::InMemoryRecordStore;
pub use record_store::{EventLog, RecordStore};
pub use table::{Table, TablesExt};

/// Integer primary key shared by every table.
pub type RecordId = i64;

/// A row type stored in the relational store.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Table name, e.g. `"reviews"`.
    const TABLE: &'static str;

    fn id(&self) -> RecordId;

    /// Assign the primary key. Called on insert when `id()` is 0.
    fn set_id(&mut self, id: RecordId);

    /// `(column, value)` pairs that must be unique within the table.
    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// `(table, id)` rows that must exist when this row is inserted.
    fn references(&self) -> Vec<(&'static str, RecordId)> {
        Vec::new()
    }
}

/// A row together with its optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub data: T,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("referenced {table} row {id} does not exist")]
    ForeignKey { table: String, id: RecordId },
    #[error("duplicate value {value:?} for {table}.{column}")]
    UniqueViolation {
        table: String,
        column: String,
        value: String,
    },
    #[error("version conflict on {table}:{id} (expected {expected}, actual {actual})")]
    Conflict {
        table: String,
        id: RecordId,
        expected: u64,
        actual: u64,
    },
    #[error("{table} row {id} does not exist")]
    Missing { table: String, id: RecordId },
    #[error("record serialization error: {0}")]
    Serde(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serde(err.to_string())
    }
}
