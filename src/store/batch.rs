//! Batch - stage row writes, events and checkpoints for one atomic commit.
//!
//! ```ignore
//! let receipt = store.commit(
//!     Batch::new()
//!         .insert(&review)?
//!         .event(ReviewEvent::ReviewSubmitted(submitted).to_pending()?),
//! )?;
//! ```

use super::{Record, RecordId, StoreError};
use crate::event::PendingEvent;

/// A staged write. Rows are serialized when staged so the batch is type-erased.
#[derive(Debug, Clone)]
pub(crate) enum Operation {
    Insert {
        table: &'static str,
        id: RecordId,
        bytes: Vec<u8>,
        unique: Vec<(&'static str, String)>,
        references: Vec<(&'static str, RecordId)>,
    },
    Update {
        table: &'static str,
        id: RecordId,
        bytes: Vec<u8>,
        unique: Vec<(&'static str, String)>,
        expected_version: u64,
    },
    Delete {
        table: &'static str,
        id: RecordId,
    },
    Append(PendingEvent),
    Checkpoint {
        projection: String,
        sequence: u64,
    },
}

/// Builder for an atomic multi-row commit.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    operations: Vec<Operation>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an insert. The record must already carry its id (see
    /// [`RecordStore::allocate_id`](super::RecordStore::allocate_id)).
    pub fn insert<R: Record>(mut self, record: &R) -> Result<Self, StoreError> {
        self.operations.push(Operation::Insert {
            table: R::TABLE,
            id: record.id(),
            bytes: serde_json::to_vec(record)?,
            unique: record.unique_keys(),
            references: record.references(),
        });
        Ok(self)
    }

    /// Stage an update guarded by the version the caller read.
    pub fn update<R: Record>(mut self, record: &R, expected_version: u64) -> Result<Self, StoreError> {
        self.operations.push(Operation::Update {
            table: R::TABLE,
            id: record.id(),
            bytes: serde_json::to_vec(record)?,
            unique: record.unique_keys(),
            expected_version,
        });
        Ok(self)
    }

    pub fn delete<R: Record>(mut self, id: RecordId) -> Self {
        self.operations.push(Operation::Delete {
            table: R::TABLE,
            id,
        });
        self
    }

    /// Append an event to the log. The store assigns its sequence.
    pub fn event(mut self, event: PendingEvent) -> Self {
        self.operations.push(Operation::Append(event));
        self
    }

    /// Record that `projection` has applied every event up to `sequence`.
    pub fn checkpoint(mut self, projection: impl Into<String>, sequence: u64) -> Self {
        self.operations.push(Operation::Checkpoint {
            projection: projection.into(),
            sequence,
        });
        self
    }

    pub(crate) fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}

/// What a successful commit produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Sequences assigned to the batch's events, in staging order.
    pub sequences: Vec<u64>,
}

impl CommitReceipt {
    pub fn last_sequence(&self) -> Option<u64> {
        self.sequences.last().copied()
    }
}
