use super::{Batch, CommitReceipt, Record, RecordId, StoreError, Versioned};
use crate::event::EventRecord;

/// Row storage with atomic batch commits.
pub trait RecordStore: Send + Sync {
    /// Reserve the next primary key for `table`.
    fn allocate_id(&self, table: &'static str) -> Result<RecordId, StoreError>;

    /// Get a row by id. Returns `None` if not found.
    fn get<R: Record>(&self, id: RecordId) -> Result<Option<Versioned<R>>, StoreError>;

    /// All rows of `R`'s table matching `predicate`, ordered by id.
    fn scan<R: Record>(
        &self,
        predicate: &dyn Fn(&R) -> bool,
    ) -> Result<Vec<Versioned<R>>, StoreError>;

    /// Apply every operation of `batch`, or none of them.
    fn commit(&self, batch: Batch) -> Result<CommitReceipt, StoreError>;
}

/// Read side of the event log and projection checkpoints.
///
/// Events and checkpoints are written through [`Batch::event`] and
/// [`Batch::checkpoint`].
pub trait EventLog: Send + Sync {
    /// Up to `limit` events with a sequence greater than `after`, in order.
    fn read_after(&self, after: u64, limit: usize) -> Result<Vec<EventRecord>, StoreError>;

    /// Sequence of the newest event, 0 when the log is empty.
    fn head(&self) -> Result<u64, StoreError>;

    /// Last sequence applied by `projection`, 0 when it has never run.
    fn checkpoint(&self, projection: &str) -> Result<u64, StoreError>;
}
