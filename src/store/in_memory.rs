//! InMemoryRecordStore - HashMap-backed relational store for tests and development.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::batch::Operation;
use super::{Batch, CommitReceipt, EventLog, Record, RecordId, RecordStore, StoreError, Versioned};
use crate::event::EventRecord;

/// Internal stored representation of a row.
#[derive(Clone)]
struct StoredRow {
    bytes: Vec<u8>,
    version: u64,
    unique: Vec<String>,
}

#[derive(Default)]
struct State {
    tables: HashMap<&'static str, BTreeMap<RecordId, StoredRow>>,
    sequences: HashMap<&'static str, RecordId>,
    /// `"table.column=value"` -> owning row id.
    unique: HashMap<String, RecordId>,
    events: Vec<EventRecord>,
    checkpoints: HashMap<String, u64>,
}

/// Reverse actions recorded while a batch is applied, replayed on failure.
enum Undo {
    RemoveRow(&'static str, RecordId),
    RestoreRow(&'static str, RecordId, StoredRow),
    RemoveUnique(String),
    RestoreUnique(String, RecordId),
    TruncateEvents(usize),
    RestoreCheckpoint(String, Option<u64>),
}

/// In-memory relational store.
///
/// Clone-friendly via Arc: clones share the same tables and event log.
/// `set_available(false)` makes every call fail with
/// [`StoreError::Unavailable`], which is how tests simulate an outage.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    state: Arc<RwLock<State>>,
    offline: Arc<AtomicBool>,
}

fn unique_key(table: &str, column: &str, value: &str) -> String {
    format!("{}.{}={}", table, column, value)
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.ensure_online()?;
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.ensure_online()?;
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("record store offline".into()));
        }
        Ok(())
    }
}

impl State {
    fn apply(&mut self, op: Operation, undo: &mut Vec<Undo>) -> Result<Option<u64>, StoreError> {
        match op {
            Operation::Insert {
                table,
                id,
                bytes,
                unique,
                references,
            } => {
                for (referenced, referenced_id) in references {
                    let exists = self
                        .tables
                        .get(referenced)
                        .is_some_and(|rows| rows.contains_key(&referenced_id));
                    if !exists {
                        return Err(StoreError::ForeignKey {
                            table: referenced.to_string(),
                            id: referenced_id,
                        });
                    }
                }

                if let Some(existing) = self.tables.get(table).and_then(|rows| rows.get(&id)) {
                    return Err(StoreError::Conflict {
                        table: table.to_string(),
                        id,
                        expected: 0,
                        actual: existing.version,
                    });
                }

                let keys = self.claim_unique(table, id, &unique, undo)?;

                let sequence = self.sequences.entry(table).or_insert(0);
                if id > *sequence {
                    *sequence = id;
                }

                self.tables.entry(table).or_default().insert(
                    id,
                    StoredRow {
                        bytes,
                        version: 1,
                        unique: keys,
                    },
                );
                undo.push(Undo::RemoveRow(table, id));
                Ok(None)
            }
            Operation::Update {
                table,
                id,
                bytes,
                unique,
                expected_version,
            } => {
                let current = self
                    .tables
                    .get(table)
                    .and_then(|rows| rows.get(&id))
                    .cloned()
                    .ok_or_else(|| StoreError::Missing {
                        table: table.to_string(),
                        id,
                    })?;

                if expected_version != current.version {
                    return Err(StoreError::Conflict {
                        table: table.to_string(),
                        id,
                        expected: expected_version,
                        actual: current.version,
                    });
                }

                self.release_unique(&current.unique, id, undo);
                let keys = self.claim_unique(table, id, &unique, undo)?;

                let rows = self.tables.entry(table).or_default();
                rows.insert(
                    id,
                    StoredRow {
                        bytes,
                        version: current.version + 1,
                        unique: keys,
                    },
                );
                undo.push(Undo::RestoreRow(table, id, current));
                Ok(None)
            }
            Operation::Delete { table, id } => {
                let removed = self
                    .tables
                    .get_mut(table)
                    .and_then(|rows| rows.remove(&id))
                    .ok_or_else(|| StoreError::Missing {
                        table: table.to_string(),
                        id,
                    })?;
                self.release_unique(&removed.unique, id, undo);
                undo.push(Undo::RestoreRow(table, id, removed));
                Ok(None)
            }
            Operation::Append(pending) => {
                let sequence = self.events.len() as u64 + 1;
                undo.push(Undo::TruncateEvents(self.events.len()));
                self.events.push(EventRecord::sequenced(sequence, pending));
                Ok(Some(sequence))
            }
            Operation::Checkpoint {
                projection,
                sequence,
            } => {
                let previous = self.checkpoints.insert(projection.clone(), sequence);
                undo.push(Undo::RestoreCheckpoint(projection, previous));
                Ok(None)
            }
        }
    }

    fn claim_unique(
        &mut self,
        table: &'static str,
        id: RecordId,
        unique: &[(&'static str, String)],
        undo: &mut Vec<Undo>,
    ) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::with_capacity(unique.len());
        for (column, value) in unique {
            let key = unique_key(table, column, value);
            match self.unique.get(&key) {
                Some(owner) if *owner != id => {
                    return Err(StoreError::UniqueViolation {
                        table: table.to_string(),
                        column: column.to_string(),
                        value: value.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    self.unique.insert(key.clone(), id);
                    undo.push(Undo::RemoveUnique(key.clone()));
                }
            }
            keys.push(key);
        }
        Ok(keys)
    }

    fn release_unique(&mut self, keys: &[String], id: RecordId, undo: &mut Vec<Undo>) {
        for key in keys {
            if self.unique.get(key) == Some(&id) {
                self.unique.remove(key);
                undo.push(Undo::RestoreUnique(key.clone(), id));
            }
        }
    }

    fn rollback(&mut self, undo: Vec<Undo>) {
        for action in undo.into_iter().rev() {
            match action {
                Undo::RemoveRow(table, id) => {
                    if let Some(rows) = self.tables.get_mut(table) {
                        rows.remove(&id);
                    }
                }
                Undo::RestoreRow(table, id, row) => {
                    self.tables.entry(table).or_default().insert(id, row);
                }
                Undo::RemoveUnique(key) => {
                    self.unique.remove(&key);
                }
                Undo::RestoreUnique(key, id) => {
                    self.unique.insert(key, id);
                }
                Undo::TruncateEvents(len) => self.events.truncate(len),
                Undo::RestoreCheckpoint(projection, previous) => match previous {
                    Some(sequence) => {
                        self.checkpoints.insert(projection, sequence);
                    }
                    None => {
                        self.checkpoints.remove(&projection);
                    }
                },
            }
        }
    }
}

impl RecordStore for InMemoryRecordStore {
    fn allocate_id(&self, table: &'static str) -> Result<RecordId, StoreError> {
        let mut state = self.write()?;
        let sequence = state.sequences.entry(table).or_insert(0);
        *sequence += 1;
        Ok(*sequence)
    }

    fn get<R: Record>(&self, id: RecordId) -> Result<Option<Versioned<R>>, StoreError> {
        let state = self.read()?;
        match state.tables.get(R::TABLE).and_then(|rows| rows.get(&id)) {
            Some(stored) => {
                let data: R = serde_json::from_slice(&stored.bytes)?;
                Ok(Some(Versioned {
                    data,
                    version: stored.version,
                }))
            }
            None => Ok(None),
        }
    }

    fn scan<R: Record>(
        &self,
        predicate: &dyn Fn(&R) -> bool,
    ) -> Result<Vec<Versioned<R>>, StoreError> {
        let state = self.read()?;
        let Some(rows) = state.tables.get(R::TABLE) else {
            return Ok(Vec::new());
        };

        let mut results = Vec::new();
        for stored in rows.values() {
            let data: R = serde_json::from_slice(&stored.bytes)?;
            if predicate(&data) {
                results.push(Versioned {
                    data,
                    version: stored.version,
                });
            }
        }
        Ok(results)
    }

    fn commit(&self, batch: Batch) -> Result<CommitReceipt, StoreError> {
        let operations = batch.into_operations();
        let staged = operations.len();
        let mut state = self.write()?;
        let mut undo = Vec::new();
        let mut receipt = CommitReceipt::default();

        for op in operations {
            match state.apply(op, &mut undo) {
                Ok(Some(sequence)) => receipt.sequences.push(sequence),
                Ok(None) => {}
                Err(err) => {
                    state.rollback(undo);
                    debug!(error = %err, "batch rolled back");
                    return Err(err);
                }
            }
        }

        debug!(operations = staged, events = receipt.sequences.len(), "batch committed");
        Ok(receipt)
    }
}

impl EventLog for InMemoryRecordStore {
    fn read_after(&self, after: u64, limit: usize) -> Result<Vec<EventRecord>, StoreError> {
        let state = self.read()?;
        let start = (after as usize).min(state.events.len());
        Ok(state.events[start..].iter().take(limit).cloned().collect())
    }

    fn head(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.events.len() as u64)
    }

    fn checkpoint(&self, projection: &str) -> Result<u64, StoreError> {
        Ok(self
            .read()?
            .checkpoints
            .get(projection)
            .copied()
            .unwrap_or(0))
    }
}
