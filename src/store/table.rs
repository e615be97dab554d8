//! Table - typed accessor for single-row CRUD.

use std::marker::PhantomData;

use super::{Batch, Record, RecordId, RecordStore, StoreError, Versioned};

/// Typed wrapper for accessing rows of a specific record type.
pub struct Table<'a, S, R> {
    store: &'a S,
    _marker: PhantomData<R>,
}

impl<'a, S: RecordStore, R: Record> Table<'a, S, R> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub fn get(&self, id: RecordId) -> Result<Option<Versioned<R>>, StoreError> {
        self.store.get(id)
    }

    /// Insert a new row, assigning an id when the record has none.
    pub fn insert(&self, mut record: R) -> Result<Versioned<R>, StoreError> {
        if record.id() == 0 {
            record.set_id(self.store.allocate_id(R::TABLE)?);
        }
        self.store.commit(Batch::new().insert(&record)?)?;
        Ok(Versioned {
            data: record,
            version: 1,
        })
    }

    /// Update an existing row with optimistic concurrency.
    pub fn update(&self, record: R, expected_version: u64) -> Result<Versioned<R>, StoreError> {
        self.store
            .commit(Batch::new().update(&record, expected_version)?)?;
        Ok(Versioned {
            data: record,
            version: expected_version + 1,
        })
    }

    /// Delete a row. Returns false when it did not exist.
    pub fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        if self.store.get::<R>(id)?.is_none() {
            return Ok(false);
        }
        match self.store.commit(Batch::new().delete::<R>(id)) {
            Ok(_) => Ok(true),
            Err(StoreError::Missing { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn find(&self, predicate: &dyn Fn(&R) -> bool) -> Result<Vec<Versioned<R>>, StoreError> {
        self.store.scan(predicate)
    }

    pub fn find_one(
        &self,
        predicate: &dyn Fn(&R) -> bool,
    ) -> Result<Option<Versioned<R>>, StoreError> {
        Ok(self.store.scan(predicate)?.into_iter().next())
    }

    /// Every row, ordered by id.
    pub fn all(&self) -> Result<Vec<R>, StoreError> {
        Ok(self
            .store
            .scan::<R>(&|_| true)?
            .into_iter()
            .map(|row| row.data)
            .collect())
    }
}

/// Extension trait for typed table access on any RecordStore.
pub trait TablesExt: RecordStore + Sized {
    fn table<R: Record>(&self) -> Table<'_, Self, R> {
        Table::new(self)
    }
}

impl<S: RecordStore> TablesExt for S {}
