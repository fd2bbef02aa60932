//! [`RecordStore`]: thread-safe in-memory map of sealed records.

use std::{collections::HashMap, sync::Arc};

use common::SealedRecord;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors produced by the record store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No record is stored under this id.
    #[error("record {0} not found")]
    NotFound(Uuid),

    /// A record with this id already exists.
    #[error("record {0} already exists")]
    Duplicate(Uuid),
}

/// Thread-safe store of sealed records keyed by id.
///
/// Wraps an `Arc<RwLock<HashMap<_, _>>>` so that request handlers can read
/// concurrently while inserts take a short write lock. Records are never
/// modified in place.
#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    inner: Arc<RwLock<HashMap<Uuid, SealedRecord>>>,
}

impl RecordStore {
    /// Create a new, empty [`RecordStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Store a freshly sealed record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the id is already taken; the
    /// existing record is left untouched.
    pub async fn insert(&self, record: SealedRecord) -> Result<(), StoreError> {
        let mut lock = self.inner.write().await;
        if lock.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        lock.insert(record.id, record);
        Ok(())
    }

    /// Return a copy of the record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is no such record.
    pub async fn get(&self, id: Uuid) -> Result<SealedRecord, StoreError> {
        let lock = self.inner.read().await;
        lock.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    /// Delete and return the record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is no such record.
    pub async fn remove(&self, id: Uuid) -> Result<SealedRecord, StoreError> {
        let mut lock = self.inner.write().await;
        lock.remove(&id).ok_or(StoreError::NotFound(id))
    }
}
