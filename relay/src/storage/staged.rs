//! Uncommitted write overlay.
//!
//! Core operations stage every write here and commit them in a single
//! batch once validation has finished. Dropping a `StagedStore` without
//! committing leaves the underlying store untouched.

use std::cell::RefCell;
use std::collections::HashMap;

use super::traits::{KvStore, Namespace, StorageResult, WriteBatch};

/// Read-through overlay over another store
pub struct StagedStore<'a, S: KvStore + ?Sized> {
    inner: &'a S,
    pending: RefCell<HashMap<(Namespace, Vec<u8>), Vec<u8>>>,
    batch: RefCell<WriteBatch>,
}

impl<'a, S: KvStore + ?Sized> StagedStore<'a, S> {
    pub fn new(inner: &'a S) -> Self {
        Self {
            inner,
            pending: RefCell::new(HashMap::new()),
            batch: RefCell::new(WriteBatch::new()),
        }
    }

    /// Number of staged writes
    pub fn pending_writes(&self) -> usize {
        self.batch.borrow().len()
    }

    /// Consume the overlay, returning the staged writes
    pub fn into_batch(self) -> WriteBatch {
        self.batch.into_inner()
    }

    /// Apply the staged writes to the underlying store atomically
    pub fn commit(self) -> StorageResult<()> {
        let inner = self.inner;
        let batch = self.into_batch();
        if batch.is_empty() {
            return Ok(());
        }
        inner.write_batch(batch)
    }
}

impl<S: KvStore + ?Sized> KvStore for StagedStore<'_, S> {
    fn get(&self, namespace: Namespace, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        if let Some(value) = self.pending.borrow().get(&(namespace, key.to_vec())) {
            return Ok(Some(value.clone()));
        }
        self.inner.get(namespace, key)
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut pending = self.pending.borrow_mut();
        let mut staged = self.batch.borrow_mut();
        for op in batch {
            pending.insert((op.namespace, op.key.clone()), op.value.clone());
            staged.put(op.namespace, op.key, op.value);
        }
        Ok(())
    }
}
