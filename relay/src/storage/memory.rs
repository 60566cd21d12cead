//! In-Memory Storage Implementation
//!
//! Provides in-memory storage for testing and development.
//! Data is lost when the process exits.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::traits::{KvStore, Namespace, StorageError, StorageResult, WriteBatch};

/// In-memory key-value store
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<(Namespace, Vec<u8>), Vec<u8>>>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys stored in a namespace
    pub fn count(&self, namespace: Namespace) -> StorageResult<usize> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(entries.keys().filter(|(ns, _)| *ns == namespace).count())
    }
}

impl KvStore for MemoryStore {
    fn get(&self, namespace: Namespace, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(entries.get(&(namespace, key.to_vec())).cloned())
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        for op in batch {
            entries.insert((op.namespace, op.key), op.value);
        }
        Ok(())
    }
}
