//! Storage Trait Definitions
//!
//! The relay keeps all state in a namespaced key-value store. Backends only
//! need point reads and atomic batch writes; no range scans are required.

use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Logical stores sharing one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// digest -> header record
    Headers,
    /// digest -> parent digest
    Links,
    /// chain tip singletons
    Chain,
    /// request id -> request record
    Requests,
    /// next request id
    RequestCounter,
}

impl Namespace {
    pub const ALL: [Namespace; 5] = [
        Namespace::Headers,
        Namespace::Links,
        Namespace::Chain,
        Namespace::Requests,
        Namespace::RequestCounter,
    ];

    /// Key prefix used by backends that keep one flat keyspace
    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::Headers => "relay-headers-",
            Namespace::Links => "relay-links-",
            Namespace::Chain => "relay-chain-",
            Namespace::Requests => "relay-requests-",
            Namespace::RequestCounter => "relay-counter-",
        }
    }
}

/// Single write inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOp {
    pub namespace: Namespace,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Ordered set of writes applied all-or-nothing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, namespace: Namespace, key: impl AsRef<[u8]>, value: Vec<u8>) {
        self.ops.push(WriteOp {
            namespace,
            key: key.as_ref().to_vec(),
            value,
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WriteOp> {
        self.ops.iter()
    }
}

impl IntoIterator for WriteBatch {
    type Item = WriteOp;
    type IntoIter = std::vec::IntoIter<WriteOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// Key-value store interface
///
/// Implementations:
/// - `SqliteStore` - Persistent storage with SQLite
/// - `MemoryStore` - In-memory storage for testing
/// - `StagedStore` - Uncommitted overlay used inside one operation
pub trait KvStore {
    /// Read a value
    fn get(&self, namespace: Namespace, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Apply every write in the batch, or none of them
    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()>;

    /// Check whether a key is present
    fn has(&self, namespace: Namespace, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(namespace, key)?.is_some())
    }

    /// Write a single value
    fn set(&self, namespace: Namespace, key: &[u8], value: Vec<u8>) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(namespace, key, value);
        self.write_batch(batch)
    }
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn get(&self, namespace: Namespace, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(namespace, key)
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        (**self).write_batch(batch)
    }
}
