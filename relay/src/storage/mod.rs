//! Storage Layer Module
//!
//! Provides persistence for headers, links, chain tip singletons and
//! requests.
//!
//! This module contains:
//! - The key-value store trait and write batches
//! - A staging overlay that makes every operation all-or-nothing
//! - SQLite implementation for persistent deployments
//! - In-memory implementation for testing

pub mod memory;
pub mod sqlite;
pub mod staged;
pub mod traits;

// Re-exports for convenience
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use staged::StagedStore;
pub use traits::{KvStore, Namespace, StorageError, StorageResult, WriteBatch, WriteOp};
