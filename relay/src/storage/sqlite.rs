//! SQLite Persistent Storage
//!
//! Provides durable relay state that survives restarts. All namespaces share
//! one `kv` table; batches are applied inside a single SQL transaction.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;

use super::traits::{KvStore, Namespace, StorageError, StorageResult, WriteBatch};

/// SQLite-backed key-value store with connection pooling
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Create a new store with the given database path
    ///
    /// Creates the database file and runs migrations if needed.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Connection(e.to_string()))?;
            }
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations()?;

        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations()?;

        Ok(store)
    }

    /// Get a connection from the pool
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        self.pool
            .get()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                namespace TEXT NOT NULL,
                key BLOB NOT NULL,
                value BLOB NOT NULL,
                PRIMARY KEY (namespace, key)
            );
            "#,
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }
}

impl KvStore for SqliteStore {
    fn get(&self, namespace: Namespace, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT value FROM kv WHERE namespace = ?1 AND key = ?2",
            params![namespace.prefix(), key],
            |row| row.get::<_, Vec<u8>>(0),
        )
        .optional()
        .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT OR REPLACE INTO kv (namespace, key, value) VALUES (?1, ?2, ?3)",
                )
                .map_err(|e| StorageError::Database(e.to_string()))?;

            for op in batch.iter() {
                stmt.execute(params![op.namespace.prefix(), op.key, op.value])
                    .map_err(|e| StorageError::Database(e.to_string()))?;
            }
        }

        tx.commit()
            .map_err(|e| StorageError::Database(e.to_string()))
    }
}
