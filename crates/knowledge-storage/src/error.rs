//! Storage layer error types.

use knowledge_types::KnowledgeError;
use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB operation failed
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Column family not found
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// Key encoding/decoding error
    #[error("Key error: {0}")]
    Key(String),

    /// Record encoding/decoding error
    #[error("Record encoding error: {0}")]
    Record(#[from] KnowledgeError),

    /// Record not found
    #[error("Knowledge record not found: {0}")]
    NotFound(u64),

    /// Id sequence lock poisoned by a panicking writer
    #[error("Id sequence lock poisoned")]
    LockPoisoned,
}
