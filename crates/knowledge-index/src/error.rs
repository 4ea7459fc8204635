//! Error types for the knowledge index.

use knowledge_embeddings::EmbeddingError;
use knowledge_storage::StorageError;
use knowledge_vector::VectorError;
use thiserror::Error;

/// Errors surfaced by [`KnowledgeIndex`](crate::KnowledgeIndex) operations.
///
/// Store failures are split by direction because they leave the index in
/// different states: a failed write during `add_knowledge` leaves it
/// untouched, a failed read during rebuild leaves it drifted.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The embedding model could not be loaded or reports no dimension
    #[error("Embedding adapter unavailable: {0}")]
    AdapterUnavailable(String),

    /// Embedding generation failed for a given input
    #[error("Encoding failed: {0}")]
    Encoding(#[from] EmbeddingError),

    /// Durable write failed
    #[error("Store write failed: {0}")]
    StoreWrite(StorageError),

    /// Durable read failed
    #[error("Store read failed: {0}")]
    StoreRead(StorageError),

    /// Vector index rejected an operation
    #[error("Vector index error: {0}")]
    Vector(#[from] VectorError),

    /// A thread panicked while holding the index lock
    #[error("Index lock poisoned")]
    LockPoisoned,

    /// Invalid settings
    #[error("Configuration error: {0}")]
    Config(String),
}
