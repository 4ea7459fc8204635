//! # knowledge-index
//!
//! Semantic index over knowledge records.
//!
//! [`KnowledgeIndex`] ties three pieces together:
//! - an [`EmbeddingModel`](knowledge_embeddings::EmbeddingModel) that turns
//!   `title + " " + content` into a normalized vector
//! - an in-memory [`FlatIndex`](knowledge_vector::FlatIndex) plus the list of
//!   record ids at each position
//! - a [`KnowledgeStore`](knowledge_storage::KnowledgeStore), the source of
//!   truth that survives restarts
//!
//! The in-memory side is rebuilt from the store with
//! [`KnowledgeIndex::rebuild_index`]. Stored embeddings are reused, missing
//! ones are computed once and written back.
//!
//! ## Concurrency
//! One `RwLock` guards the vector index and id list together. Searches hold
//! it shared for the scan, adds and rebuilds hold it exclusive. Embedding
//! always happens outside the lock.

pub mod error;
pub mod indexer;
pub mod rebuild;
pub mod settings;
pub mod stats;

pub use error::IndexError;
pub use indexer::{KnowledgeIndex, DEFAULT_RELATED_TOP_K, DEFAULT_TOP_K};
pub use rebuild::{
    LoggingProgressCallback, NoOpProgressCallback, ProgressCallback, RebuildProgress,
    RebuildResult,
};
pub use settings::load_embedder;
pub use stats::{IndexHealth, KnowledgeStats, RECENT_WINDOW_DAYS};
