//! Durable store for knowledge records.
//!
//! Provides RocksDB-backed storage with:
//! - Column family isolation for records and store metadata
//! - Zero-padded id keys so iteration is ascending id order
//! - Atomic insert of record + id sequence via WriteBatch
//! - The [`KnowledgeStore`] trait the knowledge index is written against

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;
pub mod store;

pub use db::Storage;
pub use error::StorageError;
pub use keys::KnowledgeKey;
pub use store::{KnowledgeQuery, KnowledgeStore};
