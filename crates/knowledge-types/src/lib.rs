//! # knowledge-types
//!
//! Shared domain types for the knowledge index.
//!
//! This crate defines the core data structures used throughout the system:
//! - Knowledge records: durable, store-assigned entries of searchable text
//! - Settings: layered configuration for storage, embeddings and the index
//!
//! ## Usage
//!
//! ```rust
//! use knowledge_types::NewKnowledge;
//!
//! let entry = NewKnowledge::new("Deploy notes", "Rolled back the cache layer", "decision")
//!     .with_tags(vec!["ops".to_string()]);
//! assert_eq!(entry.source, "manual");
//! ```

pub mod config;
pub mod error;
pub mod record;

pub use config::{EmbeddingProvider, EmbeddingSettings, IndexSettings, Settings};
pub use error::KnowledgeError;
pub use record::{KnowledgeRecord, NewKnowledge, DEFAULT_SOURCE};
