//! Error types shared across the knowledge index crates.

use thiserror::Error;

/// Errors raised by domain types and configuration loading.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
