//! Vector index error types.

use thiserror::Error;

/// Errors that can occur during vector operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Position beyond the end of the index
    #[error("Position {position} out of range for index of {len} vectors")]
    PositionOutOfRange { position: usize, len: usize },
}
