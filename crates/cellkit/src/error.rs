//! Error types for the codec.

use cellkit_core::CellError;
use thiserror::Error;

/// Errors that can occur while flattening or rebuilding a cell DAG.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Cell construction, exotic resolution or ordering failed.
    #[error("cell error: {0}")]
    Cell(#[from] CellError),

    /// The DAG has more cells than the configured limit.
    #[error("too many cells: {actual} (limit {limit})")]
    TooManyCells { limit: usize, actual: usize },

    /// A flat cell's descriptor bytes disagree with its contents.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// A reference points outside the bag or against the bag order.
    #[error("cell {index} references unavailable cell {target}")]
    DanglingRef { index: usize, target: u32 },

    /// The bag holds no cells.
    #[error("empty bag")]
    EmptyBag,
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
