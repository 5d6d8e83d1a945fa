//! Error types for cellkit core.

use thiserror::Error;

use crate::cell::CellType;

/// Errors raised while building, resolving or ordering cells.
///
/// Every variant is terminal for the operation that produced it: callers
/// get no partial result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    #[error("invalid exotic cell type: {0}")]
    InvalidExoticType(u8),

    #[error("malformed {kind:?} cell: {reason}")]
    MalformedExoticCell { kind: CellType, reason: String },

    #[error("cell graph is not a DAG")]
    NotADag,

    #[error("invalid bit length: {0}")]
    InvalidBitLength(usize),

    #[error("too many refs: {0} (max 4)")]
    TooManyRefs(usize),

    #[error("cell depth overflows u16")]
    DepthOverflow,

    #[error("bit overflow: capacity {capacity}, requested {requested}")]
    BitOverflow { capacity: usize, requested: usize },

    #[error("bit underflow: requested {requested}, remaining {remaining}")]
    BitUnderflow { requested: usize, remaining: usize },

    #[error("invalid utf-8 in cell chain: {0}")]
    InvalidUtf8(String),
}

impl CellError {
    pub(crate) fn malformed(kind: CellType, reason: impl Into<String>) -> Self {
        CellError::MalformedExoticCell {
            kind,
            reason: reason.into(),
        }
    }
}
