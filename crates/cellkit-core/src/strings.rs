//! Text stored as a chain of cells.
//!
//! Each cell holds up to 127 bytes of UTF-8 and references the next chunk
//! through its first ref.

use std::sync::Arc;

use crate::cell::{Cell, CellBuilder};
use crate::error::CellError;

/// Bytes of text per cell.
pub const CHUNK_BYTES: usize = 127;

/// Store `text` as a chain of cells. The empty string is one empty cell.
pub fn string_to_cell(text: &str) -> Result<Arc<Cell>, CellError> {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return Cell::empty();
    }

    let mut tail: Option<Arc<Cell>> = None;
    for chunk in bytes.chunks(CHUNK_BYTES).rev() {
        let mut builder = CellBuilder::new().store_bytes(chunk)?;
        if let Some(next) = tail.take() {
            builder = builder.store_ref(next)?;
        }
        tail = Some(builder.build()?);
    }
    match tail {
        Some(head) => Ok(head),
        None => Cell::empty(),
    }
}

/// Read a string back from a cell chain.
///
/// Fails with [`CellError::InvalidBitLength`] if a cell holds a partial
/// byte.
pub fn cell_to_string(cell: &Cell) -> Result<String, CellError> {
    let mut bytes = Vec::new();
    let mut current = cell;
    loop {
        let bits = current.bits();
        if !bits.is_byte_aligned() {
            return Err(CellError::InvalidBitLength(bits.len()));
        }
        bytes.extend_from_slice(bits.as_bytes());
        match current.refs().first() {
            Some(next) => current = next,
            None => break,
        }
    }
    String::from_utf8(bytes).map_err(|e| CellError::InvalidUtf8(e.to_string()))
}
