//! # Cellkit
//!
//! Content-addressed cell DAGs: build cells, resolve exotic cells, order a
//! DAG topologically and move it in and out of a flat, indexed form.
//!
//! ## Overview
//!
//! - **Cells**: Immutable nodes with up to 1023 bits of data and 4 references
//! - **Exotic cells**: Pruned branches, library references and Merkle cells
//! - **Ordering**: Every cell placed after the cells it references
//! - **Codec**: Flatten a DAG into a [`FlatBag`] and rebuild it
//!
//! ## Usage
//!
//! ```rust
//! use cellkit::{CellBuilder, CellCodec, CodecConfig};
//!
//! fn example() -> cellkit::Result<()> {
//!     let leaf = CellBuilder::new().store_uint(3, 8)?.build()?;
//!     let root = CellBuilder::new()
//!         .store_uint(0, 8)?
//!         .store_ref(leaf.clone())?
//!         .store_ref(leaf)?
//!         .build()?;
//!
//!     let codec = CellCodec::new(CodecConfig::default());
//!     let bag = codec.flatten(&root)?;
//!     assert_eq!(bag.len(), 2);
//!
//!     let rebuilt = codec.rebuild(&bag)?;
//!     assert_eq!(rebuilt.repr_hash(), root.repr_hash());
//!     Ok(())
//! }
//! # example().unwrap();
//! ```
//!
//! ## Re-exports
//!
//! `cellkit::core` is the pure primitives crate; its main types are also
//! re-exported at the top level.

pub mod codec;
pub mod error;

pub use cellkit_core as core;

pub use codec::{CellCodec, CellOrder, CodecConfig, FlatBag, FlatCell};
pub use error::{CodecError, Result};

pub use cellkit_core::{
    cell_to_string, string_to_cell, topological_sort, BitString, Cell, CellBuilder, CellError,
    CellHash, CellType, ExoticCell, LevelMask,
};
