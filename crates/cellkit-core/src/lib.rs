//! # Cellkit Core
//!
//! Pure primitives for content-addressed cell DAGs: bit payloads, level
//! masks, exotic cell layouts, hashing and topological ordering.
//!
//! This crate contains no I/O and no logging. It is pure computation over
//! immutable cells shared through `Arc`.
//!
//! ## Key Types
//!
//! - [`Cell`] - Immutable node: up to 1023 bits and 4 references
//! - [`CellHash`] - Per-level content hash (Blake3)
//! - [`LevelMask`] - Which of the three Merkle levels a cell carries hashes for
//! - [`ExoticCell`] - Parsed view of a pruned branch, library or Merkle cell
//!
//! ## Ordering
//!
//! [`topological_sort`] places every cell after the cells it references and
//! rejects graphs with cycles. See the [`topo`] module.

pub mod bits;
pub mod cell;
pub mod error;
pub mod exotic;
pub mod level_mask;
pub mod padding;
pub mod strings;
pub mod topo;
pub mod types;

pub use bits::{BitBuilder, BitReader, BitString, MAX_CELL_BITS};
pub use cell::{bits_descriptor, refs_descriptor, Cell, CellBuilder, CellType, MAX_REFS};
pub use error::CellError;
pub use exotic::{
    exotic_tag, resolve_exotic, ExoticCell, LibraryRef, MerkleProof, MerkleUpdate, PrunedBranch,
    PrunedLevel, ResolvedExotic,
};
pub use level_mask::{LevelMask, MAX_LEVEL};
pub use padding::{bits_to_padded, decode_padded, padded_to_bits};
pub use strings::{cell_to_string, string_to_cell};
pub use topo::{topological_sort, DagNode, SortedCells, SortedEntry};
pub use types::CellHash;
