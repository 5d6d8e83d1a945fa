//! Flattening a cell DAG into an indexed bag and rebuilding it.
//!
//! A [`FlatBag`] lists every distinct cell once, in topological order, with
//! references expressed as indices into the bag. Each entry keeps the two
//! descriptor bytes and the padded payload that feed the cell hash, so a
//! rebuilt DAG hashes identically to its source.

use std::sync::Arc;

use cellkit_core::{
    bits_descriptor, bits_to_padded, decode_padded, topological_sort, Cell, SortedEntry,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CodecError, Result};

/// Position of the root relative to the cells it references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellOrder {
    /// Every cell after the cells it references; root last.
    #[default]
    DependenciesFirst,
    /// Root at index 0; references point forward.
    RootFirst,
}

/// Configuration for the codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Cell order used by [`CellCodec::flatten`].
    pub order: CellOrder,
    /// Largest number of distinct cells accepted in either direction.
    pub max_cells: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            order: CellOrder::DependenciesFirst,
            max_cells: 1 << 16,
        }
    }
}

/// One cell of a flattened DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatCell {
    /// Refs descriptor: ref count, exotic flag, level mask.
    pub d1: u8,
    /// Bits descriptor: odd when `data` carries a padding marker.
    pub d2: u8,
    /// Payload rounded up to whole bytes.
    pub data: Vec<u8>,
    /// Bag indices of the referenced cells, in ref order.
    pub refs: Vec<u32>,
}

impl FlatCell {
    fn from_entry(entry: &SortedEntry<Arc<Cell>>) -> Result<Self> {
        let [d1, d2] = entry.cell.descriptors();
        let refs = entry
            .refs
            .iter()
            .map(|&i| u32::try_from(i).map_err(|_| too_many(u32::MAX as usize, i)))
            .collect::<Result<Vec<u32>>>()?;
        Ok(Self {
            d1,
            d2,
            data: bits_to_padded(entry.cell.bits()),
            refs,
        })
    }

    fn ref_count(&self) -> usize {
        (self.d1 & 0b111) as usize
    }

    fn is_exotic(&self) -> bool {
        self.d1 & 0b1000 != 0
    }

    fn is_padded(&self) -> bool {
        self.d2 & 1 == 1
    }
}

/// A flattened cell DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatBag {
    pub order: CellOrder,
    pub cells: Vec<FlatCell>,
}

impl FlatBag {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Index of the root cell for this bag's order.
    pub fn root_index(&self) -> usize {
        match self.order {
            CellOrder::DependenciesFirst => self.cells.len().saturating_sub(1),
            CellOrder::RootFirst => 0,
        }
    }
}

/// Converts between cell DAGs and [`FlatBag`]s.
#[derive(Debug, Clone, Default)]
pub struct CellCodec {
    config: CodecConfig,
}

impl CellCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Flatten the DAG under `root` into a bag.
    pub fn flatten(&self, root: &Arc<Cell>) -> Result<FlatBag> {
        let sorted = topological_sort(root)?;
        if sorted.len() > self.config.max_cells {
            warn!(
                limit = self.config.max_cells,
                actual = sorted.len(),
                "refusing to flatten oversized dag"
            );
            return Err(too_many(self.config.max_cells, sorted.len()));
        }

        let entries = match self.config.order {
            CellOrder::DependenciesFirst => sorted.into_entries(),
            CellOrder::RootFirst => sorted.into_root_first(),
        };
        let cells = entries
            .iter()
            .map(FlatCell::from_entry)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            cells = cells.len(),
            order = ?self.config.order,
            root = %root.repr_hash(),
            "flattened cell dag"
        );
        Ok(FlatBag {
            order: self.config.order,
            cells,
        })
    }

    /// Rebuild the DAG stored in `bag` and return its root.
    ///
    /// Cells are built in dependency order, so every reference must point at
    /// a cell that comes earlier in that order. Exotic cells are resolved
    /// again, and every rebuilt cell must reproduce its stored descriptor
    /// bytes exactly.
    pub fn rebuild(&self, bag: &FlatBag) -> Result<Arc<Cell>> {
        if bag.is_empty() {
            warn!("refusing to rebuild empty bag");
            return Err(CodecError::EmptyBag);
        }
        if bag.len() > self.config.max_cells {
            warn!(
                limit = self.config.max_cells,
                actual = bag.len(),
                "refusing to rebuild oversized bag"
            );
            return Err(too_many(self.config.max_cells, bag.len()));
        }

        let build_order: Box<dyn Iterator<Item = usize>> = match bag.order {
            CellOrder::DependenciesFirst => Box::new(0..bag.len()),
            CellOrder::RootFirst => Box::new((0..bag.len()).rev()),
        };

        let mut built: Vec<Option<Arc<Cell>>> = vec![None; bag.len()];
        for index in build_order {
            let cell = rebuild_cell(index, &bag.cells[index], &built).map_err(|e| {
                warn!(index, error = %e, "rejected flat cell");
                e
            })?;
            built[index] = Some(cell);
        }

        let root = built[bag.root_index()].clone().ok_or(CodecError::EmptyBag)?;
        debug!(cells = bag.len(), root = %root.repr_hash(), "rebuilt cell dag");
        Ok(root)
    }
}

fn rebuild_cell(index: usize, flat: &FlatCell, built: &[Option<Arc<Cell>>]) -> Result<Arc<Cell>> {
    if flat.ref_count() != flat.refs.len() {
        return Err(CodecError::InvalidDescriptor(format!(
            "cell {index}: descriptor says {} refs, found {}",
            flat.ref_count(),
            flat.refs.len()
        )));
    }
    let expected_bytes = (flat.d2 as usize).div_ceil(2);
    if flat.data.len() != expected_bytes {
        return Err(CodecError::InvalidDescriptor(format!(
            "cell {index}: descriptor says {expected_bytes} data bytes, found {}",
            flat.data.len()
        )));
    }

    let bits = decode_padded(flat.data.clone(), flat.is_padded());
    if bits_descriptor(bits.len()) != flat.d2 {
        return Err(CodecError::InvalidDescriptor(format!(
            "cell {index}: padding marker disagrees with bits descriptor {}",
            flat.d2
        )));
    }

    let refs = flat
        .refs
        .iter()
        .map(|&target| {
            built
                .get(target as usize)
                .and_then(Option::clone)
                .ok_or(CodecError::DanglingRef { index, target })
        })
        .collect::<Result<Vec<_>>>()?;

    let cell = Cell::new(flat.is_exotic(), bits, refs)?;
    // reserved bits and the level mask must reproduce exactly
    let [d1, d2] = cell.descriptors();
    if (d1, d2) != (flat.d1, flat.d2) {
        return Err(CodecError::InvalidDescriptor(format!(
            "cell {index}: stored descriptors {:#04x} {:#04x} but cell resolves to {d1:#04x} {d2:#04x}",
            flat.d1, flat.d2
        )));
    }
    Ok(cell)
}

fn too_many(limit: usize, actual: usize) -> CodecError {
    CodecError::TooManyCells { limit, actual }
}
