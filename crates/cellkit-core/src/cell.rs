//! Cell: an immutable node of the content-addressed DAG.
//!
//! A cell holds up to 1023 payload bits and up to 4 references. Its hashes
//! and depths are computed once, bottom-up, when the cell is built; children
//! are shared through `Arc`, so a cell graph built here can never contain a
//! cycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::bits::{BitBuilder, BitString, MAX_CELL_BITS};
use crate::error::CellError;
use crate::exotic::{self, PrunedLevel};
use crate::level_mask::{LevelMask, MAX_LEVEL};
use crate::padding::bits_to_padded;
use crate::types::CellHash;

/// Maximum number of references per cell.
pub const MAX_REFS: usize = 4;

/// Number of hash/depth slots a cell exposes (levels 0..=3).
const LEVELS: usize = MAX_LEVEL as usize + 1;

/// The kind of a cell. Exotic kinds carry their wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    Ordinary,
    PrunedBranch,
    Library,
    MerkleProof,
    MerkleUpdate,
}

impl CellType {
    /// The exotic type tag (0 for ordinary cells).
    pub fn tag(self) -> u8 {
        match self {
            CellType::Ordinary => 0,
            CellType::PrunedBranch => 1,
            CellType::Library => 2,
            CellType::MerkleProof => 3,
            CellType::MerkleUpdate => 4,
        }
    }

    /// Map an exotic type tag to its kind.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(CellType::PrunedBranch),
            2 => Some(CellType::Library),
            3 => Some(CellType::MerkleProof),
            4 => Some(CellType::MerkleUpdate),
            _ => None,
        }
    }

    pub fn is_exotic(self) -> bool {
        self != CellType::Ordinary
    }

    /// Merkle cells read their children one level up.
    pub fn is_merkle(self) -> bool {
        matches!(self, CellType::MerkleProof | CellType::MerkleUpdate)
    }
}

/// Refs descriptor byte: ref count, exotic flag and level mask.
pub fn refs_descriptor(refs: usize, exotic: bool, mask: LevelMask) -> u8 {
    refs as u8 + if exotic { 8 } else { 0 } + mask.mask() * 32
}

/// Bits descriptor byte: `ceil(len / 8) + floor(len / 8)`. Odd means padded.
pub fn bits_descriptor(len: usize) -> u8 {
    (len.div_ceil(8) + len / 8) as u8
}

/// An immutable cell with precomputed per-level hashes and depths.
pub struct Cell {
    kind: CellType,
    bits: BitString,
    refs: Vec<Arc<Cell>>,
    mask: LevelMask,
    hashes: [CellHash; LEVELS],
    depths: [u16; LEVELS],
}

impl Cell {
    /// Build a cell, resolving exotic payloads and computing its hashes.
    pub fn new(exotic: bool, bits: BitString, refs: Vec<Arc<Cell>>) -> Result<Arc<Cell>, CellError> {
        if bits.len() > MAX_CELL_BITS {
            return Err(CellError::InvalidBitLength(bits.len()));
        }
        if refs.len() > MAX_REFS {
            return Err(CellError::TooManyRefs(refs.len()));
        }

        let (kind, mask, pruned) = if exotic {
            let resolved = exotic::resolve_exotic(&bits, &refs)?;
            let pruned: Vec<PrunedLevel> = resolved
                .depths
                .iter()
                .zip(&resolved.hashes)
                .map(|(&depth, &hash)| PrunedLevel { depth, hash })
                .collect();
            (resolved.kind, resolved.mask, pruned)
        } else {
            let mask = refs
                .iter()
                .fold(LevelMask::EMPTY, |acc, r| acc.union(r.level_mask()));
            (CellType::Ordinary, mask, Vec::new())
        };

        let (hashes, depths) = compute_hashes(kind, &bits, &refs, mask, &pruned)?;
        Ok(Arc::new(Cell {
            kind,
            bits,
            refs,
            mask,
            hashes,
            depths,
        }))
    }

    /// An ordinary cell with no payload and no refs.
    pub fn empty() -> Result<Arc<Cell>, CellError> {
        Cell::new(false, BitString::empty(), Vec::new())
    }

    /// Build a pruned branch that stands in for this cell.
    ///
    /// The branch's mask is this cell's mask plus `level`; it carries this
    /// cell's depth and hash for every significant level of that mask.
    pub fn prune(&self, level: u8) -> Result<Arc<Cell>, CellError> {
        if level == 0 || level > MAX_LEVEL {
            return Err(CellError::malformed(
                CellType::PrunedBranch,
                format!("pruning level {level} out of range"),
            ));
        }
        let mask = self.mask.union(LevelMask::one_level(level));
        let table: Vec<PrunedLevel> = mask
            .significant_levels()
            .map(|l| PrunedLevel {
                depth: self.depth(l),
                hash: self.hash(l),
            })
            .collect();
        let bits = exotic::pruned_branch_payload(mask, &table)?;
        Cell::new(true, bits, Vec::new())
    }

    pub fn kind(&self) -> CellType {
        self.kind
    }

    pub fn is_exotic(&self) -> bool {
        self.kind.is_exotic()
    }

    pub fn bits(&self) -> &BitString {
        &self.bits
    }

    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    pub fn level_mask(&self) -> LevelMask {
        self.mask
    }

    pub fn level(&self) -> u8 {
        self.mask.level()
    }

    /// Hash at `level`; levels above 3 read level 3.
    pub fn hash(&self, level: u8) -> CellHash {
        self.hashes[level.min(MAX_LEVEL) as usize]
    }

    /// Depth at `level`; levels above 3 read level 3.
    pub fn depth(&self, level: u8) -> u16 {
        self.depths[level.min(MAX_LEVEL) as usize]
    }

    /// The representation hash: the cell's content address.
    pub fn repr_hash(&self) -> CellHash {
        self.hash(MAX_LEVEL)
    }

    /// The `(d1, d2)` descriptor bytes used in linear serialization.
    pub fn descriptors(&self) -> [u8; 2] {
        [
            refs_descriptor(self.refs.len(), self.is_exotic(), self.mask),
            bits_descriptor(self.bits.len()),
        ]
    }
}

/// Compute the four per-level hashes and depths.
///
/// Each significant level hashes a representation of the cell at that
/// level; the first one hashes the padded payload, later ones hash the
/// previous level's hash in its place. A pruned branch only computes its top
/// level and takes the lower ones from its baked-in table.
fn compute_hashes(
    kind: CellType,
    bits: &BitString,
    refs: &[Arc<Cell>],
    mask: LevelMask,
    pruned: &[PrunedLevel],
) -> Result<([CellHash; LEVELS], [u16; LEVELS]), CellError> {
    let is_pruned = kind == CellType::PrunedBranch;
    let child_shift = u8::from(kind.is_merkle());
    let own_count = if is_pruned { 1 } else { mask.hash_count() };
    let offset = mask.hash_count() - own_count;

    let mut own_hashes: Vec<CellHash> = Vec::with_capacity(own_count);
    let mut own_depths: Vec<u16> = Vec::with_capacity(own_count);
    let padded = bits_to_padded(bits);

    for (slot, level) in mask.significant_levels().enumerate() {
        if slot < offset {
            continue;
        }
        let child_level = level + child_shift;

        let mut depth = 0u16;
        for child in refs {
            depth = depth.max(child.depth(child_level));
        }
        if !refs.is_empty() {
            depth = depth.checked_add(1).ok_or(CellError::DepthOverflow)?;
        }

        let data: &[u8] = match own_hashes.last() {
            Some(prev) => prev.as_bytes(),
            None => &padded,
        };
        let mut repr = Vec::with_capacity(2 + data.len() + refs.len() * 34);
        repr.push(refs_descriptor(refs.len(), kind.is_exotic(), mask.apply(level)));
        repr.push(bits_descriptor(bits.len()));
        repr.extend_from_slice(data);
        for child in refs {
            repr.extend_from_slice(&child.depth(child_level).to_be_bytes());
        }
        for child in refs {
            repr.extend_from_slice(child.hash(child_level).as_bytes());
        }

        own_hashes.push(CellHash::digest(&repr));
        own_depths.push(depth);
    }

    let mut hashes = [CellHash::ZERO; LEVELS];
    let mut depths = [0u16; LEVELS];
    for level in 0..LEVELS {
        let index = mask.apply(level as u8).hash_index();
        if is_pruned && index < mask.hash_index() {
            let baked = pruned.get(index).ok_or_else(|| {
                CellError::malformed(kind, format!("missing pruned level {index}"))
            })?;
            hashes[level] = baked.hash;
            depths[level] = baked.depth;
        } else {
            hashes[level] = own_hashes[index - offset];
            depths[level] = own_depths[index - offset];
        }
    }
    Ok((hashes, depths))
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.repr_hash() == other.repr_hash()
    }
}

impl Eq for Cell {}

impl Drop for Cell {
    // Uniquely owned descendants are unlinked iteratively so a deep chain
    // cannot exhaust the stack.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.refs);
        while let Some(child) = pending.pop() {
            if let Some(mut inner) = Arc::into_inner(child) {
                pending.append(&mut inner.refs);
            }
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("kind", &self.kind)
            .field("bits", &self.bits.len())
            .field("refs", &self.refs.len())
            .field("mask", &self.mask.mask())
            .field("hash", &self.repr_hash())
            .finish()
    }
}

/// Fluent builder for cells.
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    bits: BitBuilder,
    refs: Vec<Arc<Cell>>,
    exotic: bool,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the cell as exotic; its payload must start with a type tag.
    pub fn exotic(mut self) -> Self {
        self.exotic = true;
        self
    }

    pub fn store_bit(mut self, bit: bool) -> Result<Self, CellError> {
        self.bits.store_bit(bit)?;
        Ok(self)
    }

    pub fn store_uint(mut self, value: u64, bits: usize) -> Result<Self, CellError> {
        self.bits.store_uint(value, bits)?;
        Ok(self)
    }

    pub fn store_bytes(mut self, bytes: &[u8]) -> Result<Self, CellError> {
        self.bits.store_bytes(bytes)?;
        Ok(self)
    }

    pub fn store_bits(mut self, bits: &BitString) -> Result<Self, CellError> {
        self.bits.store_bits(bits)?;
        Ok(self)
    }

    pub fn store_ref(mut self, cell: Arc<Cell>) -> Result<Self, CellError> {
        if self.refs.len() == MAX_REFS {
            return Err(CellError::TooManyRefs(MAX_REFS + 1));
        }
        self.refs.push(cell);
        Ok(self)
    }

    pub fn build(self) -> Result<Arc<Cell>, CellError> {
        Cell::new(self.exotic, self.bits.build(), self.refs)
    }
}
