//! Exotic cells: pruned branches, library references, Merkle proofs and
//! Merkle updates.
//!
//! An exotic cell's payload starts with an 8-bit type tag followed by a
//! subtype-specific layout:
//!
//! | Tag | Subtype       | Layout after the tag                              | Refs |
//! |-----|---------------|---------------------------------------------------|------|
//! | 1   | Pruned branch | mask:8, `hash_count` x (depth:16, hash:256)       | 0    |
//! | 2   | Library       | library hash:256                                  | 0    |
//! | 3   | Merkle proof  | hash:256, depth:16                                | 1    |
//! | 4   | Merkle update | hash0:256, hash1:256, depth0:16, depth1:16        | 2    |
//!
//! Each subtype has its own parser that validates length, ref count and
//! (for Merkle cells) agreement between encoded and actual child values.
//! [`resolve_exotic`] dispatches on the tag and reports the level mask the
//! cell hashing machinery needs.

use std::sync::Arc;

use crate::bits::{BitBuilder, BitString};
use crate::cell::{Cell, CellType};
use crate::error::CellError;
use crate::level_mask::LevelMask;
use crate::types::CellHash;

/// Width of the exotic type tag.
pub const TAG_BITS: usize = 8;

const HASH_BITS: usize = 256;
const DEPTH_BITS: usize = 16;

/// Payload size of a library cell.
pub const LIBRARY_BITS: usize = TAG_BITS + HASH_BITS;
/// Payload size of a Merkle proof cell.
pub const MERKLE_PROOF_BITS: usize = TAG_BITS + HASH_BITS + DEPTH_BITS;
/// Payload size of a Merkle update cell.
pub const MERKLE_UPDATE_BITS: usize = TAG_BITS + 2 * (HASH_BITS + DEPTH_BITS);

/// Payload size of a pruned branch with the given mask.
pub const fn pruned_branch_bits_len(mask: LevelMask) -> usize {
    TAG_BITS + 8 + mask.hash_count() * (DEPTH_BITS + HASH_BITS)
}

/// One baked-in level of a pruned branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrunedLevel {
    pub depth: u16,
    pub hash: CellHash,
}

/// Parsed pruned branch payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedBranch {
    pub mask: LevelMask,
    /// One entry per significant level, in increasing level order.
    pub pruned: Vec<PrunedLevel>,
}

/// Parsed library reference payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryRef {
    pub hash: CellHash,
}

/// Parsed Merkle proof payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerkleProof {
    pub proof_hash: CellHash,
    pub proof_depth: u16,
}

/// Parsed Merkle update payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerkleUpdate {
    pub old_hash: CellHash,
    pub new_hash: CellHash,
    pub old_depth: u16,
    pub new_depth: u16,
}

/// An exotic payload parsed by its subtype parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExoticCell {
    PrunedBranch(PrunedBranch),
    Library(LibraryRef),
    MerkleProof(MerkleProof),
    MerkleUpdate(MerkleUpdate),
}

impl ExoticCell {
    /// Parse a payload with the parser its tag selects.
    pub fn parse(bits: &BitString, refs: &[Arc<Cell>]) -> Result<Self, CellError> {
        match exotic_tag(bits)? {
            CellType::PrunedBranch => parse_pruned_branch(bits, refs).map(Self::PrunedBranch),
            CellType::Library => parse_library(bits, refs).map(Self::Library),
            CellType::MerkleProof => parse_merkle_proof(bits, refs).map(Self::MerkleProof),
            CellType::MerkleUpdate => parse_merkle_update(bits, refs).map(Self::MerkleUpdate),
            CellType::Ordinary => Err(CellError::InvalidExoticType(0)),
        }
    }

    pub fn kind(&self) -> CellType {
        match self {
            ExoticCell::PrunedBranch(_) => CellType::PrunedBranch,
            ExoticCell::Library(_) => CellType::Library,
            ExoticCell::MerkleProof(_) => CellType::MerkleProof,
            ExoticCell::MerkleUpdate(_) => CellType::MerkleUpdate,
        }
    }
}

/// Outcome of exotic resolution.
///
/// `depths` and `hashes` are only populated for pruned branches; every other
/// subtype gets its hashes from the generic cell hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExotic {
    pub kind: CellType,
    pub depths: Vec<u16>,
    pub hashes: Vec<CellHash>,
    pub mask: LevelMask,
}

/// Peek the type tag without consuming it.
pub fn exotic_tag(bits: &BitString) -> Result<CellType, CellError> {
    let tag = bits
        .reader()
        .peek_uint(TAG_BITS)
        .map_err(|_| CellError::InvalidBitLength(bits.len()))? as u8;
    CellType::from_tag(tag).ok_or(CellError::InvalidExoticType(tag))
}

/// Determine an exotic cell's subtype, level mask and baked-in levels.
pub fn resolve_exotic(bits: &BitString, refs: &[Arc<Cell>]) -> Result<ResolvedExotic, CellError> {
    match exotic_tag(bits)? {
        CellType::PrunedBranch => {
            let branch = parse_pruned_branch(bits, refs)?;
            let (depths, hashes): (Vec<u16>, Vec<CellHash>) =
                branch.pruned.iter().map(|p| (p.depth, p.hash)).unzip();
            Ok(ResolvedExotic {
                kind: CellType::PrunedBranch,
                depths,
                hashes,
                mask: branch.mask,
            })
        }
        CellType::Library => {
            parse_library(bits, refs)?;
            Ok(ResolvedExotic::mask_only(CellType::Library, LevelMask::EMPTY))
        }
        CellType::MerkleProof => {
            parse_merkle_proof(bits, refs)?;
            let mask = LevelMask::new(refs[0].level() >> 1);
            Ok(ResolvedExotic::mask_only(CellType::MerkleProof, mask))
        }
        CellType::MerkleUpdate => {
            parse_merkle_update(bits, refs)?;
            let mask = LevelMask::new((refs[0].level() | refs[1].level()) >> 1);
            Ok(ResolvedExotic::mask_only(CellType::MerkleUpdate, mask))
        }
        CellType::Ordinary => Err(CellError::InvalidExoticType(0)),
    }
}

impl ResolvedExotic {
    fn mask_only(kind: CellType, mask: LevelMask) -> Self {
        Self {
            kind,
            depths: Vec::new(),
            hashes: Vec::new(),
            mask,
        }
    }
}

fn expect_tag(bits: &BitString, kind: CellType) -> Result<(), CellError> {
    let found = exotic_tag(bits)?;
    if found != kind {
        return Err(CellError::malformed(kind, format!("unexpected tag for {found:?}")));
    }
    Ok(())
}

fn expect_refs(refs: &[Arc<Cell>], kind: CellType, expected: usize) -> Result<(), CellError> {
    if refs.len() != expected {
        return Err(CellError::malformed(
            kind,
            format!("expected {expected} refs, got {}", refs.len()),
        ));
    }
    Ok(())
}

fn expect_len(bits: &BitString, kind: CellType, expected: usize) -> Result<(), CellError> {
    if bits.len() != expected {
        return Err(CellError::malformed(
            kind,
            format!("expected {expected} bits, got {}", bits.len()),
        ));
    }
    Ok(())
}

fn truncated(kind: CellType) -> impl Fn(CellError) -> CellError {
    move |e| CellError::malformed(kind, e.to_string())
}

/// Parse a pruned branch payload.
pub fn parse_pruned_branch(bits: &BitString, refs: &[Arc<Cell>]) -> Result<PrunedBranch, CellError> {
    let kind = CellType::PrunedBranch;
    expect_tag(bits, kind)?;
    expect_refs(refs, kind, 0)?;

    let mut reader = bits.reader();
    reader.load_uint(TAG_BITS).map_err(truncated(kind))?;
    let raw_mask = reader.load_uint(8).map_err(truncated(kind))? as u8;
    if raw_mask == 0 || raw_mask > 0b111 {
        return Err(CellError::malformed(kind, format!("invalid level mask {raw_mask}")));
    }
    let mask = LevelMask::new(raw_mask);
    expect_len(bits, kind, pruned_branch_bits_len(mask))?;

    let mut pruned = Vec::with_capacity(mask.hash_count());
    for _ in mask.significant_levels() {
        let depth = reader.load_uint(DEPTH_BITS).map_err(truncated(kind))? as u16;
        let hash = CellHash(reader.load_array::<32>().map_err(truncated(kind))?);
        pruned.push(PrunedLevel { depth, hash });
    }
    Ok(PrunedBranch { mask, pruned })
}

/// Parse a library reference payload.
pub fn parse_library(bits: &BitString, refs: &[Arc<Cell>]) -> Result<LibraryRef, CellError> {
    let kind = CellType::Library;
    expect_tag(bits, kind)?;
    expect_len(bits, kind, LIBRARY_BITS)?;
    expect_refs(refs, kind, 0)?;

    let mut reader = bits.reader();
    reader.load_uint(TAG_BITS).map_err(truncated(kind))?;
    let hash = CellHash(reader.load_array::<32>().map_err(truncated(kind))?);
    Ok(LibraryRef { hash })
}

/// Parse a Merkle proof payload and check it against its child.
pub fn parse_merkle_proof(bits: &BitString, refs: &[Arc<Cell>]) -> Result<MerkleProof, CellError> {
    let kind = CellType::MerkleProof;
    expect_tag(bits, kind)?;
    expect_len(bits, kind, MERKLE_PROOF_BITS)?;
    expect_refs(refs, kind, 1)?;

    let mut reader = bits.reader();
    reader.load_uint(TAG_BITS).map_err(truncated(kind))?;
    let proof_hash = CellHash(reader.load_array::<32>().map_err(truncated(kind))?);
    let proof_depth = reader.load_uint(DEPTH_BITS).map_err(truncated(kind))? as u16;

    if proof_hash != refs[0].hash(0) {
        return Err(CellError::malformed(
            kind,
            format!("proof hash {proof_hash} does not match child {}", refs[0].hash(0)),
        ));
    }
    if proof_depth != refs[0].depth(0) {
        return Err(CellError::malformed(
            kind,
            format!("proof depth {proof_depth} does not match child {}", refs[0].depth(0)),
        ));
    }
    Ok(MerkleProof {
        proof_hash,
        proof_depth,
    })
}

/// Parse a Merkle update payload and check it against both children.
pub fn parse_merkle_update(bits: &BitString, refs: &[Arc<Cell>]) -> Result<MerkleUpdate, CellError> {
    let kind = CellType::MerkleUpdate;
    expect_tag(bits, kind)?;
    expect_len(bits, kind, MERKLE_UPDATE_BITS)?;
    expect_refs(refs, kind, 2)?;

    let mut reader = bits.reader();
    reader.load_uint(TAG_BITS).map_err(truncated(kind))?;
    let old_hash = CellHash(reader.load_array::<32>().map_err(truncated(kind))?);
    let new_hash = CellHash(reader.load_array::<32>().map_err(truncated(kind))?);
    let old_depth = reader.load_uint(DEPTH_BITS).map_err(truncated(kind))? as u16;
    let new_depth = reader.load_uint(DEPTH_BITS).map_err(truncated(kind))? as u16;

    for (side, (hash, depth)) in [(old_hash, old_depth), (new_hash, new_depth)].into_iter().enumerate() {
        if hash != refs[side].hash(0) {
            return Err(CellError::malformed(
                kind,
                format!("ref {side} hash {hash} does not match child {}", refs[side].hash(0)),
            ));
        }
        if depth != refs[side].depth(0) {
            return Err(CellError::malformed(
                kind,
                format!("ref {side} depth {depth} does not match child {}", refs[side].depth(0)),
            ));
        }
    }
    Ok(MerkleUpdate {
        old_hash,
        new_hash,
        old_depth,
        new_depth,
    })
}

/// Encode a pruned branch payload.
///
/// `pruned` must hold one entry per significant level of `mask`.
pub fn pruned_branch_payload(mask: LevelMask, pruned: &[PrunedLevel]) -> Result<BitString, CellError> {
    let kind = CellType::PrunedBranch;
    if mask.mask() == 0 {
        return Err(CellError::malformed(kind, "pruned branch needs a non-empty mask"));
    }
    if pruned.len() != mask.hash_count() {
        return Err(CellError::malformed(
            kind,
            format!("expected {} pruned levels, got {}", mask.hash_count(), pruned.len()),
        ));
    }
    // a full mask does not fit in one cell; Cell::new reports that, not the encoder
    let mut b = BitBuilder::with_capacity(pruned_branch_bits_len(mask));
    b.store_uint(kind.tag() as u64, TAG_BITS)?;
    b.store_uint(mask.mask() as u64, 8)?;
    for level in pruned {
        b.store_uint(level.depth as u64, DEPTH_BITS)?;
        b.store_bytes(level.hash.as_bytes())?;
    }
    Ok(b.build())
}

/// Encode a library reference payload.
pub fn library_payload(hash: &CellHash) -> Result<BitString, CellError> {
    let mut b = BitBuilder::new();
    b.store_uint(CellType::Library.tag() as u64, TAG_BITS)?;
    b.store_bytes(hash.as_bytes())?;
    Ok(b.build())
}

/// Encode a Merkle proof payload over `child`.
pub fn merkle_proof_payload(child: &Cell) -> Result<BitString, CellError> {
    let mut b = BitBuilder::new();
    b.store_uint(CellType::MerkleProof.tag() as u64, TAG_BITS)?;
    b.store_bytes(child.hash(0).as_bytes())?;
    b.store_uint(child.depth(0) as u64, DEPTH_BITS)?;
    Ok(b.build())
}

/// Encode a Merkle update payload from `old` to `new`.
pub fn merkle_update_payload(old: &Cell, new: &Cell) -> Result<BitString, CellError> {
    let mut b = BitBuilder::new();
    b.store_uint(CellType::MerkleUpdate.tag() as u64, TAG_BITS)?;
    b.store_bytes(old.hash(0).as_bytes())?;
    b.store_bytes(new.hash(0).as_bytes())?;
    b.store_uint(old.depth(0) as u64, DEPTH_BITS)?;
    b.store_uint(new.depth(0) as u64, DEPTH_BITS)?;
    Ok(b.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellBuilder;

    fn leaf(byte: u8) -> Arc<Cell> {
        CellBuilder::new().store_uint(byte as u64, 8).unwrap().build().unwrap()
    }

    fn tagged(tag: u8, extra_bits: usize) -> BitString {
        let mut b = BitBuilder::new();
        b.store_uint(tag as u64, 8).unwrap();
        for _ in 0..extra_bits {
            b.store_bit(false).unwrap();
        }
        b.build()
    }

    fn levels(count: usize) -> Vec<PrunedLevel> {
        (0..count)
            .map(|i| PrunedLevel {
                depth: i as u16 + 1,
                hash: CellHash::from_bytes([i as u8 + 0x10; 32]),
            })
            .collect()
    }

    #[test]
    fn test_pruned_branch_resolves_hash_count_levels() {
        for raw in 1u8..=7 {
            let mask = LevelMask::new(raw);
            let table = levels(mask.hash_count());
            let bits = pruned_branch_payload(mask, &table).unwrap();
            assert_eq!(bits.len(), pruned_branch_bits_len(mask));

            let resolved = resolve_exotic(&bits, &[]).unwrap();
            assert_eq!(resolved.kind, CellType::PrunedBranch);
            assert_eq!(resolved.mask, mask);
            assert_eq!(resolved.hashes.len(), mask.hash_count());
            assert_eq!(resolved.depths.len(), mask.hash_count());
            assert_eq!(resolved.hashes, table.iter().map(|p| p.hash).collect::<Vec<_>>());
            assert_eq!(resolved.depths, table.iter().map(|p| p.depth).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_pruned_branch_rejects_zero_mask() {
        let mut b = BitBuilder::new();
        b.store_uint(1, 8).unwrap();
        b.store_uint(0, 8).unwrap();
        let err = resolve_exotic(&b.build(), &[]).unwrap_err();
        assert!(matches!(
            err,
            CellError::MalformedExoticCell {
                kind: CellType::PrunedBranch,
                ..
            }
        ));
    }

    #[test]
    fn test_pruned_branch_rejects_wrong_length() {
        let mask = LevelMask::new(1);
        let mut b = BitBuilder::new();
        b.store_bits(&pruned_branch_payload(mask, &levels(2)).unwrap()).unwrap();
        b.store_bit(true).unwrap();
        let err = resolve_exotic(&b.build(), &[]).unwrap_err();
        assert!(matches!(err, CellError::MalformedExoticCell { .. }));
    }

    #[test]
    fn test_pruned_branch_rejects_refs() {
        let mask = LevelMask::new(1);
        let bits = pruned_branch_payload(mask, &levels(2)).unwrap();
        let err = resolve_exotic(&bits, &[leaf(1)]).unwrap_err();
        assert!(matches!(err, CellError::MalformedExoticCell { .. }));
    }

    #[test]
    fn test_library_resolves_empty_mask() {
        let id = CellHash::from_bytes([0x77; 32]);
        let bits = library_payload(&id).unwrap();
        let resolved = resolve_exotic(&bits, &[]).unwrap();
        assert_eq!(resolved.kind, CellType::Library);
        assert_eq!(resolved.mask, LevelMask::EMPTY);
        assert!(resolved.hashes.is_empty());
        assert!(resolved.depths.is_empty());
        assert_eq!(parse_library(&bits, &[]).unwrap().hash, id);
    }

    #[test]
    fn test_library_rejects_short_payload() {
        let err = resolve_exotic(&tagged(2, 100), &[]).unwrap_err();
        assert!(matches!(
            err,
            CellError::MalformedExoticCell {
                kind: CellType::Library,
                ..
            }
        ));
    }

    #[test]
    fn test_merkle_proof_mask_from_child_level() {
        // child with level 2: ordinary parent of a pruned branch with mask 0b10
        let mask = LevelMask::new(0b10);
        let pruned_bits = pruned_branch_payload(mask, &levels(2)).unwrap();
        let pruned = Cell::new(true, pruned_bits, vec![]).unwrap();
        let child = CellBuilder::new().store_ref(pruned).unwrap().build().unwrap();
        assert_eq!(child.level(), 2);

        let bits = merkle_proof_payload(&child).unwrap();
        let resolved = resolve_exotic(&bits, &[child]).unwrap();
        assert_eq!(resolved.kind, CellType::MerkleProof);
        assert_eq!(resolved.mask.mask(), 1);
        assert!(resolved.hashes.is_empty());
    }

    #[test]
    fn test_merkle_proof_rejects_hash_mismatch() {
        let child = leaf(1);
        let bits = merkle_proof_payload(&leaf(2)).unwrap();
        let err = resolve_exotic(&bits, &[child]).unwrap_err();
        assert!(matches!(
            err,
            CellError::MalformedExoticCell {
                kind: CellType::MerkleProof,
                ..
            }
        ));
    }

    #[test]
    fn test_merkle_proof_rejects_wrong_ref_count() {
        let child = leaf(1);
        let bits = merkle_proof_payload(&child).unwrap();
        assert!(resolve_exotic(&bits, &[]).is_err());
        assert!(resolve_exotic(&bits, &[child.clone(), child]).is_err());
    }

    #[test]
    fn test_merkle_update_checks_both_children() {
        let old = leaf(1);
        let new = leaf(2);
        let bits = merkle_update_payload(&old, &new).unwrap();
        let resolved = resolve_exotic(&bits, &[old.clone(), new.clone()]).unwrap();
        assert_eq!(resolved.kind, CellType::MerkleUpdate);
        assert_eq!(resolved.mask, LevelMask::EMPTY);

        let err = resolve_exotic(&bits, &[new, old]).unwrap_err();
        assert!(matches!(
            err,
            CellError::MalformedExoticCell {
                kind: CellType::MerkleUpdate,
                ..
            }
        ));
    }

    #[test]
    fn test_merkle_update_mask_unions_child_levels() {
        // levels 2 and 1 give (0b10 | 0b01) >> 1 = 1
        let old = CellBuilder::new()
            .store_ref(leaf(1).prune(2).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let new = CellBuilder::new()
            .store_ref(leaf(2).prune(1).unwrap())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!((old.level(), new.level()), (2, 1));

        let bits = merkle_update_payload(&old, &new).unwrap();
        let resolved = resolve_exotic(&bits, &[old.clone(), new.clone()]).unwrap();
        assert_eq!(resolved.mask, LevelMask::new(1));

        let cell = Cell::new(true, bits, vec![old, new]).unwrap();
        assert_eq!(cell.kind(), CellType::MerkleUpdate);
        assert_eq!(cell.level(), 1);
    }

    #[test]
    fn test_unknown_tag() {
        for tag in [0u8, 5, 0xff] {
            let err = resolve_exotic(&tagged(tag, 0), &[]).unwrap_err();
            assert_eq!(err, CellError::InvalidExoticType(tag));
        }
    }

    #[test]
    fn test_missing_tag() {
        let err = resolve_exotic(&BitString::empty(), &[]).unwrap_err();
        assert_eq!(err, CellError::InvalidBitLength(0));
    }

    #[test]
    fn test_parse_dispatch() {
        let id = CellHash::from_bytes([1; 32]);
        let parsed = ExoticCell::parse(&library_payload(&id).unwrap(), &[]).unwrap();
        assert_eq!(parsed.kind(), CellType::Library);
        assert_eq!(parsed, ExoticCell::Library(LibraryRef { hash: id }));
    }
}
