//! Level masks: which Merkle levels of a cell carry a distinct hash.
//!
//! A cell has up to four hash levels (0..=3). Level 0 is always present;
//! bit `i` of the mask marks level `i + 1` as significant. The number of
//! distinct hashes a cell stores is `popcount(mask) + 1`.

use serde::{Deserialize, Serialize};

/// The highest Merkle level a cell can have.
pub const MAX_LEVEL: u8 = 3;

/// Bitmask of significant Merkle levels.
///
/// Only the mask is stored; level, hash index and hash count are derived
/// on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct LevelMask {
    mask: u8,
}

impl LevelMask {
    /// The empty mask: only level 0 is significant.
    pub const EMPTY: Self = Self { mask: 0 };

    /// Create a mask. Bits above level 3 are dropped.
    pub const fn new(mask: u8) -> Self {
        Self { mask: mask & 0b111 }
    }

    /// Mask with only `level` set (empty for level 0).
    pub const fn one_level(level: u8) -> Self {
        if level == 0 {
            Self::EMPTY
        } else {
            Self::new(1 << (level - 1))
        }
    }

    /// The raw mask value.
    pub const fn mask(&self) -> u8 {
        self.mask
    }

    /// Position of the highest set bit plus one, or 0 for an empty mask.
    pub const fn level(&self) -> u8 {
        (u8::BITS - self.mask.leading_zeros()) as u8
    }

    /// Index of this mask's hash in a per-level hash table.
    pub const fn hash_index(&self) -> usize {
        self.mask.count_ones() as usize
    }

    /// Number of distinct hashes a cell with this mask stores.
    pub const fn hash_count(&self) -> usize {
        self.hash_index() + 1
    }

    /// Project the mask down to the levels strictly below `level`.
    pub const fn apply(&self, level: u8) -> Self {
        if level >= 8 {
            return *self;
        }
        Self::new(self.mask & ((1u8 << level) - 1))
    }

    /// Whether `level` contributes its own hash slot.
    pub const fn is_significant(&self, level: u8) -> bool {
        level == 0 || (level <= MAX_LEVEL && (self.mask >> (level - 1)) & 1 != 0)
    }

    /// Bitwise union, used for ordinary cells (OR of the children's masks).
    pub const fn union(&self, other: LevelMask) -> Self {
        Self::new(self.mask | other.mask)
    }

    /// Shift every level down by one, as when crossing a Merkle boundary.
    pub const fn shift_right(&self) -> Self {
        Self::new(self.mask >> 1)
    }

    /// Iterate the significant levels in increasing order, level 0 first.
    pub fn significant_levels(&self) -> impl Iterator<Item = u8> {
        let mask = *self;
        (0..=MAX_LEVEL).filter(move |&level| mask.is_significant(level))
    }
}

impl From<u8> for LevelMask {
    fn from(mask: u8) -> Self {
        Self::new(mask)
    }
}

impl From<LevelMask> for u8 {
    fn from(mask: LevelMask) -> Self {
        mask.mask
    }
}
