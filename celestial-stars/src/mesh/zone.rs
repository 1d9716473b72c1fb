//! Zone numbering.
//!
//! A zone at level `L` is addressed by an index in `0..20·4^L`. The children
//! of zone `i` at level `L` are `4i..4i+4` at level `L+1`, so the descendants
//! of a zone at any deeper level form one contiguous index range.

use std::fmt;
use std::ops::Range;

pub const ROOT_TRIANGLES: usize = 20;

/// Number of zones at `level`.
#[inline]
pub const fn zone_count(level: u32) -> usize {
    ROOT_TRIANGLES << (2 * level)
}

/// A zone address: subdivision level plus index within that level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId {
    pub level: u32,
    pub index: u32,
}

impl ZoneId {
    pub const fn new(level: u32, index: u32) -> Self {
        Self { level, index }
    }

    pub fn parent(&self) -> Option<Self> {
        (self.level > 0).then(|| Self::new(self.level - 1, self.index >> 2))
    }

    pub fn children(&self) -> [Self; 4] {
        let base = self.index << 2;
        [0, 1, 2, 3].map(|k| Self::new(self.level + 1, base + k))
    }

    /// Index range of this zone's descendants at `level` (`level >= self.level`).
    pub fn descendants_at(&self, level: u32) -> Range<usize> {
        debug_assert!(level >= self.level);
        let shift = 2 * (level - self.level);
        let start = (self.index as usize) << shift;
        start..start + (1usize << shift)
    }

    /// XOR mask reconciling this mesh's root ordering with the ordering used
    /// by external HTM-style trixel lookup routines. Applying it twice is the
    /// identity.
    pub const fn interop_mask(level: u32) -> u64 {
        1u64 << (2 * level + 3)
    }

    /// Id as understood by an external HTM-style lookup routine.
    pub fn to_external(&self) -> u64 {
        self.index as u64 ^ Self::interop_mask(self.level)
    }

    /// Inverse of [`to_external`](Self::to_external). Returns `None` if the
    /// id maps outside this mesh's zones at `level`.
    pub fn from_external(level: u32, id: u64) -> Option<Self> {
        let index = id ^ Self::interop_mask(level);
        (index < zone_count(level) as u64).then(|| Self::new(level, index as u32))
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}:{}", self.level, self.index)
    }
}
