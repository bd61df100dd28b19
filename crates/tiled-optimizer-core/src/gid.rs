//! Tile references (GIDs) as stored in Tiled layer data.
//!
//! The three high bits of a GID carry flip flags; the low 29 bits are the
//! base id. [`TileRef`] is the only place that knows about the bias table.

use crate::error::{OptimizerError, Result};
use serde::{Deserialize, Serialize};

const FLIP_DIAGONAL: u64 = 1 << 29;
const FLIP_VERTICAL: u64 = 1 << 30;
const FLIP_HORIZONTAL: u64 = 1 << 31;
const GID_LIMIT: u64 = 1 << 32;

/// Largest base id that still fits below the flag bits.
pub const MAX_BASE_ID: u32 = (1 << 29) - 1;

/// Combination of the three flip flags (one of 8 values).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlipFlags(u8);

impl FlipFlags {
    pub const NONE: FlipFlags = FlipFlags(0);
    pub const DIAGONAL: FlipFlags = FlipFlags(0b001);
    pub const VERTICAL: FlipFlags = FlipFlags(0b010);
    pub const HORIZONTAL: FlipFlags = FlipFlags(0b100);

    pub fn new(horizontal: bool, vertical: bool, diagonal: bool) -> Self {
        let mut bits = 0;
        if horizontal {
            bits |= Self::HORIZONTAL.0;
        }
        if vertical {
            bits |= Self::VERTICAL.0;
        }
        if diagonal {
            bits |= Self::DIAGONAL.0;
        }
        FlipFlags(bits)
    }

    pub fn horizontal(self) -> bool {
        self.0 & Self::HORIZONTAL.0 != 0
    }

    pub fn vertical(self) -> bool {
        self.0 & Self::VERTICAL.0 != 0
    }

    pub fn diagonal(self) -> bool {
        self.0 & Self::DIAGONAL.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Value added to a base id to carry these flags.
    pub fn bias(self) -> u64 {
        let mut bias = 0;
        if self.horizontal() {
            bias += FLIP_HORIZONTAL;
        }
        if self.vertical() {
            bias += FLIP_VERTICAL;
        }
        if self.diagonal() {
            bias += FLIP_DIAGONAL;
        }
        bias
    }

    /// Every flag combination, ordered by bias.
    pub fn all() -> [FlipFlags; 8] {
        [0, 1, 2, 3, 4, 5, 6, 7].map(FlipFlags)
    }
}

impl std::ops::BitOr for FlipFlags {
    type Output = FlipFlags;
    fn bitor(self, rhs: Self) -> Self::Output {
        FlipFlags(self.0 | rhs.0)
    }
}

/// A decoded tile reference: flip flags plus base id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRef {
    pub flags: FlipFlags,
    pub base: u32,
}

impl TileRef {
    pub fn new(flags: FlipFlags, base: u32) -> Self {
        Self { flags, base }
    }

    /// Splits a raw layer value into flags and base id.
    ///
    /// Fails with [`OptimizerError::ReferenceRange`] when `raw` does not fit
    /// in 32 bits.
    pub fn decode(raw: u64) -> Result<Self> {
        if raw >= GID_LIMIT {
            return Err(OptimizerError::ReferenceRange(raw));
        }
        let flags = FlipFlags((raw >> 29) as u8);
        let base = (raw - flags.bias()) as u32;
        Ok(Self { flags, base })
    }

    /// Inverse of [`TileRef::decode`].
    pub fn encode(self) -> Result<u64> {
        if self.base > MAX_BASE_ID {
            return Err(OptimizerError::ReferenceRange(self.base as u64));
        }
        Ok(self.flags.bias() + self.base as u64)
    }

    /// Same flags, different base id.
    pub fn with_base(self, base: u32) -> Self {
        Self {
            flags: self.flags,
            base,
        }
    }

    pub fn is_empty(self) -> bool {
        self.base == 0
    }
}

/// Shorthand for [`TileRef::decode`].
pub fn decode(raw: u64) -> Result<(FlipFlags, u32)> {
    TileRef::decode(raw).map(|r| (r.flags, r.base))
}

/// Shorthand for [`TileRef::encode`].
pub fn encode(flags: FlipFlags, id: u32) -> Result<u64> {
    TileRef::new(flags, id).encode()
}
