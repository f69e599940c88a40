//! Tile boundary sides.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four boundaries of a tile's corner array.
///
/// `South` is `j = 0`, `East` is `i = nx`, `North` is `j = ny` and `West` is
/// `i = 0`. Positions along a side count corners in increasing `i` (south,
/// north) or increasing `j` (west, east).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    South,
    East,
    North,
    West,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::South, Side::East, Side::North, Side::West];

    /// Dense index in `0..4`, in [`Side::ALL`] order.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Side::South => 0,
            Side::East => 1,
            Side::North => 2,
            Side::West => 3,
        }
    }

    /// Whether positions along this side advance in `i`.
    #[inline]
    pub fn runs_along_i(self) -> bool {
        matches!(self, Side::South | Side::North)
    }

    /// Sign of the index axis normal to the side that points out of the tile.
    #[inline]
    pub fn outward_sign(self) -> i32 {
        match self {
            Side::South | Side::West => -1,
            Side::North | Side::East => 1,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::South => Side::North,
            Side::East => Side::West,
            Side::North => Side::South,
            Side::West => Side::East,
        }
    }

    /// Number of corner positions along this side minus one (its cell count).
    #[inline]
    pub fn cell_len(self, nx: usize, ny: usize) -> usize {
        if self.runs_along_i() { nx } else { ny }
    }

    /// Corner index `(i, j)` at position `p` along this side.
    #[inline]
    pub fn corner_at(self, p: usize, nx: usize, ny: usize) -> (usize, usize) {
        match self {
            Side::South => (p, 0),
            Side::North => (p, ny),
            Side::West => (0, p),
            Side::East => (nx, p),
        }
    }

    fn short_name(self) -> &'static str {
        match self {
            Side::South => "south",
            Side::East => "east",
            Side::North => "north",
            Side::West => "west",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
