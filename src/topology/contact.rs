//! Contact records between tile boundary segments.

use serde::{Deserialize, Serialize};

use crate::mesh::Mosaic;
use crate::mosaic_error::MosaicError;
use crate::topology::side::Side;

/// How the index sequence along side A maps onto side B.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Both sides advance in the same index axis and the same direction.
    Identity,
    /// Same axis, opposite directions.
    Reversed,
    /// `i` on one side is `j` on the other, same direction.
    Swapped,
    /// `i`/`j` roles exchange and directions oppose (the usual cubed-sphere case).
    SwappedReversed,
}

impl Orientation {
    pub fn from_flags(swapped: bool, reversed: bool) -> Self {
        match (swapped, reversed) {
            (false, false) => Orientation::Identity,
            (false, true) => Orientation::Reversed,
            (true, false) => Orientation::Swapped,
            (true, true) => Orientation::SwappedReversed,
        }
    }

    #[inline]
    pub fn is_swapped(self) -> bool {
        matches!(self, Orientation::Swapped | Orientation::SwappedReversed)
    }

    #[inline]
    pub fn is_reversed(self) -> bool {
        matches!(self, Orientation::Reversed | Orientation::SwappedReversed)
    }
}

/// A matched run of corners shared by two tile boundary segments.
///
/// Positions count corners along each side (see [`Side`]). `start_a < end_a`
/// always; `start_b`/`end_b` are the B positions matching `start_a`/`end_a`,
/// so `start_b > end_b` exactly when the orientation is reversed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub tile_a: usize,
    pub side_a: Side,
    pub start_a: usize,
    pub end_a: usize,
    pub tile_b: usize,
    pub side_b: Side,
    pub start_b: usize,
    pub end_b: usize,
    pub orientation: Orientation,
}

impl Contact {
    /// Number of cell edges in the shared run.
    #[inline]
    pub fn len(&self) -> usize {
        self.end_a - self.start_a
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direction factor from A positions to B positions.
    #[inline]
    pub fn sign(&self) -> isize {
        if self.orientation.is_reversed() { -1 } else { 1 }
    }

    /// B position matching A position `p` (extrapolated past the run).
    #[inline]
    pub fn map_a_to_b(&self, p: isize) -> isize {
        self.start_b as isize + self.sign() * (p - self.start_a as isize)
    }

    /// A position matching B position `q` (extrapolated past the run).
    #[inline]
    pub fn map_b_to_a(&self, q: isize) -> isize {
        self.start_a as isize + self.sign() * (q - self.start_b as isize)
    }

    /// A tile glued to itself east-west.
    pub fn is_periodic_x(&self) -> bool {
        self.tile_a == self.tile_b
            && matches!(
                (self.side_a, self.side_b),
                (Side::West, Side::East) | (Side::East, Side::West)
            )
    }

    /// A tile glued to itself north-south.
    pub fn is_periodic_y(&self) -> bool {
        self.tile_a == self.tile_b
            && matches!(
                (self.side_a, self.side_b),
                (Side::South, Side::North) | (Side::North, Side::South)
            )
    }

    /// Corner index ranges `((is, ie), (js, je))` of the run on one side.
    fn corner_ranges(
        side: Side,
        start: usize,
        end: usize,
        nx: usize,
        ny: usize,
    ) -> ((usize, usize), (usize, usize)) {
        let (is, js) = side.corner_at(start, nx, ny);
        let (ie, je) = side.corner_at(end, nx, ny);
        ((is, ie), (js, je))
    }

    /// Corner index ranges on tile A, in A's run order.
    pub fn corner_ranges_a(&self, mosaic: &Mosaic) -> ((usize, usize), (usize, usize)) {
        let m = &mosaic.tiles()[self.tile_a];
        Self::corner_ranges(self.side_a, self.start_a, self.end_a, m.nx(), m.ny())
    }

    /// Corner index ranges on tile B, in the order matching A's run.
    pub fn corner_ranges_b(&self, mosaic: &Mosaic) -> ((usize, usize), (usize, usize)) {
        let m = &mosaic.tiles()[self.tile_b];
        Self::corner_ranges(self.side_b, self.start_b, self.end_b, m.nx(), m.ny())
    }

    /// Render the contact the way mosaic files record it:
    /// `("name:tileA::name:tileB", "is:ie,js:je::is:ie,js:je")`, with 1-based
    /// corner indices.
    pub fn mosaic_strings(&self, mosaic: &Mosaic) -> Result<(String, String), MosaicError> {
        let tiles = mosaic.tiles();
        let (Some(a), Some(b)) = (tiles.get(self.tile_a), tiles.get(self.tile_b)) else {
            return Err(MosaicError::UnknownTile(format!(
                "#{} or #{}",
                self.tile_a, self.tile_b
            )));
        };
        let name = mosaic.name();
        let contact = format!("{name}:{}::{name}:{}", a.tile(), b.tile());
        let fmt = |((is, ie), (js, je)): ((usize, usize), (usize, usize))| {
            format!("{}:{},{}:{}", is + 1, ie + 1, js + 1, je + 1)
        };
        let index = format!(
            "{}::{}",
            fmt(self.corner_ranges_a(mosaic)),
            fmt(self.corner_ranges_b(mosaic))
        );
        Ok((contact, index))
    }

    /// Signed permutation `m` taking A cell offsets to B cell offsets:
    /// `d_b[r] = Σ_c m[r][c] * d_a[c]` with axis 0 = `i`, axis 1 = `j`.
    pub fn index_transform_a_to_b(&self) -> [[i32; 2]; 2] {
        crossing_transform(self.side_a, self.side_b, self.sign() as i32)
    }

    /// Inverse of [`Contact::index_transform_a_to_b`].
    pub fn index_transform_b_to_a(&self) -> [[i32; 2]; 2] {
        crossing_transform(self.side_b, self.side_a, self.sign() as i32)
    }
}

/// Index-offset transform for stepping out of `from` and into the neighbor
/// through `to`, where along-side positions advance with factor `sign`.
pub(crate) fn crossing_transform(from: Side, to: Side, sign: i32) -> [[i32; 2]; 2] {
    let axis = |s: Side| if s.runs_along_i() { 0 } else { 1 };
    let (along_a, along_b) = (axis(from), axis(to));
    // Outward from `from` is inward into `to`, whose outward sign is negated.
    let depth = from.outward_sign() * -to.outward_sign();
    let mut m = [[0; 2]; 2];
    m[along_b][along_a] = sign;
    m[1 - along_b][1 - along_a] = depth;
    m
}
