//! Halo filling across tile contacts.
//!
//! A halo position outside a tile is resolved by stepping across the contact
//! on the side it lies beyond and re-indexing through that contact's
//! orientation. Positions beyond two sides (halo corners) try the north/south
//! contact first and then east/west; each hop may land outside the neighbour
//! along its own boundary, in which case one more hop is taken from there.
//! Anything still unresolved receives the fill value.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::mesh::Mosaic;
use crate::mosaic_error::MosaicError;
use crate::topology::contact::Contact;
use crate::topology::side::Side;

/// Value written where no neighbour supplies data.
pub const DEFAULT_FILL_VALUE: f64 = -9999.0;

/// Hops allowed to resolve one halo position; two reach across a corner.
const MAX_HOPS: usize = 2;

/// Where data values sit on the tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Staggering {
    /// One value per cell, `ny × nx`.
    #[default]
    Center,
    /// One value per corner, `(ny + 1) × (nx + 1)`; corners on a shared
    /// boundary belong to both tiles, so the halo starts one row further in.
    Corner,
}

impl Staggering {
    #[inline]
    fn extent(self, nx: usize, ny: usize) -> (usize, usize) {
        match self {
            Staggering::Center => (nx, ny),
            Staggering::Corner => (nx + 1, ny + 1),
        }
    }
}

/// How a pair of fields transforms when crossing a rotated contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairKind {
    /// Components of a vector along the local `i`/`j` axes: rotated with sign.
    Vector,
    /// Axis-aligned magnitudes such as `dx`/`dy`: swapped, never negated.
    Magnitude,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaloOptions {
    pub fill_value: f64,
}

impl Default for HaloOptions {
    fn default() -> Self {
        Self {
            fill_value: DEFAULT_FILL_VALUE,
        }
    }
}

/// A tile's data padded by `halo` rings on every side.
#[derive(Clone, Debug, PartialEq)]
pub struct HaloField {
    pub tile: String,
    pub halo: usize,
    pub staggering: Staggering,
    /// Padded extent along `i`.
    pub ni: usize,
    /// Padded extent along `j`.
    pub nj: usize,
    /// Row-major padded values.
    pub data: Vec<f64>,
}

impl HaloField {
    /// Value at logical index `(i, j)`, where `0..n` is the interior and
    /// negative or `>= n` indices address the halo.
    pub fn get(&self, i: isize, j: isize) -> Option<f64> {
        let h = self.halo as isize;
        let (pi, pj) = (i + h, j + h);
        if pi < 0 || pj < 0 || pi as usize >= self.ni || pj as usize >= self.nj {
            return None;
        }
        Some(self.data[pj as usize * self.ni + pi as usize])
    }
}

/// One side's view of a contact, oriented from the tile it is attached to.
#[derive(Clone, Copy, Debug)]
struct Link {
    neighbor: usize,
    neighbor_side: Side,
    anchor_self: isize,
    anchor_nb: isize,
    sign: isize,
    lo: usize,
    hi: usize,
    transform: [[i32; 2]; 2],
}

impl Link {
    fn from_a(c: &Contact) -> Self {
        Self {
            neighbor: c.tile_b,
            neighbor_side: c.side_b,
            anchor_self: c.start_a as isize,
            anchor_nb: c.start_b as isize,
            sign: c.sign(),
            lo: c.start_a,
            hi: c.end_a,
            transform: c.index_transform_a_to_b(),
        }
    }

    fn from_b(c: &Contact) -> Self {
        Self {
            neighbor: c.tile_a,
            neighbor_side: c.side_a,
            anchor_self: c.start_b as isize,
            anchor_nb: c.start_a as isize,
            sign: c.sign(),
            lo: c.start_b.min(c.end_b),
            hi: c.start_b.max(c.end_b),
            transform: c.index_transform_b_to_a(),
        }
    }

    fn covers(&self, along: isize, staggering: Staggering) -> bool {
        let (lo, hi) = (self.lo as isize, self.hi as isize);
        match staggering {
            Staggering::Center => lo <= along && along < hi,
            Staggering::Corner => lo <= along && along <= hi,
        }
    }

    /// Neighbour along-side index for `along` on this side.
    fn map_along(&self, along: isize, staggering: Staggering) -> isize {
        let q = self.anchor_nb + self.sign * (along - self.anchor_self);
        match staggering {
            Staggering::Center if self.sign < 0 => q - 1,
            _ => q,
        }
    }
}

/// A resolved source position plus the accumulated index transform.
#[derive(Clone, Copy, Debug)]
struct Resolved {
    tile: usize,
    i: usize,
    j: usize,
    transform: [[i32; 2]; 2],
}

const IDENTITY: [[i32; 2]; 2] = [[1, 0], [0, 1]];

fn compose(outer: [[i32; 2]; 2], inner: [[i32; 2]; 2]) -> [[i32; 2]; 2] {
    let mut m = [[0; 2]; 2];
    for r in 0..2 {
        for c in 0..2 {
            m[r][c] = outer[r][0] * inner[0][c] + outer[r][1] * inner[1][c];
        }
    }
    m
}

/// Fills halos for the tiles of one mosaic through its computed contacts.
#[derive(Debug)]
pub struct HaloStitcher<'a> {
    mosaic: &'a Mosaic,
    links: Vec<[Vec<Link>; 4]>,
    options: HaloOptions,
}

impl<'a> HaloStitcher<'a> {
    pub fn new(mosaic: &'a Mosaic) -> Self {
        Self::with_options(mosaic, HaloOptions::default())
    }

    /// Uses the contacts stored by [`Mosaic::compute_topology`]; a mosaic
    /// without contacts fills every halo with the fill value.
    pub fn with_options(mosaic: &'a Mosaic, options: HaloOptions) -> Self {
        let mut links: Vec<[Vec<Link>; 4]> =
            (0..mosaic.len()).map(|_| Default::default()).collect();
        for c in mosaic.contacts() {
            links[c.tile_a][c.side_a.index()].push(Link::from_a(c));
            links[c.tile_b][c.side_b.index()].push(Link::from_b(c));
        }
        Self {
            mosaic,
            links,
            options,
        }
    }

    fn extent(&self, tile: usize, staggering: Staggering) -> (usize, usize) {
        let m = &self.mosaic.tiles()[tile];
        staggering.extent(m.nx(), m.ny())
    }

    fn check_fields<F: AsRef<[f64]>>(
        &self,
        fields: &[F],
        staggering: Staggering,
    ) -> Result<(), MosaicError> {
        if fields.len() != self.mosaic.len() {
            return Err(MosaicError::ShapeMismatch {
                tile: self.mosaic.name().to_string(),
                what: "tile fields",
                expected: self.mosaic.len(),
                found: fields.len(),
            });
        }
        for (t, f) in fields.iter().enumerate() {
            let (ni, nj) = self.extent(t, staggering);
            if f.as_ref().len() != ni * nj {
                return Err(MosaicError::ShapeMismatch {
                    tile: self.mosaic.tiles()[t].tile().to_string(),
                    what: "field",
                    expected: ni * nj,
                    found: f.as_ref().len(),
                });
            }
        }
        Ok(())
    }

    /// Every neighbour must be at least `halo` deep behind its contact side.
    fn check_depth(
        &self,
        tile: usize,
        halo: usize,
        staggering: Staggering,
    ) -> Result<(), MosaicError> {
        for link in self.links[tile].iter().flatten() {
            let nb = &self.mosaic.tiles()[link.neighbor];
            let depth = if link.neighbor_side.runs_along_i() { nb.ny() } else { nb.nx() };
            // Corner data skips the shared row, so one fewer ring is available.
            let usable = match staggering {
                Staggering::Center => depth,
                Staggering::Corner => depth.saturating_sub(1),
            };
            if halo > usable {
                return Err(MosaicError::HaloTooWide {
                    tile: self.mosaic.tiles()[tile].tile().to_string(),
                    neighbor: nb.tile().to_string(),
                    halo,
                    depth: usable,
                });
            }
        }
        Ok(())
    }

    /// Position in the neighbour reached by stepping out of `tile` through `side`.
    fn cross(
        &self,
        tile: usize,
        side: Side,
        i: isize,
        j: isize,
        staggering: Staggering,
    ) -> Option<(Link, isize, isize)> {
        let (ni, nj) = self.extent(tile, staggering);
        let (ni, nj) = (ni as isize, nj as isize);
        let (along, depth, along_len) = match side {
            Side::South => (i, -j - 1, ni),
            Side::North => (i, j - nj, ni),
            Side::West => (j, -i - 1, nj),
            Side::East => (j, i - ni, nj),
        };
        let clamped = along.clamp(0, along_len - 1);
        let link = *self.links[tile][side.index()]
            .iter()
            .find(|l| l.covers(clamped, staggering))?;
        let (nbi, nbj) = self.extent(link.neighbor, staggering);
        let (nbi, nbj) = (nbi as isize, nbj as isize);
        let nb_along = link.map_along(along, staggering);
        let step_in = match staggering {
            Staggering::Center => depth,
            Staggering::Corner => depth + 1,
        };
        let (ti, tj) = match link.neighbor_side {
            Side::South => (nb_along, step_in),
            Side::North => (nb_along, nbj - 1 - step_in),
            Side::West => (step_in, nb_along),
            Side::East => (nbi - 1 - step_in, nb_along),
        };
        Some((link, ti, tj))
    }

    fn resolve(
        &self,
        tile: usize,
        i: isize,
        j: isize,
        staggering: Staggering,
        hops: usize,
    ) -> Option<Resolved> {
        let (ni, nj) = self.extent(tile, staggering);
        if i >= 0 && j >= 0 && (i as usize) < ni && (j as usize) < nj {
            return Some(Resolved {
                tile,
                i: i as usize,
                j: j as usize,
                transform: IDENTITY,
            });
        }
        if hops == 0 {
            return None;
        }
        let mut sides = Vec::with_capacity(2);
        if j < 0 {
            sides.push(Side::South);
        } else if j as usize >= nj {
            sides.push(Side::North);
        }
        if i < 0 {
            sides.push(Side::West);
        } else if i as usize >= ni {
            sides.push(Side::East);
        }
        sides.into_iter().find_map(|side| {
            let (link, ti, tj) = self.cross(tile, side, i, j, staggering)?;
            let inner = self.resolve(link.neighbor, ti, tj, staggering, hops - 1)?;
            Some(Resolved {
                transform: compose(inner.transform, link.transform),
                ..inner
            })
        })
    }

    fn tile_index(&self, tile: &str) -> Result<usize, MosaicError> {
        self.mosaic
            .tile_index(tile)
            .ok_or_else(|| MosaicError::UnknownTile(tile.to_string()))
    }

    /// Pad `tile`'s entry of `fields` with `halo` rings taken from its
    /// neighbours. `fields` holds one array per mosaic tile, in mosaic order.
    pub fn extend<F: AsRef<[f64]>>(
        &self,
        tile: &str,
        fields: &[F],
        halo: usize,
        staggering: Staggering,
    ) -> Result<HaloField, MosaicError> {
        let t = self.tile_index(tile)?;
        self.check_fields(fields, staggering)?;
        self.check_depth(t, halo, staggering)?;
        let (ni, nj) = self.extent(t, staggering);
        let h = halo as isize;
        let (pi, pj) = (ni + 2 * halo, nj + 2 * halo);
        let mut data = Vec::with_capacity(pi * pj);
        let mut filled = 0usize;
        for j in -h..(nj as isize + h) {
            for i in -h..(ni as isize + h) {
                match self.resolve(t, i, j, staggering, MAX_HOPS) {
                    Some(r) => {
                        let (rni, _) = self.extent(r.tile, staggering);
                        data.push(fields[r.tile].as_ref()[r.j * rni + r.i]);
                    }
                    None => {
                        filled += 1;
                        data.push(self.options.fill_value);
                    }
                }
            }
        }
        debug!("halo {halo} on tile `{tile}`: {filled} of {} padded values filled", pi * pj);
        Ok(HaloField {
            tile: tile.to_string(),
            halo,
            staggering,
            ni: pi,
            nj: pj,
            data,
        })
    }

    /// Pad a pair of fields that transform together across rotated contacts.
    ///
    /// For [`PairKind::Vector`] the components `(x, y)` along the source
    /// tile's `i`/`j` axes are re-expressed along this tile's axes, which
    /// swaps and negates them as the orientation requires. For
    /// [`PairKind::Magnitude`] they are only swapped.
    pub fn extend_pair<F: AsRef<[f64]>>(
        &self,
        tile: &str,
        xs: &[F],
        ys: &[F],
        halo: usize,
        staggering: Staggering,
        kind: PairKind,
    ) -> Result<(HaloField, HaloField), MosaicError> {
        let t = self.tile_index(tile)?;
        self.check_fields(xs, staggering)?;
        self.check_fields(ys, staggering)?;
        self.check_depth(t, halo, staggering)?;
        let (ni, nj) = self.extent(t, staggering);
        let h = halo as isize;
        let (pi, pj) = (ni + 2 * halo, nj + 2 * halo);
        let mut out_x = Vec::with_capacity(pi * pj);
        let mut out_y = Vec::with_capacity(pi * pj);
        for j in -h..(nj as isize + h) {
            for i in -h..(ni as isize + h) {
                let Some(r) = self.resolve(t, i, j, staggering, MAX_HOPS) else {
                    out_x.push(self.options.fill_value);
                    out_y.push(self.options.fill_value);
                    continue;
                };
                let (rni, _) = self.extent(r.tile, staggering);
                let k = r.j * rni + r.i;
                let (u, v) = (xs[r.tile].as_ref()[k], ys[r.tile].as_ref()[k]);
                // Offsets map here -> source by `m`; components map back by its transpose.
                let m = r.transform;
                let (a, b) = match kind {
                    PairKind::Vector => (
                        m[0][0] as f64 * u + m[1][0] as f64 * v,
                        m[0][1] as f64 * u + m[1][1] as f64 * v,
                    ),
                    PairKind::Magnitude => (
                        m[0][0].abs() as f64 * u + m[1][0].abs() as f64 * v,
                        m[0][1].abs() as f64 * u + m[1][1].abs() as f64 * v,
                    ),
                };
                out_x.push(a);
                out_y.push(b);
            }
        }
        let field = |data| HaloField {
            tile: tile.to_string(),
            halo,
            staggering,
            ni: pi,
            nj: pj,
            data,
        };
        Ok((field(out_x), field(out_y)))
    }
}
