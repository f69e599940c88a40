//! Exchange grids: the overlaps between the cells of two mosaics.
//!
//! [`build_exchange_grid`] intersects every active target cell with the
//! active source cells it can touch and records one [`ExchangeCell`] per
//! overlap of non-negligible area. The result is topology independent: the
//! two mosaics need not share tiles, resolution or orientation.
//!
//! Masking convention: a pair whose source or target cell is inactive is
//! omitted. Coverage fractions, which need the omitted area, are derived
//! afterwards with [`ExchangeGrid::coverage`].

pub mod bucket;
pub mod builder;
pub mod conservation;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::debug_invariants::DebugInvariants;
use crate::mesh::{DEFAULT_MASK_THRESHOLD, TileMasks};
use crate::mosaic_error::MosaicError;

pub use builder::build_exchange_grid;
pub use conservation::ConservationSummary;

/// Options for [`build_exchange_grid`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XgridOptions {
    /// Conservative order, 1 or 2. Order 2 also records overlap centroids.
    pub order: u8,
    /// Overlaps smaller than this fraction of the smaller cell are dropped.
    /// Rounding-width slivers along shared edges are dropped regardless.
    pub min_area_ratio: f64,
    /// Mask values above this are active.
    pub mask_threshold: f64,
    /// Most candidate source cells one target cell may examine.
    pub max_candidates_per_cell: usize,
    /// Average source cells per bucket of the search index.
    pub bucket_density: f64,
    /// Sphere radius; areas are reported in `radius²` units.
    pub radius: f64,
}

impl Default for XgridOptions {
    fn default() -> Self {
        Self {
            order: 1,
            min_area_ratio: 1e-12,
            mask_threshold: DEFAULT_MASK_THRESHOLD,
            max_candidates_per_cell: 100_000,
            bucket_density: 2.0,
            radius: 1.0,
        }
    }
}

impl XgridOptions {
    pub fn check(&self) -> Result<(), MosaicError> {
        if !matches!(self.order, 1 | 2) {
            return Err(MosaicError::InvalidOrder(self.order));
        }
        if !(0.0..1.0).contains(&self.min_area_ratio) {
            return Err(MosaicError::InvalidOptions {
                name: "min_area_ratio",
                reason: format!("{} is outside [0, 1)", self.min_area_ratio),
            });
        }
        if !(self.bucket_density > 0.0 && self.bucket_density.is_finite()) {
            return Err(MosaicError::InvalidOptions {
                name: "bucket_density",
                reason: format!("{} is not a positive number", self.bucket_density),
            });
        }
        if !(self.radius > 0.0 && self.radius.is_finite()) {
            return Err(MosaicError::InvalidOptions {
                name: "radius",
                reason: format!("{} is not a positive number", self.radius),
            });
        }
        if self.max_candidates_per_cell == 0 {
            return Err(MosaicError::InvalidOptions {
                name: "max_candidates_per_cell",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Optional per-tile masks overriding each mesh's own mask.
#[derive(Debug, Clone, Copy, Default)]
pub struct XgridMasks<'a> {
    pub source: Option<&'a TileMasks>,
    pub target: Option<&'a TileMasks>,
}

/// One overlap between a source cell and a target cell.
///
/// Tiles are mosaic indices; [`ExchangeGrid::source_tiles`] and
/// [`ExchangeGrid::target_tiles`] map them back to ids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeCell {
    pub src_tile: usize,
    pub src_i: usize,
    pub src_j: usize,
    pub tgt_tile: usize,
    pub tgt_i: usize,
    pub tgt_j: usize,
    pub area: f64,
    /// Overlap centroid `(lon, lat)`, recorded for order 2.
    pub centroid: Option<(f64, f64)>,
}

impl ExchangeCell {
    /// Output ordering key: target tile, j, i, then source tile, j, i.
    #[inline]
    pub fn sort_key(&self) -> (usize, usize, usize, usize, usize, usize) {
        (self.tgt_tile, self.tgt_j, self.tgt_i, self.src_tile, self.src_j, self.src_i)
    }
}

/// Flat persistence record: source tile id, flattened source index,
/// flattened target index (`j * nx + i`) and area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XgridRecord {
    pub src_tile: String,
    pub src_ij: usize,
    pub tgt_ij: usize,
    pub area: f64,
}

/// The overlaps between two mosaics, sorted by [`ExchangeCell::sort_key`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeGrid {
    pub(crate) cells: Vec<ExchangeCell>,
    pub(crate) source_tiles: Vec<String>,
    pub(crate) source_nx: Vec<usize>,
    pub(crate) target_tiles: Vec<String>,
    pub(crate) target_nx: Vec<usize>,
    pub(crate) order: u8,
    pub(crate) radius: f64,
}

impl ExchangeGrid {
    #[inline]
    pub fn cells(&self) -> &[ExchangeCell] {
        &self.cells
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExchangeCell> {
        self.cells.iter()
    }

    #[inline]
    pub fn source_tiles(&self) -> &[String] {
        &self.source_tiles
    }

    #[inline]
    pub fn target_tiles(&self) -> &[String] {
        &self.target_tiles
    }

    #[inline]
    pub fn order(&self) -> u8 {
        self.order
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Sum of all overlap areas.
    pub fn total_area(&self) -> f64 {
        self.cells.iter().map(|c| c.area).sum()
    }

    /// The same overlaps with source and target roles exchanged, re-sorted.
    pub fn swapped(&self) -> ExchangeGrid {
        let mut cells: Vec<ExchangeCell> = self
            .cells
            .iter()
            .map(|c| ExchangeCell {
                src_tile: c.tgt_tile,
                src_i: c.tgt_i,
                src_j: c.tgt_j,
                tgt_tile: c.src_tile,
                tgt_i: c.src_i,
                tgt_j: c.src_j,
                ..*c
            })
            .collect();
        cells.sort_by_key(ExchangeCell::sort_key);
        ExchangeGrid {
            cells,
            source_tiles: self.target_tiles.clone(),
            source_nx: self.target_nx.clone(),
            target_tiles: self.source_tiles.clone(),
            target_nx: self.source_nx.clone(),
            order: self.order,
            radius: self.radius,
        }
    }

    /// Persistence records grouped by target tile id, in output order.
    pub fn records_by_target_tile(&self) -> BTreeMap<String, Vec<XgridRecord>> {
        let mut out: BTreeMap<String, Vec<XgridRecord>> = BTreeMap::new();
        for c in &self.cells {
            out.entry(self.target_tiles[c.tgt_tile].clone())
                .or_default()
                .push(XgridRecord {
                    src_tile: self.source_tiles[c.src_tile].clone(),
                    src_ij: c.src_j * self.source_nx[c.src_tile] + c.src_i,
                    tgt_ij: c.tgt_j * self.target_nx[c.tgt_tile] + c.tgt_i,
                    area: c.area,
                });
        }
        out
    }
}

impl<'a> IntoIterator for &'a ExchangeGrid {
    type Item = &'a ExchangeCell;
    type IntoIter = std::slice::Iter<'a, ExchangeCell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}

impl DebugInvariants for ExchangeGrid {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "ExchangeGrid");
    }

    fn validate_invariants(&self) -> Result<(), MosaicError> {
        let bad = MosaicError::InvariantViolation;
        for w in self.cells.windows(2) {
            if w[0].sort_key() >= w[1].sort_key() {
                return Err(bad(format!("cells out of order at {:?}", w[1].sort_key())));
            }
        }
        for c in &self.cells {
            if !(c.area > 0.0 && c.area.is_finite()) {
                return Err(bad(format!("non-positive area {} at {:?}", c.area, c.sort_key())));
            }
            if c.src_tile >= self.source_tiles.len() || c.tgt_tile >= self.target_tiles.len() {
                return Err(bad(format!("tile index out of range at {:?}", c.sort_key())));
            }
            if (self.order == 2) != c.centroid.is_some() {
                return Err(bad(format!(
                    "centroid presence disagrees with order at {:?}",
                    c.sort_key()
                )));
            }
        }
        Ok(())
    }
}
