//! Conservative remapping weights built from an exchange grid.
//!
//! Each exchange cell contributes `area / denominator` of its source value to
//! its target cell. Order 1 uses the source cell mean; order 2 adds the
//! limited source gradient evaluated at the exchange-cell centroid.

pub mod gradient;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geometry::sphere::{Vec3, lonlat_to_xyz};
use crate::mesh::Mosaic;
use crate::mosaic_error::MosaicError;
use crate::xgrid::ExchangeGrid;

pub use gradient::{cell_centroids, source_gradients};

/// What each target cell's weights are divided by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalization {
    /// The target cell's full spherical area; partially covered cells
    /// receive a proportionally smaller value.
    #[default]
    TargetArea,
    /// The area actually covered by exchange cells, so weights of every
    /// reached target cell sum to one.
    CoveredArea,
}

/// One sparse weight.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub src_tile: usize,
    pub src_idx: usize,
    pub tgt_tile: usize,
    pub tgt_idx: usize,
    pub weight: f64,
    /// Exchange-cell centroid relative to the source centroid, in the source
    /// cell's tangent plane. Present for order-2 grids.
    pub offset: Option<[f64; 2]>,
}

/// Sparse conservative weights from source cells to target cells.
#[derive(Clone, Debug)]
pub struct RemapWeights<'a> {
    source: &'a Mosaic,
    target: &'a Mosaic,
    entries: Vec<WeightEntry>,
    normalization: Normalization,
}

impl<'a> RemapWeights<'a> {
    /// Build weights for remapping fields on `source` onto `target`.
    ///
    /// `xgrid` must have been built between these two mosaics.
    pub fn from_exchange_grid(
        xgrid: &ExchangeGrid,
        source: &'a Mosaic,
        target: &'a Mosaic,
        normalization: Normalization,
    ) -> Result<Self, MosaicError> {
        let r2 = xgrid.radius() * xgrid.radius();
        // Also checks the target against the grid.
        let covered = xgrid.covered_area(target)?;
        let denominators: Vec<Vec<f64>> = match normalization {
            Normalization::TargetArea => target
                .tiles()
                .iter()
                .map(|m| m.cell_areas().into_iter().map(|a| a * r2).collect())
                .collect(),
            Normalization::CoveredArea => covered,
        };
        if source.len() != xgrid.source_tiles().len() {
            return Err(MosaicError::ShapeMismatch {
                tile: source.name().to_string(),
                what: "source tiles",
                expected: xgrid.source_tiles().len(),
                found: source.len(),
            });
        }
        for (mesh, id) in source.tiles().iter().zip(xgrid.source_tiles()) {
            if mesh.tile() != id {
                return Err(MosaicError::UnknownTile(mesh.tile().to_string()));
            }
        }

        let centroids: Vec<Vec<Vec3>> = if xgrid.order() == 2 {
            source.tiles().iter().map(cell_centroids).collect()
        } else {
            Vec::new()
        };

        let mut entries = Vec::with_capacity(xgrid.len());
        for c in xgrid {
            let src_mesh = &source.tiles()[c.src_tile];
            let tgt_mesh = &target.tiles()[c.tgt_tile];
            if c.src_i >= src_mesh.nx() || c.src_j >= src_mesh.ny() {
                return Err(MosaicError::IndexOutOfRange {
                    tile: src_mesh.tile().to_string(),
                    i: c.src_i,
                    j: c.src_j,
                    nx: src_mesh.nx(),
                    ny: src_mesh.ny(),
                });
            }
            let src_idx = src_mesh.flat_index(c.src_i, c.src_j);
            let tgt_idx = tgt_mesh.flat_index(c.tgt_i, c.tgt_j);
            let denom = denominators[c.tgt_tile][tgt_idx];
            if !(denom > 0.0) {
                continue;
            }
            let offset = match (xgrid.order(), c.centroid) {
                (2, Some((lon, lat))) => Some(gradient::tangent_offset(
                    centroids[c.src_tile][src_idx],
                    lonlat_to_xyz(lon, lat),
                )),
                (2, None) => return Err(MosaicError::MissingCentroid),
                _ => None,
            };
            entries.push(WeightEntry {
                src_tile: c.src_tile,
                src_idx,
                tgt_tile: c.tgt_tile,
                tgt_idx,
                weight: c.area / denom,
                offset,
            });
        }
        debug!(
            "remap `{}` -> `{}`: {} weights ({normalization:?})",
            source.name(),
            target.name(),
            entries.len()
        );
        Ok(Self {
            source,
            target,
            entries,
            normalization,
        })
    }

    #[inline]
    pub fn entries(&self) -> &[WeightEntry] {
        &self.entries
    }

    #[inline]
    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Sum of weights per target cell, one row-major array per target tile.
    pub fn weight_sums(&self) -> Vec<Vec<f64>> {
        let mut out = self.zero_target();
        for e in &self.entries {
            out[e.tgt_tile][e.tgt_idx] += e.weight;
        }
        out
    }

    fn zero_target(&self) -> Vec<Vec<f64>> {
        self.target.tiles().iter().map(|m| vec![0.0; m.num_cells()]).collect()
    }

    fn check_source_fields<F: AsRef<[f64]>>(&self, fields: &[F]) -> Result<(), MosaicError> {
        if fields.len() != self.source.len() {
            return Err(MosaicError::ShapeMismatch {
                tile: self.source.name().to_string(),
                what: "tile fields",
                expected: self.source.len(),
                found: fields.len(),
            });
        }
        for (mesh, f) in self.source.tiles().iter().zip(fields) {
            mesh.check_cell_array("field", f.as_ref().len())?;
        }
        Ok(())
    }

    /// First-order remap: area-weighted average of source cell values.
    ///
    /// Target cells no exchange cell reaches are left at 0.
    pub fn remap_order1<F: AsRef<[f64]>>(
        &self,
        fields: &[F],
    ) -> Result<Vec<Vec<f64>>, MosaicError> {
        self.check_source_fields(fields)?;
        let mut out = self.zero_target();
        for e in &self.entries {
            out[e.tgt_tile][e.tgt_idx] += e.weight * fields[e.src_tile].as_ref()[e.src_idx];
        }
        Ok(out)
    }

    /// Second-order remap: each exchange cell samples the limited linear
    /// reconstruction of its source cell at the exchange-cell centroid.
    pub fn remap_order2<F: AsRef<[f64]>>(
        &self,
        fields: &[F],
    ) -> Result<Vec<Vec<f64>>, MosaicError> {
        self.check_source_fields(fields)?;
        let grads = self
            .source
            .tiles()
            .iter()
            .zip(fields)
            .map(|(mesh, f)| source_gradients(mesh, f.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let mut out = self.zero_target();
        for e in &self.entries {
            let [dx, dy] = e.offset.ok_or(MosaicError::MissingCentroid)?;
            let g = grads[e.src_tile][e.src_idx];
            let value = fields[e.src_tile].as_ref()[e.src_idx] + g[0] * dx + g[1] * dy;
            out[e.tgt_tile][e.tgt_idx] += e.weight * value;
        }
        Ok(out)
    }
}

/// Area-weighted integral of per-tile fields over a mosaic, in `radius²` units.
pub fn integral<F: AsRef<[f64]>>(
    mosaic: &Mosaic,
    fields: &[F],
    radius: f64,
) -> Result<f64, MosaicError> {
    if fields.len() != mosaic.len() {
        return Err(MosaicError::ShapeMismatch {
            tile: mosaic.name().to_string(),
            what: "tile fields",
            expected: mosaic.len(),
            found: fields.len(),
        });
    }
    let mut total = 0.0;
    for (mesh, f) in mosaic.tiles().iter().zip(fields) {
        mesh.check_cell_array("field", f.as_ref().len())?;
        total += mesh
            .cell_areas()
            .iter()
            .zip(f.as_ref())
            .map(|(a, v)| a * v)
            .sum::<f64>();
    }
    Ok(total * radius * radius)
}
