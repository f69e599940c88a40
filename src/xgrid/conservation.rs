//! Coverage and conservation diagnostics for exchange grids.

use log::{debug, warn};

use crate::mesh::Mosaic;
use crate::mosaic_error::MosaicError;
use crate::xgrid::ExchangeGrid;

/// Outcome of [`ExchangeGrid::conservation_report`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConservationSummary {
    /// Target cells compared against their true area.
    pub checked: usize,
    /// Largest relative error seen among checked cells.
    pub max_relative_error: f64,
    /// One [`MosaicError::ToleranceExceeded`] per offending cell.
    pub diagnostics: Vec<MosaicError>,
}

impl ConservationSummary {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl ExchangeGrid {
    fn check_target(&self, target: &Mosaic) -> Result<(), MosaicError> {
        if target.len() != self.target_tiles.len() {
            return Err(MosaicError::ShapeMismatch {
                tile: target.name().to_string(),
                what: "target tiles",
                expected: self.target_tiles.len(),
                found: target.len(),
            });
        }
        for (mesh, id) in target.tiles().iter().zip(&self.target_tiles) {
            if mesh.tile() != id {
                return Err(MosaicError::UnknownTile(mesh.tile().to_string()));
            }
        }
        Ok(())
    }

    /// Summed overlap area per target cell, one row-major array per target tile.
    pub fn covered_area(&self, target: &Mosaic) -> Result<Vec<Vec<f64>>, MosaicError> {
        self.check_target(target)?;
        let mut out: Vec<Vec<f64>> = target
            .tiles()
            .iter()
            .map(|m| vec![0.0; m.num_cells()])
            .collect();
        for c in &self.cells {
            let mesh = &target.tiles()[c.tgt_tile];
            if c.tgt_i >= mesh.nx() || c.tgt_j >= mesh.ny() {
                return Err(MosaicError::IndexOutOfRange {
                    tile: mesh.tile().to_string(),
                    i: c.tgt_i,
                    j: c.tgt_j,
                    nx: mesh.nx(),
                    ny: mesh.ny(),
                });
            }
            out[c.tgt_tile][mesh.flat_index(c.tgt_i, c.tgt_j)] += c.area;
        }
        Ok(out)
    }

    /// Fraction of each target cell covered by overlaps (0 for cells no
    /// active source cell reaches), one row-major array per target tile.
    pub fn coverage(&self, target: &Mosaic) -> Result<Vec<Vec<f64>>, MosaicError> {
        let r2 = self.radius * self.radius;
        let mut covered = self.covered_area(target)?;
        for (frac, mesh) in covered.iter_mut().zip(target.tiles()) {
            for (f, area) in frac.iter_mut().zip(mesh.cell_areas()) {
                *f = if area > 0.0 { *f / (area * r2) } else { 0.0 };
            }
        }
        Ok(covered)
    }

    /// Compare covered area with each target cell's area ([`crate::mesh::Mesh::cell_area`]).
    ///
    /// With `expect_full`, every target cell must be covered to within
    /// `tolerance` (relative). Otherwise only cells that received overlaps
    /// are checked, and only for over-coverage, since masked or partially
    /// covered cells legitimately fall short. Violations are returned as
    /// diagnostics and logged; they never abort.
    pub fn conservation_report(
        &self,
        target: &Mosaic,
        tolerance: f64,
        expect_full: bool,
    ) -> Result<ConservationSummary, MosaicError> {
        let r2 = self.radius * self.radius;
        let covered = self.covered_area(target)?;
        let mut summary = ConservationSummary::default();
        for (mesh, cov) in target.tiles().iter().zip(&covered) {
            for (k, area) in mesh.cell_areas().into_iter().enumerate() {
                let expected = area * r2;
                let got = cov[k];
                if expected <= 0.0 || (!expect_full && got == 0.0) {
                    continue;
                }
                summary.checked += 1;
                let relative_error = (got - expected) / expected;
                let violates = if expect_full {
                    relative_error.abs() > tolerance
                } else {
                    relative_error > tolerance
                };
                summary.max_relative_error = summary.max_relative_error.max(relative_error.abs());
                if violates {
                    let (i, j) = (k % mesh.nx(), k / mesh.nx());
                    let diag = MosaicError::ToleranceExceeded {
                        tile: mesh.tile().to_string(),
                        i,
                        j,
                        covered: got,
                        expected,
                        relative_error,
                    };
                    debug!("{diag}");
                    summary.diagnostics.push(diag);
                }
            }
        }
        if !summary.is_clean() {
            warn!(
                "conservation: {} of {} target cells outside {tolerance:e} (worst {:.3e})",
                summary.diagnostics.len(),
                summary.checked,
                summary.max_relative_error
            );
        }
        Ok(summary)
    }
}
