//! Atmosphere/ocean/land exchange grids for a coupled model.
//!
//! The land grid shares the ocean geometry: every ocean-model cell is either
//! wet (ocean mask active) or dry, and dry cells exchange with the atmosphere
//! through the land grid. Both grids are built with the same options, so
//! together they partition the unmasked atmosphere x ocean exchange grid.

use log::info;

use crate::mesh::{Mosaic, TileMasks};
use crate::mosaic_error::MosaicError;
use crate::xgrid::{ExchangeGrid, XgridMasks, XgridOptions, build_exchange_grid};

/// Wet/dry mask from a bathymetry field: `1.0` where `depth > sea_level`.
pub fn ocean_mask_from_depth(depth: &[f64], sea_level: f64) -> Vec<f64> {
    depth
        .iter()
        .map(|&d| if d > sea_level { 1.0 } else { 0.0 })
        .collect()
}

/// Exchange grids from the atmosphere to the wet and dry parts of the ocean
/// geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct CouplerExchange {
    pub atm_ocn: ExchangeGrid,
    pub atm_lnd: ExchangeGrid,
}

impl CouplerExchange {
    /// Build both grids. Tiles of `ocn` absent from `ocean_mask` fall back to
    /// the mesh's own mask, or all-wet when it has none.
    pub fn build(
        atm: &Mosaic,
        ocn: &Mosaic,
        ocean_mask: &TileMasks,
        options: &XgridOptions,
    ) -> Result<Self, MosaicError> {
        options.check()?;
        let wet = ocn.resolve_masks(Some(ocean_mask))?;
        let land_mask: TileMasks = ocn
            .tiles()
            .iter()
            .zip(&wet)
            .map(|(mesh, mask)| {
                let dry = match mask {
                    Some(m) => m
                        .iter()
                        .map(|&v| if v > options.mask_threshold { 0.0 } else { 1.0 })
                        .collect(),
                    None => vec![0.0; mesh.num_cells()],
                };
                (mesh.tile().to_string(), dry)
            })
            .collect();

        let atm_ocn = build_exchange_grid(
            atm,
            ocn,
            options,
            XgridMasks {
                source: None,
                target: Some(ocean_mask),
            },
        )?;
        let atm_lnd = build_exchange_grid(
            atm,
            ocn,
            options,
            XgridMasks {
                source: None,
                target: Some(&land_mask),
            },
        )?;
        info!(
            "coupler `{}` x `{}`: {} ocean and {} land exchange cells",
            atm.name(),
            ocn.name(),
            atm_ocn.len(),
            atm_lnd.len()
        );
        Ok(Self { atm_ocn, atm_lnd })
    }

    /// Wet fraction of every ocean-model cell, one row-major array per tile.
    pub fn ocean_fraction(&self, ocn: &Mosaic) -> Result<Vec<Vec<f64>>, MosaicError> {
        self.atm_ocn.coverage(ocn)
    }

    /// Land fraction of every atmosphere cell, one row-major array per tile.
    pub fn land_fraction(&self, atm: &Mosaic) -> Result<Vec<Vec<f64>>, MosaicError> {
        self.atm_lnd.swapped().coverage(atm)
    }
}
