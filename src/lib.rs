#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mosaic-xgrid
//!
//! mosaic-xgrid builds the geometric plumbing that couples gridded climate
//! model components on the sphere: multi-tile mosaics, the contacts between
//! their tiles, halo-extended fields, and conservative exchange grids between
//! two unrelated mosaics.
//!
//! ## Features
//! - Curvilinear [`Mesh`](crate::mesh::Mesh) tiles with optional masks and
//!   spherical-excess cell areas
//! - Tile contacts discovered from boundary geometry, with orientation and
//!   index transforms ([`topology`])
//! - Halo extension across contacts for scalar and vector fields ([`halo`])
//! - Exchange grids by great-circle polygon clipping, parallel over target
//!   rows with the `rayon` feature ([`xgrid`])
//! - First- and second-order conservative remapping weights ([`remap`])
//! - Atmosphere/ocean/land coupler grids ([`coupler`])
//!
//! ## Conventions
//!
//! Angles are radians. Corner arrays are row-major with `(ny+1)` rows of
//! `(nx+1)` points; cell arrays hold `ny` rows of `nx`. Areas are on the unit
//! sphere unless a radius is given in [`XgridOptions`](crate::xgrid::XgridOptions).
//!
//! ## Determinism
//!
//! Exchange grids are sorted by target tile, target `j`, target `i`, then
//! source tile, `j`, `i`, so serial and parallel builds produce identical
//! output.
//!
//! ## Logging
//!
//! The crate logs through the `log` facade and never installs a logger.

pub mod coupler;
pub mod debug_invariants;
pub mod geometry;
pub mod halo;
pub mod mesh;
pub mod meshgen;
pub mod mosaic_error;
pub mod remap;
pub mod topology;
pub mod xgrid;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used types:
pub mod prelude {
    pub use crate::coupler::{CouplerExchange, ocean_mask_from_depth};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::geometry::{LonLatBox, SphericalPolygon};
    pub use crate::halo::{HaloField, HaloOptions, HaloStitcher, PairKind, Staggering};
    pub use crate::mesh::{Mesh, Mosaic, MosaicShape, TileMasks};
    pub use crate::mosaic_error::MosaicError;
    pub use crate::remap::{Normalization, RemapWeights};
    pub use crate::topology::{Contact, Orientation, Side, TopologyOptions, build_topology};
    pub use crate::xgrid::{
        ConservationSummary, ExchangeCell, ExchangeGrid, XgridMasks, XgridOptions, XgridRecord,
        build_exchange_grid,
    };
}
