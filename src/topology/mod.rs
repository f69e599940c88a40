//! Tile adjacency for mosaics.
//!
//! Contacts are derived purely from boundary geometry: no face numbering or
//! neighbour table is assumed, so cubed spheres, nested regional tiles and
//! periodic single tiles go through the same code path.
//!
//! - [`side`]: boundary naming and corner addressing
//! - [`contact`]: the [`Contact`] record and its orientation
//! - [`align`]: segment matching
//! - [`validation`]: completeness checks per [`MosaicShape`](crate::mesh::MosaicShape)

pub mod align;
pub mod contact;
pub mod side;
pub mod validation;

use log::info;
use serde::{Deserialize, Serialize};

use crate::mesh::Mosaic;
use crate::mosaic_error::MosaicError;

pub use contact::{Contact, Orientation};
pub use side::Side;
pub use validation::{SideCoverage, side_coverage, validate_contacts};

/// Options for [`build_topology`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyOptions {
    /// Matching tolerance as a fraction of the shortest boundary edge of the
    /// two tiles compared. Must lie in `(0, 0.5)`.
    pub relative_tolerance: f64,
    /// Check the contacts against the mosaic's declared shape.
    pub validate: bool,
}

impl Default for TopologyOptions {
    fn default() -> Self {
        Self {
            relative_tolerance: 1e-4,
            validate: true,
        }
    }
}

impl TopologyOptions {
    pub fn check(&self) -> Result<(), MosaicError> {
        let t = self.relative_tolerance;
        if !(t > 0.0 && t < 0.5) {
            return Err(MosaicError::InvalidOptions {
                name: "relative_tolerance",
                reason: format!("{t} is outside (0, 0.5)"),
            });
        }
        Ok(())
    }
}

/// Discover every contact between the boundary segments of `mosaic`.
///
/// Segments are compared pairwise (including two sides of the same tile, for
/// periodic wrap); runs shorter than one cell edge and segments collapsed to
/// a point are ignored. With `options.validate`, the result is checked
/// against the mosaic's shape and a [`MosaicError::TopologyInconsistency`] is
/// returned for missing or overlapping matches.
pub fn build_topology(
    mosaic: &Mosaic,
    options: &TopologyOptions,
) -> Result<Vec<Contact>, MosaicError> {
    options.check()?;
    let contacts = align::discover_contacts(mosaic, options.relative_tolerance);
    if options.validate {
        validate_contacts(mosaic, &contacts)?;
    }
    info!(
        "mosaic `{}`: {} tiles, {} contacts",
        mosaic.name(),
        mosaic.len(),
        contacts.len()
    );
    Ok(contacts)
}
