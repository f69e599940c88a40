//! Topology validation helpers.

use log::{debug, warn};

use crate::mesh::{Mosaic, MosaicShape};
use crate::mosaic_error::MosaicError;
use crate::topology::contact::Contact;
use crate::topology::side::Side;

/// Coverage of one tile side by contacts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SideCoverage {
    /// No contact touches the side.
    Unmatched,
    /// Contacts cover part of the side.
    Partial,
    /// Contacts cover every cell edge of the side.
    Full,
}

/// Edge-count coverage of `(tile, side)`, or an error when two contacts claim
/// the same cell edge.
pub fn side_coverage(
    mosaic: &Mosaic,
    contacts: &[Contact],
    tile: usize,
    side: Side,
) -> Result<SideCoverage, MosaicError> {
    let mesh = &mosaic.tiles()[tile];
    let len = side.cell_len(mesh.nx(), mesh.ny());
    let mut claimed = vec![false; len];
    let mut any = false;
    for c in contacts {
        let ranges = [
            (c.tile_a == tile && c.side_a == side).then(|| (c.start_a, c.end_a)),
            (c.tile_b == tile && c.side_b == side)
                .then(|| (c.start_b.min(c.end_b), c.start_b.max(c.end_b))),
        ];
        for (lo, hi) in ranges.into_iter().flatten() {
            any = true;
            for slot in &mut claimed[lo..hi] {
                if *slot {
                    return Err(MosaicError::TopologyInconsistency {
                        tile: mesh.tile().to_string(),
                        side: Some(side),
                        reason: format!("overlapping contacts on boundary edges {lo}..{hi}"),
                    });
                }
                *slot = true;
            }
        }
    }
    Ok(if !any {
        SideCoverage::Unmatched
    } else if claimed.iter().all(|&c| c) {
        SideCoverage::Full
    } else {
        SideCoverage::Partial
    })
}

/// Check discovered contacts against the mosaic's declared shape.
///
/// `CubedSphere` mosaics need exactly six tiles with every side fully matched
/// unless declared open. Other shapes only reject overlapping contacts; their
/// unmatched sides are logged.
pub fn validate_contacts(mosaic: &Mosaic, contacts: &[Contact]) -> Result<(), MosaicError> {
    if mosaic.shape() == MosaicShape::CubedSphere && mosaic.len() != 6 {
        return Err(MosaicError::TopologyInconsistency {
            tile: mosaic.name().to_string(),
            side: None,
            reason: format!("cubed-sphere mosaic has {} tiles, expected 6", mosaic.len()),
        });
    }
    for (t, mesh) in mosaic.tiles().iter().enumerate() {
        for side in Side::ALL {
            let coverage = side_coverage(mosaic, contacts, t, side)?;
            if coverage == SideCoverage::Full || mosaic.is_open_boundary(t, side) {
                continue;
            }
            match mosaic.shape() {
                MosaicShape::CubedSphere => {
                    let reason = match coverage {
                        SideCoverage::Partial => "side only partially matched".to_string(),
                        _ => "no neighbouring segment found".to_string(),
                    };
                    return Err(MosaicError::TopologyInconsistency {
                        tile: mesh.tile().to_string(),
                        side: Some(side),
                        reason,
                    });
                }
                MosaicShape::Regional => {
                    debug!(
                        "tile `{}` {side} side is a physical boundary ({coverage:?})",
                        mesh.tile()
                    );
                }
                MosaicShape::Generic => {
                    warn!("tile `{}` {side} side has no full contact ({coverage:?})", mesh.tile());
                }
            }
        }
    }
    Ok(())
}
