//! MosaicError: unified error type for mosaic-xgrid public APIs
//!
//! Every fallible operation in the crate returns this type. Variants carry enough
//! identification (tile id, cell index, boundary side) for a caller to repair or
//! regenerate the offending mesh.

use thiserror::Error;

use crate::topology::side::Side;

/// Unified error type for mosaic, topology, halo and exchange-grid operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MosaicError {
    /// A cell or corner index lies outside the mesh.
    #[error("index ({i}, {j}) out of range for tile `{tile}` with extent {nx}x{ny}")]
    IndexOutOfRange {
        tile: String,
        i: usize,
        j: usize,
        nx: usize,
        ny: usize,
    },
    /// An array does not have the length implied by the mesh dimensions.
    #[error(
        "shape mismatch for {what} on tile `{tile}`: expected {expected} values, found {found}"
    )]
    ShapeMismatch {
        tile: String,
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// The mosaic has no tile with this id.
    #[error("unknown tile `{0}`")]
    UnknownTile(String),
    /// Two tiles in one mosaic share an id.
    #[error("duplicate tile id `{0}`")]
    DuplicateTile(String),
    /// Malformed mosaic geometry detected while discovering contacts.
    #[error("topology inconsistency on tile `{tile}`{}: {reason}", side_suffix(.side))]
    TopologyInconsistency {
        tile: String,
        side: Option<Side>,
        reason: String,
    },
    /// A cell is unusable for overlap computation.
    #[error("degenerate geometry on tile `{tile}` cell ({i}, {j}): {reason}")]
    DegenerateGeometry {
        tile: String,
        i: usize,
        j: usize,
        reason: String,
    },
    /// A conservation check fell outside tolerance. Reported as a diagnostic.
    #[error(
        "conservation tolerance exceeded on tile `{tile}` cell ({i}, {j}): covered {covered:.6e} of {expected:.6e} (relative error {relative_error:.3e})"
    )]
    ToleranceExceeded {
        tile: String,
        i: usize,
        j: usize,
        covered: f64,
        expected: f64,
        relative_error: f64,
    },
    /// Interpolation order other than 1 or 2.
    #[error("conservative order must be 1 or 2, got {0}")]
    InvalidOrder(u8),
    /// An option value is outside its accepted range.
    #[error("invalid option `{name}`: {reason}")]
    InvalidOptions { name: &'static str, reason: String },
    /// A target cell's candidate search exceeded the configured budget.
    #[error(
        "candidate search on tile `{tile}` cell ({i}, {j}) exceeded budget: {candidates} > {budget}"
    )]
    SearchBudgetExceeded {
        tile: String,
        i: usize,
        j: usize,
        candidates: usize,
        budget: usize,
    },
    /// The requested halo is wider than the neighbor tile can supply.
    #[error(
        "halo width {halo} too wide for tile `{tile}`: neighbor `{neighbor}` supplies {depth} rings"
    )]
    HaloTooWide {
        tile: String,
        neighbor: String,
        halo: usize,
        depth: usize,
    },
    /// A structure failed its internal consistency check.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    /// Order-2 remapping needs exchange cells built with centroids.
    #[error("exchange grid has no overlap centroids; rebuild with order 2")]
    MissingCentroid,
}

fn side_suffix(side: &Option<Side>) -> String {
    side.map(|s| format!(" ({s} side)")).unwrap_or_default()
}
