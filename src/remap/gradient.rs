//! Limited cell gradients for second-order conservative remapping.
//!
//! Gradients live in each cell's local tangent plane (east, north), in field
//! units per radian of arc. Differences of neighbouring centroids along the
//! two logical axes give the raw gradient, which is then scaled down so the
//! linear reconstruction at every cell corner stays within the range spanned
//! by the cell and its neighbours.

use itertools::iproduct;

use crate::geometry::sphere::{Vec3, cross, dot, normalize};
use crate::mesh::{DEFAULT_MASK_THRESHOLD, Mesh};
use crate::mosaic_error::MosaicError;

/// Local `(east, north)` unit vectors at `c`; near a pole east is taken
/// along +y so the frame stays defined.
pub(crate) fn tangent_frame(c: Vec3) -> (Vec3, Vec3) {
    let east = normalize(cross([0.0, 0.0, 1.0], c)).unwrap_or([0.0, 1.0, 0.0]);
    let north = cross(c, east);
    (east, north)
}

/// Displacement of `p` from `c` in `c`'s tangent plane (radians of arc, to
/// first order).
#[inline]
pub(crate) fn tangent_offset(c: Vec3, p: Vec3) -> [f64; 2] {
    let (east, north) = tangent_frame(c);
    [dot(p, east), dot(p, north)]
}

/// Area-weighted centroid of every cell, row-major.
pub fn cell_centroids(mesh: &Mesh) -> Vec<Vec3> {
    iproduct!(0..mesh.ny(), 0..mesh.nx())
        .map(|(j, i)| {
            let poly = mesh.cell_polygon_unchecked(i, j);
            poly.centroid().unwrap_or_else(|| mesh.corner_xyz(i, j))
        })
        .collect()
}

/// Displacement and field difference along one logical axis: centered when
/// both neighbours are usable, one-sided when only one is.
fn axis_difference(
    c: Vec3,
    f0: f64,
    lower: Option<(Vec3, f64)>,
    upper: Option<(Vec3, f64)>,
) -> Option<([f64; 2], f64)> {
    let origin = ([0.0, 0.0], f0);
    let at = |(p, f): (Vec3, f64)| (tangent_offset(c, p), f);
    let (lo, hi) = match (lower.map(at), upper.map(at)) {
        (Some(lo), Some(hi)) => (lo, hi),
        (Some(lo), None) => (lo, origin),
        (None, Some(hi)) => (origin, hi),
        (None, None) => return None,
    };
    Some(([hi.0[0] - lo.0[0], hi.0[1] - lo.0[1]], hi.1 - lo.1))
}

/// Limited `(d/d east, d/d north)` gradient of `field` in every cell.
///
/// Cells inactive under the mesh's own mask neither receive a gradient nor
/// contribute to their neighbours'.
pub fn source_gradients(mesh: &Mesh, field: &[f64]) -> Result<Vec<[f64; 2]>, MosaicError> {
    mesh.check_cell_array("field", field.len())?;
    let (nx, ny) = (mesh.nx(), mesh.ny());
    let centroids = cell_centroids(mesh);
    let active = |i: usize, j: usize| mesh.is_active(i, j, DEFAULT_MASK_THRESHOLD);
    let sample = |i: isize, j: isize| -> Option<(Vec3, f64)> {
        if i < 0
            || j < 0
            || i as usize >= nx
            || j as usize >= ny
            || !active(i as usize, j as usize)
        {
            return None;
        }
        let k = j as usize * nx + i as usize;
        Some((centroids[k], field[k]))
    };
    let mut grads = vec![[0.0; 2]; nx * ny];
    for j in 0..ny {
        for i in 0..nx {
            if !active(i, j) {
                continue;
            }
            let k = j * nx + i;
            let (c, f0) = (centroids[k], field[k]);
            let (ii, jj) = (i as isize, j as isize);
            let along_i = axis_difference(c, f0, sample(ii - 1, jj), sample(ii + 1, jj));
            let along_j = axis_difference(c, f0, sample(ii, jj - 1), sample(ii, jj + 1));
            let g = match (along_i, along_j) {
                (Some((di, fi)), Some((dj, fj))) => {
                    let det = di[0] * dj[1] - di[1] * dj[0];
                    let scale = (di[0].hypot(di[1]) * dj[0].hypot(dj[1])).max(f64::MIN_POSITIVE);
                    if det.abs() <= 1e-9 * scale {
                        continue;
                    }
                    [(fi * dj[1] - fj * di[1]) / det, (di[0] * fj - dj[0] * fi) / det]
                }
                (Some((d, df)), None) | (None, Some((d, df))) => {
                    let n2 = d[0] * d[0] + d[1] * d[1];
                    if n2 <= 0.0 {
                        continue;
                    }
                    [df * d[0] / n2, df * d[1] / n2]
                }
                (None, None) => continue,
            };

            let (mut fmin, mut fmax) = (f0, f0);
            for (a, b) in [(ii - 1, jj), (ii + 1, jj), (ii, jj - 1), (ii, jj + 1)] {
                if let Some((_, f)) = sample(a, b) {
                    fmin = fmin.min(f);
                    fmax = fmax.max(f);
                }
            }
            let mut phi: f64 = 1.0;
            for (ci, cj) in [(i, j), (i + 1, j), (i + 1, j + 1), (i, j + 1)] {
                let [dx, dy] = tangent_offset(c, mesh.corner_xyz(ci, cj));
                let delta = g[0] * dx + g[1] * dy;
                if delta > 0.0 {
                    phi = phi.min((fmax - f0) / delta);
                } else if delta < 0.0 {
                    phi = phi.min((fmin - f0) / delta);
                }
            }
            let phi = phi.clamp(0.0, 1.0);
            grads[k] = [g[0] * phi, g[1] * phi];
        }
    }
    Ok(grads)
}
