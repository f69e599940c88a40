//! Contact discovery from boundary geometry.
//!
//! Every tile contributes four boundary segments. Each unordered pair of
//! segments is tested by anchoring on a segment endpoint, locating the
//! coincident corner on the other segment and walking both segments while
//! their corners keep coinciding. The longest such run, if at least one cell
//! edge long, becomes a [`Contact`].

use log::debug;

use crate::geometry::sphere::{Vec3, angular_distance};
use crate::mesh::{Mesh, Mosaic};
use crate::topology::contact::{Contact, Orientation};
use crate::topology::side::Side;

/// One boundary segment as a corner sequence on the unit sphere.
#[derive(Clone, Debug)]
pub(crate) struct Segment {
    pub tile: usize,
    pub side: Side,
    pub points: Vec<Vec3>,
    pub collapsed: bool,
}

impl Segment {
    fn new(tile: usize, mesh: &Mesh, side: Side, eps: f64) -> Self {
        let (nx, ny) = (mesh.nx(), mesh.ny());
        let points: Vec<Vec3> = (0..=side.cell_len(nx, ny))
            .map(|p| {
                let (i, j) = side.corner_at(p, nx, ny);
                mesh.corner_xyz(i, j)
            })
            .collect();
        let collapsed = points.iter().all(|&q| angular_distance(points[0], q) <= eps);
        Self {
            tile,
            side,
            points,
            collapsed,
        }
    }

    #[inline]
    fn last(&self) -> usize {
        self.points.len() - 1
    }
}

/// Shortest non-degenerate boundary edge of a tile, in radians.
pub(crate) fn min_boundary_edge(mesh: &Mesh) -> f64 {
    let (nx, ny) = (mesh.nx(), mesh.ny());
    Side::ALL
        .iter()
        .flat_map(|&side| {
            (0..side.cell_len(nx, ny)).map(move |p| {
                let (i0, j0) = side.corner_at(p, nx, ny);
                let (i1, j1) = side.corner_at(p + 1, nx, ny);
                angular_distance(mesh.corner_xyz(i0, j0), mesh.corner_xyz(i1, j1))
            })
        })
        .filter(|&d| d > 0.0)
        .fold(f64::INFINITY, f64::min)
}

/// Boundary segments of every tile, with per-tile matching tolerance.
pub(crate) fn segments(mosaic: &Mosaic, relative_tolerance: f64) -> (Vec<Segment>, Vec<f64>) {
    let eps: Vec<f64> = mosaic
        .tiles()
        .iter()
        .map(|m| relative_tolerance * min_boundary_edge(m))
        .collect();
    let segs = mosaic
        .tiles()
        .iter()
        .enumerate()
        .flat_map(|(t, mesh)| {
            let e = eps[t];
            Side::ALL.iter().map(move |&side| Segment::new(t, mesh, side, e))
        })
        .collect();
    (segs, eps)
}

/// A coincident run: `len` edges starting at `(pa, pb)` with directions `(da, db)`.
#[derive(Clone, Copy, Debug)]
struct Run {
    pa: usize,
    da: isize,
    pb: usize,
    db: isize,
    len: usize,
}

fn walk(a: &Segment, pa: usize, da: isize, b: &Segment, pb: usize, db: isize, eps: f64) -> usize {
    let mut len = 0;
    loop {
        let na = pa as isize + da * (len as isize + 1);
        let nb = pb as isize + db * (len as isize + 1);
        if na < 0 || nb < 0 || na as usize > a.last() || nb as usize > b.last() {
            return len;
        }
        if angular_distance(a.points[na as usize], b.points[nb as usize]) > eps {
            return len;
        }
        len += 1;
    }
}

/// Position on `seg` closest to `p`, if within `eps`.
fn locate(seg: &Segment, p: Vec3, eps: f64) -> Option<usize> {
    seg.points
        .iter()
        .enumerate()
        .map(|(k, &q)| (k, angular_distance(p, q)))
        .filter(|&(_, d)| d <= eps)
        .min_by(|x, y| x.1.total_cmp(&y.1))
        .map(|(k, _)| k)
}

/// Longest coincident run anchored on an endpoint of `a`.
fn anchored_runs(a: &Segment, b: &Segment, eps: f64) -> Option<Run> {
    let mut best: Option<Run> = None;
    for (pa, da) in [(0usize, 1isize), (a.last(), -1)] {
        let Some(pb) = locate(b, a.points[pa], eps) else {
            continue;
        };
        for db in [1isize, -1] {
            let len = walk(a, pa, da, b, pb, db, eps);
            if len > 0 && best.is_none_or(|r| len > r.len) {
                best = Some(Run { pa, da, pb, db, len });
            }
        }
    }
    best
}

/// Match two segments, returning a contact oriented from `a` to `b`.
pub(crate) fn match_segments(a: &Segment, b: &Segment, eps: f64) -> Option<Contact> {
    if a.collapsed || b.collapsed {
        return None;
    }
    let from_a = anchored_runs(a, b, eps);
    let from_b = anchored_runs(b, a, eps).map(|r| Run {
        pa: r.pb,
        da: r.db,
        pb: r.pa,
        db: r.da,
        len: r.len,
    });
    let run = match (from_a, from_b) {
        (Some(x), Some(y)) => {
            if y.len > x.len {
                y
            } else {
                x
            }
        }
        (x, y) => x.or(y)?,
    };

    // Normalise so positions on A increase.
    let (start_a, start_b, db) = if run.da > 0 {
        (run.pa, run.pb, run.db)
    } else {
        (run.pa - run.len, (run.pb as isize + run.db * run.len as isize) as usize, -run.db)
    };
    let end_a = start_a + run.len;
    let end_b = (start_b as isize + db * run.len as isize) as usize;
    let swapped = a.side.runs_along_i() != b.side.runs_along_i();
    Some(Contact {
        tile_a: a.tile,
        side_a: a.side,
        start_a,
        end_a,
        tile_b: b.tile,
        side_b: b.side,
        start_b,
        end_b,
        orientation: Orientation::from_flags(swapped, db < 0),
    })
}

/// Every contact between the segments of `mosaic`, in segment-pair order.
pub(crate) fn discover_contacts(mosaic: &Mosaic, relative_tolerance: f64) -> Vec<Contact> {
    let (segs, eps) = segments(mosaic, relative_tolerance);
    let mut contacts = Vec::new();
    for (ka, a) in segs.iter().enumerate() {
        for b in &segs[ka + 1..] {
            let tol = eps[a.tile].min(eps[b.tile]);
            if let Some(c) = match_segments(a, b, tol) {
                debug!(
                    "contact {}:{} [{}..{}] <-> {}:{} [{}..{}] {:?}",
                    mosaic.tiles()[c.tile_a].tile(),
                    c.side_a,
                    c.start_a,
                    c.end_a,
                    mosaic.tiles()[c.tile_b].tile(),
                    c.side_b,
                    c.start_b,
                    c.end_b,
                    c.orientation
                );
                contacts.push(c);
            }
        }
    }
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::sphere::lonlat_to_xyz;

    fn seg(tile: usize, side: Side, lonlat: &[(f64, f64)]) -> Segment {
        Segment {
            tile,
            side,
            points: lonlat.iter().map(|&(x, y)| lonlat_to_xyz(x, y)).collect(),
            collapsed: false,
        }
    }

    #[test]
    fn reversed_partial_run_is_normalised() {
        // A runs north along lon=0; B runs south over A's upper half.
        let a = seg(0, Side::East, &[(0.0, 0.0), (0.0, 0.1), (0.0, 0.2), (0.0, 0.3), (0.0, 0.4)]);
        let b = seg(1, Side::West, &[(0.0, 0.4), (0.0, 0.3), (0.0, 0.2)]);
        let c = match_segments(&a, &b, 1e-6).unwrap();
        assert_eq!((c.start_a, c.end_a), (2, 4));
        assert_eq!((c.start_b, c.end_b), (2, 0));
        assert_eq!(c.orientation, Orientation::Reversed);
    }

    #[test]
    fn shared_corner_only_is_not_a_contact() {
        let a = seg(0, Side::South, &[(0.0, 0.0), (0.1, 0.0)]);
        let b = seg(0, Side::West, &[(0.0, 0.0), (0.0, 0.1)]);
        assert!(match_segments(&a, &b, 1e-6).is_none());
    }
}
