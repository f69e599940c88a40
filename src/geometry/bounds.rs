//! Wrap-aware longitude intervals and lon/lat bounding boxes.
//!
//! A [`LonInterval`] is an arc of the equator described by a start in `[0, 2π)`
//! and a width in `[0, 2π]`, so an interval crossing the 0/2π seam is a single
//! value rather than a naive `min..max` pair. [`LonLatBox`] adds a latitude range.
//!
//! Boxes of geodesic-edged cells include the poleward bulge of each edge (see
//! [`arc_latitude_range`]) and become full-longitude when a cell contains a pole.

use std::f64::consts::FRAC_PI_2;

use super::sphere::{TWO_PI, Vec3, cross, dot, is_pole, normalize, wrap_lon, xyz_to_lonlat};

/// Arc of longitudes `[start, start + width]`, taken modulo 2π.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LonInterval {
    start: f64,
    width: f64,
}

impl LonInterval {
    /// Interval starting at `start` (wrapped) spanning `width` radians.
    ///
    /// Widths at or above 2π produce the full circle; negative widths clamp to 0.
    pub fn new(start: f64, width: f64) -> Self {
        if width >= TWO_PI {
            return Self::full();
        }
        Self {
            start: wrap_lon(start),
            width: width.max(0.0),
        }
    }

    /// The whole circle of longitudes.
    pub fn full() -> Self {
        Self {
            start: 0.0,
            width: TWO_PI,
        }
    }

    #[inline]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// End of the arc; may exceed 2π when the interval crosses the seam.
    #[inline]
    pub fn end(&self) -> f64 {
        self.start + self.width
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.width >= TWO_PI
    }

    /// Smallest arc containing every longitude in `lons`.
    ///
    /// Found by removing the largest gap between sorted, wrapped longitudes.
    /// Returns `None` for an empty slice.
    pub fn covering(lons: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = lons.iter().map(|&l| wrap_lon(l)).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let mut best_gap = sorted[0] + TWO_PI - sorted[n - 1];
        let mut best_start = sorted[0];
        for k in 1..n {
            let gap = sorted[k] - sorted[k - 1];
            if gap > best_gap {
                best_gap = gap;
                best_start = sorted[k];
            }
        }
        Some(Self::new(best_start, TWO_PI - best_gap))
    }

    /// Smallest arc containing every interval in `intervals`.
    pub fn union_all<I>(intervals: I) -> Option<Self>
    where
        I: IntoIterator<Item = LonInterval>,
    {
        let mut items: Vec<LonInterval> = intervals.into_iter().collect();
        if items.is_empty() {
            return None;
        }
        if items.iter().any(LonInterval::is_full) {
            return Some(Self::full());
        }
        items.sort_by(|a, b| a.start.total_cmp(&b.start));

        // Sweep once around the circle; coverage that spills past 2π wraps to
        // the front, so the initial reach is the largest wrapped end.
        let max_end = items.iter().map(LonInterval::end).fold(f64::MIN, f64::max);
        let mut reach = max_end - TWO_PI;
        let mut best: Option<(f64, f64)> = None;
        for item in &items {
            if item.start > reach {
                let gap = item.start - reach;
                if best.is_none_or(|(g, _)| gap > g) {
                    best = Some((gap, item.start));
                }
            }
            reach = reach.max(item.end());
        }
        Some(match best {
            None => Self::full(),
            Some((gap, gap_end)) => Self::new(gap_end, TWO_PI - gap),
        })
    }

    /// Whether `lon` lies inside the arc, with `slack` radians of tolerance.
    pub fn contains(&self, lon: f64, slack: f64) -> bool {
        if self.is_full() {
            return true;
        }
        let d = wrap_lon(lon - self.start);
        d <= self.width + slack || d >= TWO_PI - slack
    }

    /// Whether two arcs share at least one longitude (within `slack`).
    pub fn intersects(&self, other: &LonInterval, slack: f64) -> bool {
        self.contains(other.start, slack) || other.contains(self.start, slack)
    }

    /// Widen the arc by `pad` radians on each side.
    pub fn padded(&self, pad: f64) -> Self {
        if self.is_full() {
            return *self;
        }
        Self::new(self.start - pad, self.width + 2.0 * pad)
    }
}

/// Wrap-aware lon/lat box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LonLatBox {
    pub lon: LonInterval,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl LonLatBox {
    /// `(lon_min, lon_max, lat_min, lat_max)`; `lon_max` exceeds 2π for boxes
    /// that cross the seam.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.lon.start(), self.lon.end(), self.lat_min, self.lat_max)
    }

    pub fn intersects(&self, other: &LonLatBox, slack: f64) -> bool {
        self.lat_min <= other.lat_max + slack
            && other.lat_min <= self.lat_max + slack
            && self.lon.intersects(&other.lon, slack)
    }

    pub fn padded(&self, pad: f64) -> Self {
        Self {
            lon: self.lon.padded(pad),
            lat_min: (self.lat_min - pad).max(-FRAC_PI_2),
            lat_max: (self.lat_max + pad).min(FRAC_PI_2),
        }
    }

    /// Smallest box containing every box in `boxes`.
    pub fn union_all<'a, I>(boxes: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a LonLatBox>,
    {
        let mut lat_min = f64::INFINITY;
        let mut lat_max = f64::NEG_INFINITY;
        let mut lons = Vec::new();
        for b in boxes {
            lat_min = lat_min.min(b.lat_min);
            lat_max = lat_max.max(b.lat_max);
            lons.push(b.lon);
        }
        let lon = LonInterval::union_all(lons)?;
        Some(Self {
            lon,
            lat_min,
            lat_max,
        })
    }
}

/// Latitude range `(min, max)` swept by the geodesic arc from `a` to `b`.
///
/// Includes interior extrema: a great-circle arc between two points at the same
/// latitude bulges toward the nearer pole.
pub fn arc_latitude_range(a: Vec3, b: Vec3) -> (f64, f64) {
    let (_, lat_a) = xyz_to_lonlat(a);
    let (_, lat_b) = xyz_to_lonlat(b);
    let mut lo = lat_a.min(lat_b);
    let mut hi = lat_a.max(lat_b);

    let n = cross(a, b);
    let Some(n_hat) = normalize(n) else {
        return (lo, hi);
    };
    // Highest point of the full great circle; the lowest is its antipode.
    let top = [-n_hat[0] * n_hat[2], -n_hat[1] * n_hat[2], 1.0 - n_hat[2] * n_hat[2]];
    let Some(top) = normalize(top) else {
        return (lo, hi);
    };
    for (v, is_top) in [(top, true), ([-top[0], -top[1], -top[2]], false)] {
        if dot(cross(a, v), n) >= 0.0 && dot(cross(v, b), n) >= 0.0 {
            let lat = v[2].clamp(-1.0, 1.0).asin();
            if is_top {
                hi = hi.max(lat);
            } else {
                lo = lo.min(lat);
            }
        }
    }
    (lo, hi)
}

/// Box of a convex, counter-clockwise geodesic polygon.
///
/// Vertices sitting on a pole do not constrain longitude; a pole strictly
/// inside (or on an edge of) the polygon makes the box full-longitude.
pub fn polygon_box(vertices: &[Vec3]) -> Option<LonLatBox> {
    const POLE_TOL: f64 = 1e-12;
    if vertices.is_empty() {
        return None;
    }
    let n = vertices.len();
    let mut lat_min = f64::INFINITY;
    let mut lat_max = f64::NEG_INFINITY;
    let mut lons = Vec::with_capacity(n);
    for k in 0..n {
        let a = vertices[k];
        let b = vertices[(k + 1) % n];
        let (lo, hi) = arc_latitude_range(a, b);
        lat_min = lat_min.min(lo);
        lat_max = lat_max.max(hi);
        if !is_pole(a, POLE_TOL) {
            lons.push(xyz_to_lonlat(a).0);
        }
    }

    let mut lon = LonInterval::covering(&lons).unwrap_or_else(LonInterval::full);
    if n >= 3 {
        for (pole, lat) in [([0.0, 0.0, 1.0], FRAC_PI_2), ([0.0, 0.0, -1.0], -FRAC_PI_2)] {
            if contains_point(vertices, pole, POLE_TOL) {
                lon = LonInterval::full();
                lat_min = lat_min.min(lat);
                lat_max = lat_max.max(lat);
            }
        }
    }
    Some(LonLatBox {
        lon,
        lat_min,
        lat_max,
    })
}

/// Point-in-convex-polygon test against every edge's great-circle half-space.
pub(crate) fn contains_point(vertices: &[Vec3], p: Vec3, tol: f64) -> bool {
    let n = vertices.len();
    (0..n).all(|k| {
        let normal = cross(vertices[k], vertices[(k + 1) % n]);
        dot(normal, p) >= -tol
    })
}
