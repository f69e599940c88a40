//! Geodesic-edged spherical polygons.
//!
//! Vertices are unit vectors joined by great-circle arcs shorter than π. The
//! polygon intersection used by the exchange grid clips a subject polygon
//! against the great-circle half-spaces of a convex clip polygon, the spherical
//! counterpart of Sutherland–Hodgman clipping.
//!
//! Orientation convention: counter-clockwise seen from outside the sphere,
//! which makes [`SphericalPolygon::signed_area`] positive.

use super::sphere::{
    Vec3, add, angular_distance, cross, dot, norm, normalize, scale, sub, triangle_area, triple,
};

/// Vertices closer than this angle (radians) are merged.
pub const VERTEX_MERGE_TOL: f64 = 1e-14;

/// Half-space tolerance for the clip test: points within
/// `CLIP_TOL + CLIP_REL_TOL * edge_length` of a clip edge count as inside.
const CLIP_TOL: f64 = 1e-15;
const CLIP_REL_TOL: f64 = 1e-14;

/// Simple polygon on the unit sphere with geodesic edges.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SphericalPolygon {
    vertices: Vec<Vec3>,
}

impl SphericalPolygon {
    /// Build a polygon, dropping consecutive (and closing) duplicate vertices.
    pub fn new(vertices: impl IntoIterator<Item = Vec3>) -> Self {
        let mut out: Vec<Vec3> = Vec::new();
        for v in vertices {
            if out
                .last()
                .is_none_or(|&last| angular_distance(last, v) > VERTEX_MERGE_TOL)
            {
                out.push(v);
            }
        }
        while out.len() > 1 && angular_distance(out[0], out[out.len() - 1]) <= VERTEX_MERGE_TOL {
            out.pop();
        }
        Self { vertices: out }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Signed spherical-excess area in steradians (fan from the first vertex).
    pub fn signed_area(&self) -> f64 {
        if self.vertices.len() < 3 {
            return 0.0;
        }
        let v0 = self.vertices[0];
        self.vertices[1..]
            .windows(2)
            .map(|w| triangle_area(v0, w[0], w[1]))
            .sum()
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Sum of the geodesic edge lengths in radians.
    pub fn perimeter(&self) -> f64 {
        let n = self.vertices.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|k| angular_distance(self.vertices[k], self.vertices[(k + 1) % n]))
            .sum()
    }

    /// Reverse the vertex order if the polygon runs clockwise.
    pub fn into_ccw(mut self) -> Self {
        if self.signed_area() < 0.0 {
            self.vertices.reverse();
        }
        self
    }

    /// Whether every vertex turn is a left turn (within `tol`).
    pub fn is_convex(&self, tol: f64) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        (0..n).all(|k| {
            let a = self.vertices[k];
            let b = self.vertices[(k + 1) % n];
            let c = self.vertices[(k + 2) % n];
            triple(a, sub(b, a), sub(c, a)) >= -tol
        })
    }

    /// Area-weighted centroid projected back onto the sphere.
    pub fn centroid(&self) -> Option<Vec3> {
        match self.vertices.len() {
            0 => None,
            1 | 2 => normalize(self.vertices.iter().fold([0.0; 3], |acc, &v| add(acc, v))),
            _ => {
                let v0 = self.vertices[0];
                let mut acc = [0.0; 3];
                for w in self.vertices[1..].windows(2) {
                    let area = triangle_area(v0, w[0], w[1]);
                    acc = add(acc, scale(add(add(v0, w[0]), w[1]), area));
                }
                normalize(acc)
            }
        }
    }

    /// Intersection with a convex counter-clockwise `clip` polygon.
    ///
    /// The result is empty when the polygons share no area; it may be a
    /// sliver when they only touch along an edge, which callers discard by
    /// area.
    pub fn clip(&self, clip: &SphericalPolygon) -> SphericalPolygon {
        let m = clip.vertices.len();
        if m < 3 || self.vertices.len() < 3 {
            return SphericalPolygon::default();
        }
        let mut current = self.vertices.clone();
        let mut next = Vec::with_capacity(current.len() + m);
        for k in 0..m {
            let anchor = clip.vertices[k];
            let edge = sub(clip.vertices[(k + 1) % m], anchor);
            // a × (b - a) == a × b, without the cancellation on short edges.
            let Some(normal) = normalize(cross(anchor, edge)) else {
                continue;
            };
            let tol = CLIP_TOL + CLIP_REL_TOL * norm(edge);
            clip_half_space(&current, anchor, normal, tol, &mut next);
            std::mem::swap(&mut current, &mut next);
            if current.len() < 3 {
                return SphericalPolygon::default();
            }
        }
        SphericalPolygon::new(current)
    }
}

/// Keep the part of `poly` on the non-negative side of the great circle with
/// unit normal `normal` through `anchor`. Signed distances are measured from
/// `anchor` so they stay accurate for small cells.
fn clip_half_space(poly: &[Vec3], anchor: Vec3, normal: Vec3, tol: f64, out: &mut Vec<Vec3>) {
    out.clear();
    let n = poly.len();
    for k in 0..n {
        let p = poly[k];
        let q = poly[(k + 1) % n];
        let dp = dot(normal, sub(p, anchor));
        let dq = dot(normal, sub(q, anchor));
        let p_in = dp >= -tol;
        let q_in = dq >= -tol;
        if p_in {
            out.push(p);
        }
        if p_in != q_in {
            // Chord crossing projected back onto the sphere is the arc crossing.
            let t = dp / (dp - dq);
            if let Some(x) = normalize(add(p, scale(sub(q, p), t))) {
                out.push(x);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::sphere::lonlat_to_xyz;

    fn quad(lon0: f64, lon1: f64, lat0: f64, lat1: f64) -> SphericalPolygon {
        SphericalPolygon::new([
            lonlat_to_xyz(lon0, lat0),
            lonlat_to_xyz(lon1, lat0),
            lonlat_to_xyz(lon1, lat1),
            lonlat_to_xyz(lon0, lat1),
        ])
    }

    #[test]
    fn ccw_quad_has_positive_area() {
        let q = quad(0.0, 0.1, 0.0, 0.1);
        assert!(q.signed_area() > 0.0);
        assert!(q.is_convex(1e-15));
    }

    #[test]
    fn into_ccw_fixes_clockwise_input() {
        let q = quad(0.0, 0.1, 0.0, 0.1);
        let mut rev = q.vertices().to_vec();
        rev.reverse();
        let cw = SphericalPolygon::new(rev);
        assert!(cw.signed_area() < 0.0);
        let fixed = cw.into_ccw();
        assert!((fixed.signed_area() - q.signed_area()).abs() < 1e-18);
    }

    #[test]
    fn clip_of_identical_cells_is_the_cell() {
        let q = quad(0.2, 0.3, -0.1, 0.0);
        let x = q.clip(&q);
        assert!((x.area() - q.area()).abs() <= 1e-14 * q.area());
    }

    #[test]
    fn clip_of_neighbours_is_negligible() {
        let a = quad(0.0, 0.1, 0.0, 0.1);
        let b = quad(0.1, 0.2, 0.0, 0.1);
        assert!(a.clip(&b).area() <= 1e-12 * a.area());
    }

    #[test]
    fn small_neighbours_touch_without_area() {
        let d = 1e-6;
        let a = quad(1.0, 1.0 + d, 0.3, 0.3 + d);
        let b = quad(1.0 + d, 1.0 + 2.0 * d, 0.3, 0.3 + d);
        let corner = quad(1.0 + d, 1.0 + 2.0 * d, 0.3 + d, 0.3 + 2.0 * d);
        assert!(a.clip(&b).area() <= 1e-12 * a.area());
        assert!(a.clip(&corner).area() <= 1e-12 * a.area());
        assert_eq!(a.clip(&a).area(), a.area());
    }

    #[test]
    fn perimeter_of_small_square() {
        let d = 1e-3;
        let q = quad(0.0, d, 0.0, d);
        assert!((q.perimeter() - 4.0 * d).abs() < 1e-5 * d);
    }

    #[test]
    fn quarter_overlap() {
        let a = quad(0.0, 0.2, 0.0, 0.2);
        let b = quad(0.1, 0.3, 0.1, 0.3);
        let expected = quad(0.1, 0.2, 0.1, 0.2).area();
        let got = a.clip(&b).area();
        // Edges are geodesics, so the overlap is only close to the lat/lon quad.
        assert!((got - expected).abs() < 2e-2 * expected);
        assert!((got - b.clip(&a).area()).abs() < 1e-12 * expected);
    }

    #[test]
    fn collapsed_pole_vertices_are_merged() {
        let tri = SphericalPolygon::new([
            lonlat_to_xyz(0.0, 1.5),
            lonlat_to_xyz(0.5, 1.5),
            lonlat_to_xyz(0.5, std::f64::consts::FRAC_PI_2),
            lonlat_to_xyz(0.0, std::f64::consts::FRAC_PI_2),
        ]);
        assert_eq!(tri.len(), 3);
        assert!(tri.signed_area() > 0.0);
    }
}
