//! Unit-sphere vector helpers.
//!
//! Points on the sphere are carried as Cartesian unit vectors (`[x, y, z]`);
//! longitude/latitude in radians only appear at the mesh boundary. Longitude is
//! measured from the +x axis toward +y, latitude from the equator toward +z.

use std::f64::consts::{FRAC_PI_2, PI};

/// Cartesian vector in R³.
pub type Vec3 = [f64; 3];

/// Full turn in radians.
pub const TWO_PI: f64 = 2.0 * PI;

/// Mean Earth radius in metres, for callers that want areas in m².
pub const EARTH_RADIUS: f64 = 6_371_000.0;

#[inline]
pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
pub fn norm(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

/// Scalar triple product `a · (b × c)`.
#[inline]
pub fn triple(a: Vec3, b: Vec3, c: Vec3) -> f64 {
    dot(a, cross(b, c))
}

/// Unit vector along `a`, or `None` for a (near) zero vector.
#[inline]
pub fn normalize(a: Vec3) -> Option<Vec3> {
    let n = norm(a);
    if n > f64::MIN_POSITIVE && n.is_finite() {
        Some(scale(a, 1.0 / n))
    } else {
        None
    }
}

/// Wrap a longitude into `[0, 2π)`.
#[inline]
pub fn wrap_lon(lon: f64) -> f64 {
    let w = lon.rem_euclid(TWO_PI);
    // rem_euclid can round up to exactly 2π for tiny negative inputs
    if w >= TWO_PI { 0.0 } else { w }
}

/// Convert `(lon, lat)` in radians to a unit vector.
#[inline]
pub fn lonlat_to_xyz(lon: f64, lat: f64) -> Vec3 {
    let (slat, clat) = lat.sin_cos();
    let (slon, clon) = lon.sin_cos();
    [clat * clon, clat * slon, slat]
}

/// Convert a unit vector to `(lon, lat)` with `lon` in `[0, 2π)`.
///
/// At the poles the longitude is reported as 0.
#[inline]
pub fn xyz_to_lonlat(p: Vec3) -> (f64, f64) {
    let horizontal = (p[0] * p[0] + p[1] * p[1]).sqrt();
    let lat = p[2].atan2(horizontal);
    let lon = if horizontal > 0.0 {
        wrap_lon(p[1].atan2(p[0]))
    } else {
        0.0
    };
    (lon, lat.clamp(-FRAC_PI_2, FRAC_PI_2))
}

/// Great-circle angle between two unit vectors.
#[inline]
pub fn angular_distance(a: Vec3, b: Vec3) -> f64 {
    norm(cross(a, b)).atan2(dot(a, b))
}

/// Signed area (steradians) of the geodesic triangle `a, b, c`.
///
/// Positive when the vertices run counter-clockwise seen from outside the
/// sphere. Uses the Van Oosterom–Strackee formula with the triple product
/// taken on edge vectors from `a`, so the rounding error scales with the
/// triangle rather than with the unit sphere.
#[inline]
pub fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f64 {
    let numerator = triple(a, sub(b, a), sub(c, a));
    let denom = 1.0 + dot(a, b) + dot(b, c) + dot(c, a);
    2.0 * numerator.atan2(denom)
}

/// True if the unit vector sits on a pole (within `tol` of ±z).
#[inline]
pub fn is_pole(p: Vec3, tol: f64) -> bool {
    p[0].abs() <= tol && p[1].abs() <= tol
}
