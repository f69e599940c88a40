//! Basic corner generators for lon/lat tiles and equiangular cubed spheres.
//!
//! These produce well-formed fixtures for tests, benchmarks and examples; they
//! are not a projection library (no stretching, nesting or Schmidt transform).

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::geometry::sphere::{TWO_PI, Vec3, add, normalize, scale, xyz_to_lonlat};
use crate::mesh::{Mesh, Mosaic, MosaicShape};
use crate::mosaic_error::MosaicError;
use crate::topology::TopologyOptions;

/// `n + 1` evenly spaced values from `a` to `b`, hitting both ends exactly.
fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    (0..=n)
        .map(|k| match k {
            0 => a,
            k if k == n => b,
            k => a + (b - a) * (k as f64 / n as f64),
        })
        .collect()
}

/// Regular lon/lat tile with `nx × ny` cells spanning `lon` and `lat` (radians).
pub fn lonlat_mesh(
    tile: impl Into<String>,
    nx: usize,
    ny: usize,
    lon: (f64, f64),
    lat: (f64, f64),
) -> Result<Mesh, MosaicError> {
    let tile = tile.into();
    if nx == 0 || ny == 0 {
        return Err(MosaicError::ShapeMismatch {
            tile,
            what: "cell extent",
            expected: 1,
            found: 0,
        });
    }
    let lons = linspace(lon.0, lon.1, nx);
    let lats = linspace(lat.0, lat.1, ny);
    let mut lon_c = Vec::with_capacity((nx + 1) * (ny + 1));
    let mut lat_c = Vec::with_capacity((nx + 1) * (ny + 1));
    for &y in &lats {
        for &x in &lons {
            lon_c.push(x);
            lat_c.push(y);
        }
    }
    Mesh::new(tile, nx, ny, lon_c, lat_c)
}

/// Whole-sphere lon/lat tile; its west and east sides coincide and its
/// top and bottom rows collapse onto the poles.
pub fn global_lonlat(tile: impl Into<String>, nx: usize, ny: usize) -> Result<Mesh, MosaicError> {
    lonlat_mesh(tile, nx, ny, (0.0, TWO_PI), (-FRAC_PI_2, FRAC_PI_2))
}

/// Face frames `(centre, e_i, e_j)` with `e_i × e_j = centre`, so increasing
/// `i` then `j` runs counter-clockwise seen from outside.
const CUBE_FACES: [(Vec3, Vec3, Vec3); 6] = [
    ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, 0.0, 1.0], [-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
];

/// Gnomonic coordinates of an equiangular edge split into `n` cells,
/// antisymmetric and exactly ±1 at the ends so shared face edges coincide.
fn equiangular(n: usize) -> Vec<f64> {
    let mut t: Vec<f64> = (0..=n)
        .map(|k| (-FRAC_PI_4 + FRAC_PI_2 * (k as f64 / n as f64)).tan())
        .collect();
    for k in 0..=n / 2 {
        let v = if k == 0 { 1.0 } else { t[n - k] };
        t[k] = -v;
        t[n - k] = v;
    }
    if n % 2 == 0 {
        t[n / 2] = 0.0;
    }
    t
}

/// One `n × n` equiangular cubed-sphere face, `face` in `0..6`.
pub fn cubed_sphere_face(
    tile: impl Into<String>,
    face: usize,
    n: usize,
) -> Result<Mesh, MosaicError> {
    let tile = tile.into();
    let Some(&(c, ei, ej)) = CUBE_FACES.get(face) else {
        return Err(MosaicError::InvalidOptions {
            name: "face",
            reason: format!("{face} is not in 0..6"),
        });
    };
    if n == 0 {
        return Err(MosaicError::ShapeMismatch {
            tile,
            what: "cell extent",
            expected: 1,
            found: 0,
        });
    }
    let t = equiangular(n);
    let mut lon = Vec::with_capacity((n + 1) * (n + 1));
    let mut lat = Vec::with_capacity((n + 1) * (n + 1));
    for &b in &t {
        for &a in &t {
            let p = add(c, add(scale(ei, a), scale(ej, b)));
            let Some(p) = normalize(p) else {
                return Err(MosaicError::InvalidOptions {
                    name: "face",
                    reason: "degenerate face frame".into(),
                });
            };
            let (x, y) = xyz_to_lonlat(p);
            lon.push(x);
            lat.push(y);
        }
    }
    Mesh::new(tile, n, n, lon, lat)
}

/// Six-face equiangular cubed sphere with `n × n` cells per face, tiles named
/// `tile1` … `tile6`, with its contacts computed and validated.
pub fn cubed_sphere(name: impl Into<String>, n: usize) -> Result<Mosaic, MosaicError> {
    let faces = (0..6)
        .map(|f| cubed_sphere_face(format!("tile{}", f + 1), f, n))
        .collect::<Result<Vec<_>, _>>()?;
    let mut mosaic = Mosaic::with_tiles(name, MosaicShape::CubedSphere, faces)?;
    mosaic.compute_topology(&TopologyOptions::default())?;
    Ok(mosaic)
}
