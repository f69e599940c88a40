#![allow(dead_code)]
use std::f64::consts::FRAC_PI_2;

use mosaic_xgrid::geometry::sphere::{TWO_PI, Vec3, lonlat_to_xyz, xyz_to_lonlat};
use mosaic_xgrid::meshgen::{cubed_sphere, global_lonlat, lonlat_mesh};
use mosaic_xgrid::prelude::*;

/// Single-tile regional mosaic over `[lon0, lon1] × [lat0, lat1]`.
pub fn regional(name: &str, nx: usize, ny: usize, lon: (f64, f64), lat: (f64, f64)) -> Mosaic {
    let m = lonlat_mesh("tile1", nx, ny, lon, lat).unwrap();
    Mosaic::with_tiles(name, MosaicShape::Regional, [m]).unwrap()
}

/// Two `nx × ny` lon/lat tiles glued east-west: `west` over `[0, 0.4]` and
/// `east` over `[0.4, 0.8]` in longitude, both over `[0, 0.3]` in latitude.
pub fn strip(nx: usize, ny: usize) -> Mosaic {
    let w = lonlat_mesh("west", nx, ny, (0.0, 0.4), (0.0, 0.3)).unwrap();
    let e = lonlat_mesh("east", nx, ny, (0.4, 0.8), (0.0, 0.3)).unwrap();
    let mut m = Mosaic::with_tiles("strip", MosaicShape::Regional, [w, e]).unwrap();
    m.compute_topology(&TopologyOptions::default()).unwrap();
    m
}

/// Cubed sphere with `n × n` cells per face and its contacts computed.
pub fn cube(n: usize) -> Mosaic {
    cubed_sphere("cube", n).unwrap()
}

/// Whole-sphere single-tile lon/lat mosaic.
pub fn global(nx: usize, ny: usize) -> Mosaic {
    let m = global_lonlat("tile1", nx, ny).unwrap();
    Mosaic::with_tiles("global", MosaicShape::Generic, [m]).unwrap()
}

pub fn sphere_area() -> f64 {
    2.0 * TWO_PI
}

/// Centroid `(lon, lat)` of every cell of every tile.
pub fn centroids(mosaic: &Mosaic) -> Vec<Vec<(f64, f64)>> {
    mosaic
        .tiles()
        .iter()
        .map(|m| {
            (0..m.ny())
                .flat_map(|j| (0..m.nx()).map(move |i| (i, j)))
                .map(|(i, j)| xyz_to_lonlat(m.cell_polygon(i, j).unwrap().centroid().unwrap()))
                .collect()
        })
        .collect()
}

/// Per-tile cell field from a function of the cell centroid.
pub fn field_from(mosaic: &Mosaic, f: impl Fn(f64, f64) -> f64) -> Vec<Vec<f64>> {
    centroids(mosaic)
        .into_iter()
        .map(|tile| tile.into_iter().map(|(lon, lat)| f(lon, lat)).collect())
        .collect()
}

/// Unit vector of corner `(i, j)` of `mesh`.
pub fn corner_xyz(mesh: &Mesh, i: usize, j: usize) -> Vec3 {
    let (lon, lat) = mesh.corner(i, j).unwrap();
    lonlat_to_xyz(lon, lat)
}

pub fn same_point(a: Vec3, b: Vec3) -> bool {
    (0..3).all(|k| (a[k] - b[k]).abs() < 1e-12)
}

pub fn assert_close(got: f64, want: f64, rel: f64) {
    let scale = want.abs().max(1e-300);
    assert!(
        (got - want).abs() <= rel * scale,
        "got {got:e}, want {want:e} (relative error {:e})",
        (got - want).abs() / scale
    );
}

/// A latitude strictly inside the open interval `(-π/2, π/2)`.
pub fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(-FRAC_PI_2 + 1e-6, FRAC_PI_2 - 1e-6)
}
