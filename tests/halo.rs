mod util;
use mosaic_xgrid::geometry::sphere::{Vec3, add, dot, normalize, scale, sub};
use mosaic_xgrid::halo::DEFAULT_FILL_VALUE;
use mosaic_xgrid::prelude::*;
use util::*;

const FILL: f64 = DEFAULT_FILL_VALUE;

/// Center field `i + nx * t + 10 * j` on every tile: continuous across the strip.
fn strip_center(m: &Mosaic) -> Vec<Vec<f64>> {
    m.tiles()
        .iter()
        .enumerate()
        .map(|(t, mesh)| {
            (0..mesh.ny())
                .flat_map(|j| {
                    (0..mesh.nx()).map(move |i| (i + mesh.nx() * t) as f64 + 10.0 * j as f64)
                })
                .collect()
        })
        .collect()
}

#[test]
fn strip_center_halo_reads_across_the_seam() {
    let m = strip(4, 3);
    let fields = strip_center(&m);
    let h = HaloStitcher::new(&m);

    let w = h.extend("west", &fields, 1, Staggering::Center).unwrap();
    assert_eq!((w.ni, w.nj), (6, 5));
    for j in 0..3 {
        assert_eq!(w.get(4, j), Some(4.0 + 10.0 * j as f64));
        assert_eq!(w.get(-1, j), Some(FILL));
        assert_eq!(w.get(0, j), Some(10.0 * j as f64));
    }
    for i in -1..5 {
        assert_eq!(w.get(i, -1), Some(FILL));
        assert_eq!(w.get(i, 3), Some(FILL));
    }
    assert_eq!(w.get(5, 0), None);

    let e = h.extend("east", &fields, 2, Staggering::Center).unwrap();
    for j in 0..3 {
        assert_eq!(e.get(-1, j), Some(3.0 + 10.0 * j as f64));
        assert_eq!(e.get(-2, j), Some(2.0 + 10.0 * j as f64));
        assert_eq!(e.get(4, j), Some(FILL));
    }
}

#[test]
fn strip_corner_halo_skips_the_shared_row() {
    let m = strip(4, 3);
    let fields: Vec<Vec<f64>> = (0..2)
        .map(|t| {
            (0..4)
                .flat_map(|j| (0..5).map(move |i| (i + 4 * t) as f64 + 10.0 * j as f64))
                .collect()
        })
        .collect();
    let h = HaloStitcher::new(&m);
    let w = h.extend("west", &fields, 1, Staggering::Corner).unwrap();
    assert_eq!((w.ni, w.nj), (7, 6));
    for j in 0..4 {
        assert_eq!(w.get(5, j), Some(5.0 + 10.0 * j as f64));
    }
    let e = h.extend("east", &fields, 2, Staggering::Corner).unwrap();
    for j in 0..4 {
        assert_eq!(e.get(-1, j), Some(3.0 + 10.0 * j as f64));
        assert_eq!(e.get(-2, j), Some(2.0 + 10.0 * j as f64));
    }
}

#[test]
fn halo_deeper_than_neighbor_is_rejected() {
    let m = strip(4, 3);
    let fields = strip_center(&m);
    let h = HaloStitcher::new(&m);
    assert!(matches!(
        h.extend("west", &fields, 5, Staggering::Center),
        Err(MosaicError::HaloTooWide { halo: 5, depth: 4, .. })
    ));
    let corners = vec![vec![0.0; 20]; 2];
    assert!(matches!(
        h.extend("west", &corners, 4, Staggering::Corner),
        Err(MosaicError::HaloTooWide { halo: 4, depth: 3, .. })
    ));
}

#[test]
fn bad_inputs_are_reported() {
    let m = strip(4, 3);
    let h = HaloStitcher::new(&m);
    let fields = strip_center(&m);
    assert_eq!(
        h.extend("north", &fields, 1, Staggering::Center),
        Err(MosaicError::UnknownTile("north".into()))
    );
    assert!(matches!(
        h.extend("west", &fields[..1], 1, Staggering::Center),
        Err(MosaicError::ShapeMismatch { what: "tile fields", .. })
    ));
    let short = vec![vec![0.0; 12], vec![0.0; 11]];
    assert!(matches!(
        h.extend("west", &short, 1, Staggering::Center),
        Err(MosaicError::ShapeMismatch { what: "field", expected: 12, found: 11, .. })
    ));
}

#[test]
fn custom_fill_value() {
    let m = strip(2, 2);
    let h = HaloStitcher::with_options(&m, HaloOptions { fill_value: f64::NAN });
    let w = h.extend("west", &vec![vec![1.0; 4]; 2], 1, Staggering::Center).unwrap();
    assert!(w.get(-1, 0).unwrap().is_nan());
    assert_eq!(w.get(2, 0), Some(1.0));
}

#[test]
fn periodic_global_tile_wraps() {
    let mut m = global(8, 4);
    m.compute_topology(&TopologyOptions::default()).unwrap();
    let field: Vec<f64> = (0..32).map(|k| k as f64).collect();
    let h = HaloStitcher::new(&m);
    let f = h.extend("tile1", &[field], 1, Staggering::Center).unwrap();
    for j in 0..4isize {
        assert_eq!(f.get(-1, j), Some((j * 8 + 7) as f64));
        assert_eq!(f.get(8, j), Some((j * 8) as f64));
    }
    assert_eq!(f.get(3, 4), Some(FILL));
}

fn cell_id(t: usize, i: usize, j: usize, n: usize) -> f64 {
    (t * 1000 + j * n + i) as f64
}

fn decode(v: f64, n: usize) -> (usize, usize, usize) {
    let k = v as usize;
    (k / 1000, (k % 1000) % n, (k % 1000) / n)
}

/// Unit directions of increasing `i` and `j` across cell `(i, j)`.
fn cell_axes(mesh: &Mesh, i: usize, j: usize) -> (Vec3, Vec3) {
    let c = |a, b| corner_xyz(mesh, a, b);
    let di = add(sub(c(i + 1, j), c(i, j)), sub(c(i + 1, j + 1), c(i, j + 1)));
    let dj = add(sub(c(i, j + 1), c(i, j)), sub(c(i + 1, j + 1), c(i + 1, j)));
    (normalize(di).unwrap(), normalize(dj).unwrap())
}

/// Every first-ring edge position of an `n × n` tile: halo index, adjacent
/// interior cell and the two corners of the shared edge.
fn ring(n: usize) -> Vec<((isize, isize), (usize, usize), [(usize, usize); 2])> {
    let ni = n as isize;
    let mut out = Vec::new();
    for p in 0..n {
        let q = p as isize;
        out.push(((ni, q), (n - 1, p), [(n, p), (n, p + 1)]));
        out.push(((-1, q), (0, p), [(0, p), (0, p + 1)]));
        out.push(((q, -1), (p, 0), [(p, 0), (p + 1, 0)]));
        out.push(((q, ni), (p, n - 1), [(p, n), (p + 1, n)]));
    }
    out
}

#[test]
fn cube_halo_cells_share_the_crossed_edge() {
    let n = 4;
    let m = cube(n);
    let fields: Vec<Vec<f64>> = (0..6)
        .map(|t| (0..n).flat_map(|j| (0..n).map(move |i| cell_id(t, i, j, n))).collect())
        .collect();
    let h = HaloStitcher::new(&m);
    for (t, mesh) in m.tiles().iter().enumerate() {
        let f = h.extend(mesh.tile(), &fields, 1, Staggering::Center).unwrap();
        for ((hi, hj), _, edge) in ring(n) {
            let v = f.get(hi, hj).unwrap();
            assert_ne!(v, FILL, "tile {t} halo ({hi}, {hj})");
            let (s, ci, cj) = decode(v, n);
            assert_ne!(s, t);
            let nb = &m.tiles()[s];
            let corners: Vec<Vec3> = [(ci, cj), (ci + 1, cj), (ci + 1, cj + 1), (ci, cj + 1)]
                .iter()
                .map(|&(a, b)| corner_xyz(nb, a, b))
                .collect();
            for (a, b) in edge {
                let p = corner_xyz(mesh, a, b);
                assert!(
                    corners.iter().any(|&q| same_point(p, q)),
                    "tile {t} halo ({hi}, {hj}) -> tile {s} ({ci}, {cj}) misses corner ({a}, {b})"
                );
            }
        }
    }
}

#[test]
fn cube_vector_halo_follows_the_grid_lines() {
    let n = 6;
    let m = cube(n);
    let ids: Vec<Vec<f64>> = (0..6)
        .map(|t| (0..n).flat_map(|j| (0..n).map(move |i| cell_id(t, i, j, n))).collect())
        .collect();
    let ones = vec![vec![1.0; n * n]; 6];
    let zeros = vec![vec![0.0; n * n]; 6];
    let h = HaloStitcher::new(&m);
    for mesh in m.tiles() {
        let tile = mesh.tile();
        let id = h.extend(tile, &ids, 1, Staggering::Center).unwrap();
        let (ux, uy) = h
            .extend_pair(tile, &ones, &zeros, 1, Staggering::Center, PairKind::Vector)
            .unwrap();
        let (vx, vy) = h
            .extend_pair(tile, &zeros, &ones, 1, Staggering::Center, PairKind::Vector)
            .unwrap();
        let (mx, my) = h
            .extend_pair(tile, &ones, &zeros, 1, Staggering::Center, PairKind::Magnitude)
            .unwrap();
        for ((hi, hj), (ii, ij), _) in ring(n) {
            // Stay away from cube corners, where grid lines kink the most.
            let along = if hi < 0 || hi >= n as isize { hj } else { hi };
            if along == 0 || along == n as isize - 1 {
                continue;
            }
            let (s, ci, cj) = decode(id.get(hi, hj).unwrap(), n);
            let (nb_i, nb_j) = cell_axes(&m.tiles()[s], ci, cj);
            let (here_i, here_j) = cell_axes(mesh, ii, ij);
            let express = |a: f64, b: f64| add(scale(here_i, a), scale(here_j, b));

            let candidates = [here_i, scale(here_i, -1.0), here_j, scale(here_j, -1.0)];
            for (physical, (a, b)) in [
                (nb_i, (ux.get(hi, hj).unwrap(), uy.get(hi, hj).unwrap())),
                (nb_j, (vx.get(hi, hj).unwrap(), vy.get(hi, hj).unwrap())),
            ] {
                assert_eq!(a.abs() + b.abs(), 1.0);
                let got = dot(physical, express(a, b));
                let best = candidates.iter().map(|&c| dot(physical, c)).fold(f64::MIN, f64::max);
                assert_eq!(got, best, "tile {tile} halo ({hi}, {hj})");
            }
            assert_eq!(mx.get(hi, hj).unwrap(), ux.get(hi, hj).unwrap().abs());
            assert_eq!(my.get(hi, hj).unwrap(), uy.get(hi, hj).unwrap().abs());
        }
    }
}

#[test]
fn strip_vector_pair_is_unchanged() {
    let m = strip(3, 2);
    let xs = vec![vec![1.5; 6]; 2];
    let ys = vec![vec![-2.0; 6]; 2];
    let h = HaloStitcher::new(&m);
    let (x, y) = h
        .extend_pair("west", &xs, &ys, 1, Staggering::Center, PairKind::Vector)
        .unwrap();
    assert_eq!(x.get(3, 1), Some(1.5));
    assert_eq!(y.get(3, 1), Some(-2.0));
    assert_eq!(x.get(-1, 1), Some(FILL));
}
