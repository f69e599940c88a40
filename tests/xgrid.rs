mod util;
use std::collections::BTreeSet;

use mosaic_xgrid::geometry::sphere::TWO_PI;
use mosaic_xgrid::prelude::*;
use util::*;

fn build(src: &Mosaic, tgt: &Mosaic) -> ExchangeGrid {
    build_exchange_grid(src, tgt, &XgridOptions::default(), XgridMasks::default()).unwrap()
}

#[test]
fn cube_onto_global_lonlat_conserves_area() {
    let (src, tgt) = (cube(4), global(12, 6));
    let x = build(&src, &tgt);
    assert!(!x.is_empty());
    assert_close(x.total_area(), sphere_area(), 1e-9);

    let report = x.conservation_report(&tgt, 1e-9, true).unwrap();
    assert!(report.is_clean(), "{:?}", report.diagnostics.first());
    assert_eq!(report.checked, 72);

    // Both ways round: every source cell is covered too.
    let back = x.swapped().conservation_report(&src, 1e-9, true).unwrap();
    assert!(back.is_clean(), "{:?}", back.diagnostics.first());
}

#[test]
fn swapping_roles_gives_the_same_overlaps() {
    let (a, b) = (cube(3), global(8, 4));
    let forward = build(&a, &b).swapped();
    let backward = build(&b, &a);
    assert_eq!(forward.len(), backward.len());
    for (f, g) in forward.iter().zip(&backward) {
        assert_eq!(f.sort_key(), g.sort_key());
        assert_close(f.area, g.area, 1e-9);
    }
    assert_eq!(forward.source_tiles(), backward.source_tiles());
}

#[test]
fn identical_meshes_pair_cells_one_to_one() {
    let m = regional("a", 5, 4, (0.1, 0.6), (-0.2, 0.2));
    let x = build(&m, &m);
    assert_eq!(x.len(), 20);
    let areas = m.tiles()[0].cell_areas();
    for c in &x {
        assert_eq!((c.src_i, c.src_j), (c.tgt_i, c.tgt_j));
        assert_close(c.area, areas[c.tgt_j * 5 + c.tgt_i], 1e-12);
    }
}

#[test]
fn small_identical_cells_stay_one_to_one() {
    for d in [1e-3, 1e-4, 1e-6] {
        let m = regional("m", 7, 5, (1.0, 1.0 + 7.0 * d), (0.3, 0.3 + 5.0 * d));
        let x = build(&m, &m);
        assert_eq!(x.len(), 35, "cell size {d}");
        assert!(
            x.iter().all(|c| (c.src_i, c.src_j) == (c.tgt_i, c.tgt_j)),
            "cell size {d}: overlap leaked into a neighbour"
        );
        let report = x.conservation_report(&m, 1e-9, true).unwrap();
        assert!(report.is_clean(), "cell size {d}: {:?}", report.diagnostics.first());
        assert!(report.max_relative_error < 1e-9);
    }
}

#[test]
fn small_nested_cells_conserve_area() {
    let d = 1e-4;
    let fine = regional("fine", 6, 4, (1.0, 1.0 + 6.0 * d), (0.3, 0.3 + 4.0 * d));
    let coarse = regional("coarse", 3, 2, (1.0, 1.0 + 6.0 * d), (0.3, 0.3 + 4.0 * d));
    let x = build(&fine, &coarse);
    assert_eq!(x.len(), 24);
    let report = x.conservation_report(&coarse, 1e-9, true).unwrap();
    assert!(report.is_clean(), "{:?}", report.diagnostics.first());
    let back = x.swapped().conservation_report(&fine, 1e-9, true).unwrap();
    assert!(back.is_clean(), "{:?}", back.diagnostics.first());
}

#[test]
fn center_sub_window_gives_four_cells() {
    let src = regional("big", 4, 4, (0.0, 0.4), (0.0, 0.4));
    let window = src.tiles()[0].window("tile1", 1..3, 1..3).unwrap();
    let tgt = Mosaic::with_tiles("small", MosaicShape::Regional, [window]).unwrap();
    let x = build(&src, &tgt);
    assert_eq!(x.len(), 4);
    let areas = tgt.tiles()[0].cell_areas();
    for c in &x {
        assert_eq!((c.src_i, c.src_j), (c.tgt_i + 1, c.tgt_j + 1));
        assert_close(c.area, areas[c.tgt_j * 2 + c.tgt_i], 1e-12);
    }
    let coverage = x.coverage(&tgt).unwrap();
    for f in &coverage[0] {
        assert_close(*f, 1.0, 1e-12);
    }
}

#[test]
fn disjoint_mosaics_give_an_empty_grid() {
    let a = regional("a", 3, 3, (0.0, 0.3), (0.0, 0.3));
    let b = regional("b", 3, 3, (2.0, 2.3), (-0.5, -0.2));
    let x = build(&a, &b);
    assert!(x.is_empty());
    assert_eq!(x.total_area(), 0.0);
    assert!(x.records_by_target_tile().is_empty());
}

#[test]
fn rebuilding_is_idempotent() {
    let (a, b) = (cube(3), global(10, 5));
    let first = build(&a, &b);
    let second = build(&a, &b);
    assert_eq!(first, second);
}

#[test]
fn output_is_sorted_and_valid() {
    let x = build(&global(7, 5), &cube(3));
    assert!(x.cells().windows(2).all(|w| w[0].sort_key() < w[1].sort_key()));
    assert!(x.validate_invariants().is_ok());
}

#[test]
fn masked_cells_never_appear() {
    let src = regional("src", 4, 4, (0.0, 0.4), (0.0, 0.4));
    let tgt = regional("tgt", 3, 3, (0.0, 0.4), (0.0, 0.4));
    let mut src_mask = mosaic_xgrid::mesh::TileMasks::new();
    src_mask.insert("tile1".into(), (0..16).map(|k| if k == 5 { 0.0 } else { 1.0 }).collect());
    let mut tgt_mask = mosaic_xgrid::mesh::TileMasks::new();
    tgt_mask.insert("tile1".into(), (0..9).map(|k| if k == 4 { 0.0 } else { 1.0 }).collect());
    let masks = XgridMasks {
        source: Some(&src_mask),
        target: Some(&tgt_mask),
    };
    let x = build_exchange_grid(&src, &tgt, &XgridOptions::default(), masks).unwrap();
    assert!(!x.is_empty());
    for c in &x {
        assert_ne!((c.src_i, c.src_j), (1, 1));
        assert_ne!((c.tgt_i, c.tgt_j), (1, 1));
    }
    let coverage = x.coverage(&tgt).unwrap();
    assert_eq!(coverage[0][4], 0.0);
    // Partial coverage is not an over-coverage violation.
    assert!(x.conservation_report(&tgt, 1e-9, false).unwrap().is_clean());
    assert!(!x.conservation_report(&tgt, 1e-9, true).unwrap().is_clean());
}

#[test]
fn mesh_masks_apply_without_overrides() {
    let mesh = mosaic_xgrid::meshgen::lonlat_mesh("tile1", 2, 2, (0.0, 0.2), (0.0, 0.2))
        .unwrap()
        .with_mask(vec![1.0, 0.0, 1.0, 1.0])
        .unwrap();
    let src = Mosaic::with_tiles("masked", MosaicShape::Regional, [mesh]).unwrap();
    let tgt = regional("t", 1, 1, (0.0, 0.2), (0.0, 0.2));
    let x = build(&src, &tgt);
    let used: BTreeSet<(usize, usize)> = x.iter().map(|c| (c.src_i, c.src_j)).collect();
    assert_eq!(used, BTreeSet::from([(0, 0), (0, 1), (1, 1)]));
}

#[test]
fn seam_crossing_tiles_overlap() {
    let a = regional("a", 4, 2, (-0.2, 0.2), (0.0, 0.2));
    // Same corners as the middle of `a`, written past 2π.
    let b = regional("b", 2, 2, (TWO_PI - 0.1, TWO_PI + 0.1), (0.0, 0.2));
    let x = build(&a, &b);
    assert!(!x.is_empty());
    let covered = x.covered_area(&b).unwrap();
    let areas = b.tiles()[0].cell_areas();
    for (c, want) in covered[0].iter().zip(&areas) {
        assert_close(*c, *want, 1e-9);
    }
}

#[test]
fn order_two_records_centroids_inside_the_target_cell() {
    let src = regional("src", 3, 3, (0.0, 0.3), (0.0, 0.3));
    let tgt = regional("tgt", 2, 2, (0.05, 0.25), (0.05, 0.25));
    let options = XgridOptions {
        order: 2,
        ..XgridOptions::default()
    };
    let x = build_exchange_grid(&src, &tgt, &options, XgridMasks::default()).unwrap();
    assert_eq!(x.order(), 2);
    let tgt_mesh = &tgt.tiles()[0];
    for c in &x {
        let (lon, lat) = c.centroid.unwrap();
        let (lon0, lat0) = tgt_mesh.corner(c.tgt_i, c.tgt_j).unwrap();
        let (lon1, lat1) = tgt_mesh.corner(c.tgt_i + 1, c.tgt_j + 1).unwrap();
        assert!(lon0 < lon && lon < lon1);
        assert!(lat0 - 1e-3 < lat && lat < lat1 + 1e-3);
    }
}

#[test]
fn radius_scales_areas() {
    let m = regional("a", 2, 2, (0.0, 0.2), (0.0, 0.2));
    let options = XgridOptions {
        radius: 2.0,
        ..XgridOptions::default()
    };
    let unit = build(&m, &m);
    let scaled = build_exchange_grid(&m, &m, &options, XgridMasks::default()).unwrap();
    assert_close(scaled.total_area(), 4.0 * unit.total_area(), 1e-12);
    assert!(scaled.conservation_report(&m, 1e-9, true).unwrap().is_clean());
}

#[test]
fn invalid_options_are_rejected() {
    let m = regional("a", 2, 2, (0.0, 0.2), (0.0, 0.2));
    let bad_order = XgridOptions {
        order: 3,
        ..XgridOptions::default()
    };
    assert_eq!(
        build_exchange_grid(&m, &m, &bad_order, XgridMasks::default()),
        Err(MosaicError::InvalidOrder(3))
    );
    let bad_radius = XgridOptions {
        radius: -1.0,
        ..XgridOptions::default()
    };
    assert!(matches!(
        build_exchange_grid(&m, &m, &bad_radius, XgridMasks::default()),
        Err(MosaicError::InvalidOptions { name: "radius", .. })
    ));
}

#[test]
fn search_budget_is_enforced() {
    let fine = regional("fine", 8, 8, (0.0, 0.4), (0.0, 0.4));
    let coarse = regional("coarse", 1, 1, (0.0, 0.4), (0.0, 0.4));
    let options = XgridOptions {
        max_candidates_per_cell: 4,
        ..XgridOptions::default()
    };
    let err = build_exchange_grid(&fine, &coarse, &options, XgridMasks::default()).unwrap_err();
    assert!(matches!(err, MosaicError::SearchBudgetExceeded { budget: 4, .. }), "{err:?}");
}

#[test]
fn unknown_mask_tile_is_rejected() {
    let m = regional("a", 2, 2, (0.0, 0.2), (0.0, 0.2));
    let mut masks = mosaic_xgrid::mesh::TileMasks::new();
    masks.insert("tile7".into(), vec![1.0; 4]);
    let err = build_exchange_grid(
        &m,
        &m,
        &XgridOptions::default(),
        XgridMasks {
            source: Some(&masks),
            target: None,
        },
    )
    .unwrap_err();
    assert_eq!(err, MosaicError::UnknownTile("tile7".into()));
}

#[test]
fn records_flatten_indices_and_survive_json() {
    let src = regional("src", 4, 4, (0.0, 0.4), (0.0, 0.4));
    let tgt = regional("tgt", 2, 2, (0.0, 0.4), (0.0, 0.4));
    let x = build(&src, &tgt);
    let records = x.records_by_target_tile();
    assert_eq!(records.keys().map(String::as_str).collect::<Vec<_>>(), vec!["tile1"]);
    let recs = &records["tile1"];
    assert_eq!(recs.len(), x.len());
    for (r, c) in recs.iter().zip(&x) {
        assert_eq!(r.src_ij, c.src_j * 4 + c.src_i);
        assert_eq!(r.tgt_ij, c.tgt_j * 2 + c.tgt_i);
        assert_eq!(r.src_tile, "tile1");
    }

    let json = serde_json::to_string(recs).unwrap();
    let back: Vec<XgridRecord> = serde_json::from_str(&json).unwrap();
    assert_eq!(&back, recs);
}

#[test]
fn options_load_from_partial_json() {
    let options: XgridOptions = serde_json::from_str(r#"{"order": 2, "radius": 6371000.0}"#)
        .unwrap();
    assert_eq!(options.order, 2);
    assert_eq!(options.radius, 6_371_000.0);
    assert_eq!(options.min_area_ratio, XgridOptions::default().min_area_ratio);
}
