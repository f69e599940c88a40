//! Exchange-grid construction.
//!
//! Per target tile: source tiles are filtered on their wrap-aware boxes, then
//! target rows are processed in parallel. Each active target cell queries the
//! bucket index of every surviving source tile, box-tests the candidates and
//! clips itself against each candidate independently, so adjacent source
//! cells never share an implicitly owned edge. Rows produce local buffers
//! that are concatenated in row order, which already yields the documented
//! output ordering.

use log::{debug, info, warn};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::debug_invariants::DebugInvariants;
use crate::geometry::bounds::{LonLatBox, polygon_box};
use crate::geometry::polygon::SphericalPolygon;
use crate::geometry::sphere::xyz_to_lonlat;
use crate::mesh::{Mesh, Mosaic};
use crate::mosaic_error::MosaicError;
use crate::xgrid::bucket::BucketIndex;
use crate::xgrid::{ExchangeCell, ExchangeGrid, XgridMasks, XgridOptions};

macro_rules! maybe_par_iter {
    ($range:expr) => {{
        #[cfg(feature = "rayon")]
        {
            $range.into_par_iter()
        }
        #[cfg(not(feature = "rayon"))]
        {
            $range.into_iter()
        }
    }};
}

/// Box padding (radians) so rounding never drops a touching candidate.
const BOX_SLACK: f64 = 1e-10;

/// Allowed inward turn at a vertex, relative to cell area.
const CONVEX_TOL: f64 = 1e-6;

/// Width (radians) below which an overlap counts as an edge-touching sliver.
/// Scaled by the smaller cell perimeter, so the cut tracks cell size.
const SLIVER_WIDTH: f64 = 1e-14;

/// An active cell ready for clipping.
#[derive(Clone, Debug)]
pub(crate) struct PreparedCell {
    pub poly: SphericalPolygon,
    pub bbox: LonLatBox,
    pub area: f64,
    pub perimeter: f64,
}

/// Active cells of one tile (row-major, `None` when masked out) and their index.
#[derive(Debug)]
pub(crate) struct PreparedTile {
    pub cells: Vec<Option<PreparedCell>>,
    pub extent: Option<LonLatBox>,
}

/// Validate and prepare every active cell of `mesh`.
pub(crate) fn prepare_tile(
    mesh: &Mesh,
    mask: Option<&[f64]>,
    threshold: f64,
) -> Result<PreparedTile, MosaicError> {
    let (nx, ny) = (mesh.nx(), mesh.ny());
    let mut cells = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let active = mask.is_none_or(|m| m[j * nx + i] > threshold);
            cells.push(if active { Some(prepare_cell(mesh, i, j)?) } else { None });
        }
    }
    let extent = LonLatBox::union_all(cells.iter().flatten().map(|c| &c.bbox));
    Ok(PreparedTile { cells, extent })
}

fn prepare_cell(mesh: &Mesh, i: usize, j: usize) -> Result<PreparedCell, MosaicError> {
    let degenerate = |reason: &str| MosaicError::DegenerateGeometry {
        tile: mesh.tile().to_string(),
        i,
        j,
        reason: reason.to_string(),
    };
    let poly = mesh.cell_polygon_unchecked(i, j);
    if poly.len() < 3 {
        return Err(degenerate("cell collapses to fewer than three distinct corners"));
    }
    let area = poly.area();
    if !(area > 0.0) || !area.is_finite() {
        return Err(degenerate("zero-area cell"));
    }
    if !poly.is_convex(CONVEX_TOL * area) {
        return Err(degenerate("non-convex cell"));
    }
    let bbox = polygon_box(poly.vertices())
        .ok_or_else(|| degenerate("cell has no bounding box"))?
        .padded(BOX_SLACK);
    let perimeter = poly.perimeter();
    Ok(PreparedCell {
        poly,
        bbox,
        area,
        perimeter,
    })
}

/// Overlaps at or below this area are discarded: either a negligible fraction
/// of the smaller cell, or no wider than [`SLIVER_WIDTH`] along its boundary.
fn sliver_cut(t: &PreparedCell, s: &PreparedCell, min_area_ratio: f64) -> f64 {
    let by_ratio = min_area_ratio * t.area.min(s.area);
    let by_width = SLIVER_WIDTH * t.perimeter.min(s.perimeter);
    by_ratio.max(by_width)
}

/// Centroid `(lon, lat)` of a kept overlap. Dropping the overlap instead would
/// lose its area, so a missing centroid is an error on the target cell.
fn overlap_centroid(
    overlap: &SphericalPolygon,
    area: f64,
    tgt_mesh: &Mesh,
    i: usize,
    j: usize,
) -> Result<(f64, f64), MosaicError> {
    overlap
        .centroid()
        .map(xyz_to_lonlat)
        .ok_or_else(|| MosaicError::DegenerateGeometry {
            tile: tgt_mesh.tile().to_string(),
            i,
            j,
            reason: format!("overlap of area {area:e} has no centroid"),
        })
}

/// One target row intersected against the given source tiles.
fn intersect_row(
    tgt_tile: usize,
    tgt_mesh: &Mesh,
    tgt: &PreparedTile,
    j: usize,
    sources: &[(usize, &PreparedTile, &BucketIndex, usize)],
    options: &XgridOptions,
) -> Result<(Vec<ExchangeCell>, usize), MosaicError> {
    let nx = tgt_mesh.nx();
    let r2 = options.radius * options.radius;
    let mut out = Vec::new();
    let mut candidates = Vec::new();
    let mut busiest = 0usize;
    for i in 0..nx {
        let Some(t) = &tgt.cells[j * nx + i] else {
            continue;
        };
        let mut examined = 0usize;
        for (src_tile, src, index, src_nx) in sources {
            index.query(&t.bbox, &mut candidates);
            examined += candidates.len();
            if examined > options.max_candidates_per_cell {
                return Err(MosaicError::SearchBudgetExceeded {
                    tile: tgt_mesh.tile().to_string(),
                    i,
                    j,
                    candidates: examined,
                    budget: options.max_candidates_per_cell,
                });
            }
            for &id in &candidates {
                let id = id as usize;
                let Some(s) = &src.cells[id] else {
                    continue;
                };
                if !t.bbox.intersects(&s.bbox, 0.0) {
                    continue;
                }
                let overlap = t.poly.clip(&s.poly);
                let area = overlap.area();
                if area <= sliver_cut(t, s, options.min_area_ratio) {
                    continue;
                }
                let centroid = match options.order {
                    2 => Some(overlap_centroid(&overlap, area, tgt_mesh, i, j)?),
                    _ => None,
                };
                out.push(ExchangeCell {
                    src_tile: *src_tile,
                    src_i: id % src_nx,
                    src_j: id / src_nx,
                    tgt_tile,
                    tgt_i: i,
                    tgt_j: j,
                    area: area * r2,
                    centroid,
                });
            }
        }
        busiest = busiest.max(examined);
    }
    // Candidates come per source tile in ascending cell id, so within a target
    // cell the order is already (source tile, j, i).
    Ok((out, busiest))
}

/// Compute every overlap between the active cells of `source` and `target`.
///
/// Masks in `masks` override each mesh's own mask; a pair with an inactive
/// cell on either side is omitted. Overlaps below
/// `options.min_area_ratio` of the smaller cell, or edge-touching slivers no
/// wider than rounding, are discarded. Output is
/// sorted by target tile, target `j`, target `i`, then source tile, `j`, `i`.
///
/// Fails on the first unusable active cell ([`MosaicError::DegenerateGeometry`])
/// or when a target cell's candidate search exceeds
/// `options.max_candidates_per_cell`. Disjoint mosaics give an empty grid.
pub fn build_exchange_grid(
    source: &Mosaic,
    target: &Mosaic,
    options: &XgridOptions,
    masks: XgridMasks<'_>,
) -> Result<ExchangeGrid, MosaicError> {
    options.check()?;
    let src_masks = source.resolve_masks(masks.source)?;
    let tgt_masks = target.resolve_masks(masks.target)?;

    let src_prepared = source
        .tiles()
        .iter()
        .zip(&src_masks)
        .map(|(m, mask)| prepare_tile(m, *mask, options.mask_threshold))
        .collect::<Result<Vec<_>, _>>()?;
    let src_index: Vec<Option<BucketIndex>> = src_prepared
        .iter()
        .map(|prep| {
            let extent = prep.extent?;
            let boxes: Vec<Option<LonLatBox>> = prep
                .cells
                .iter()
                .map(|c| c.as_ref().map(|c| c.bbox))
                .collect();
            Some(BucketIndex::new(&extent, &boxes, options.bucket_density))
        })
        .collect();

    let mut cells = Vec::new();
    for (tgt_tile, tgt_mesh) in target.tiles().iter().enumerate() {
        let tgt = prepare_tile(tgt_mesh, tgt_masks[tgt_tile], options.mask_threshold)?;
        let Some(tgt_extent) = tgt.extent else {
            debug!("target tile `{}` has no active cells", tgt_mesh.tile());
            continue;
        };

        let sources: Vec<(usize, &PreparedTile, &BucketIndex, usize)> = src_prepared
            .iter()
            .zip(&src_index)
            .enumerate()
            .filter_map(|(s, (prep, index))| {
                let (extent, index) = (prep.extent?, index.as_ref()?);
                if !extent.intersects(&tgt_extent, 0.0) {
                    debug!(
                        "skip tile pair `{}` x `{}`: disjoint boxes",
                        source.tiles()[s].tile(),
                        tgt_mesh.tile()
                    );
                    return None;
                }
                Some((s, prep, index, source.tiles()[s].nx()))
            })
            .collect();
        if sources.is_empty() {
            continue;
        }

        let rows = maybe_par_iter!(0..tgt_mesh.ny())
            .map(|j| intersect_row(tgt_tile, tgt_mesh, &tgt, j, &sources, options))
            .collect::<Result<Vec<_>, _>>()?;
        let before = cells.len();
        let mut busiest = 0;
        for (row, row_busiest) in rows {
            cells.extend(row);
            busiest = busiest.max(row_busiest);
        }
        if busiest > options.max_candidates_per_cell / 2 {
            warn!(
                "target tile `{}`: busiest cell examined {busiest} candidates (budget {})",
                tgt_mesh.tile(),
                options.max_candidates_per_cell
            );
        }
        debug!(
            "target tile `{}`: {} overlaps from {} source tiles",
            tgt_mesh.tile(),
            cells.len() - before,
            sources.len()
        );
    }

    let grid = ExchangeGrid {
        cells,
        source_tiles: source.tiles().iter().map(|m| m.tile().to_string()).collect(),
        source_nx: source.tiles().iter().map(Mesh::nx).collect(),
        target_tiles: target.tiles().iter().map(|m| m.tile().to_string()).collect(),
        target_nx: target.tiles().iter().map(Mesh::nx).collect(),
        order: options.order,
        radius: options.radius,
    };
    grid.debug_assert_invariants();
    info!(
        "exchange grid `{}` -> `{}`: {} cells, total area {:.6e}",
        source.name(),
        target.name(),
        grid.len(),
        grid.total_area()
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshgen::lonlat_mesh;

    #[test]
    fn bowtie_cell_is_degenerate() {
        // Corners (1,0) and (1,1) swapped make cell (0,0) self-intersecting.
        let lon = vec![0.0, 0.1, 0.0, 0.1];
        let lat = vec![0.0, 0.1, 0.1, 0.0];
        let m = Mesh::new("bow", 1, 1, lon, lat).unwrap();
        let err = prepare_tile(&m, None, 0.5).unwrap_err();
        assert!(matches!(err, MosaicError::DegenerateGeometry { i: 0, j: 0, .. }));
    }

    #[test]
    fn overlap_without_centroid_is_an_error() {
        let m = lonlat_mesh("t", 2, 2, (0.0, 0.2), (0.0, 0.2)).unwrap();
        let err = overlap_centroid(&SphericalPolygon::default(), 1e-3, &m, 1, 0).unwrap_err();
        assert!(matches!(err, MosaicError::DegenerateGeometry { i: 1, j: 0, .. }));
        let cell = m.cell_polygon(1, 0).unwrap();
        let (lon, lat) = overlap_centroid(&cell, cell.area(), &m, 1, 0).unwrap();
        assert!(0.1 < lon && lon < 0.2 && 0.0 < lat && lat < 0.1);
    }

    #[test]
    fn sliver_cut_scales_with_cell_size() {
        for d in [1e-2, 1e-4, 1e-6] {
            let m = lonlat_mesh("t", 2, 1, (1.0, 1.0 + 2.0 * d), (0.3, 0.3 + d)).unwrap();
            let (a, b) = (prepare_cell(&m, 0, 0).unwrap(), prepare_cell(&m, 1, 0).unwrap());
            let cut = sliver_cut(&a, &b, 1e-12);
            // A strip a few ulps wide along the shared edge falls below the cut.
            assert!(4.0 * f64::EPSILON * d < cut, "d = {d}");
            assert!(cut < 1e-6 * a.area, "d = {d}");
        }
    }

    #[test]
    fn masked_cells_are_not_prepared() {
        let m = lonlat_mesh("t", 2, 1, (0.0, 0.2), (0.0, 0.1)).unwrap();
        let prep = prepare_tile(&m, Some(&[0.0, 1.0]), 0.5).unwrap();
        assert!(prep.cells[0].is_none());
        assert!(prep.cells[1].is_some());
    }
}
