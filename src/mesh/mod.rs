//! Logically-rectangular curvilinear tiles.
//!
//! A [`Mesh`] holds the corner longitudes/latitudes (radians) of an `nx × ny`
//! cell tile, row-major with `ny + 1` rows of `nx + 1` corners. Cell `(i, j)` is
//! bounded by corners `(i, j)`, `(i + 1, j)`, `(i + 1, j + 1)`, `(i, j + 1)`.
//!
//! Meshes are immutable once built; [`Mesh::window`] and
//! [`Mesh::extend_to_south_pole`] return new meshes.

pub mod mosaic;

use std::f64::consts::FRAC_PI_2;
use std::ops::Range;

use itertools::iproduct;

use crate::geometry::bounds::{LonLatBox, polygon_box};
use crate::geometry::polygon::SphericalPolygon;
use crate::geometry::sphere::{Vec3, lonlat_to_xyz};
use crate::mosaic_error::MosaicError;

pub use mosaic::{Mosaic, MosaicShape, TileMasks};

/// Mask values above this count as active cells.
pub const DEFAULT_MASK_THRESHOLD: f64 = 0.5;

/// One tile of a mosaic.
#[derive(Clone, Debug)]
pub struct Mesh {
    tile: String,
    nx: usize,
    ny: usize,
    lon: Vec<f64>,
    lat: Vec<f64>,
    xyz: Vec<Vec3>,
    mask: Option<Vec<f64>>,
    cell_area: Option<Vec<f64>>,
}

impl Mesh {
    /// Build a tile from corner arrays of length `(nx + 1) * (ny + 1)`.
    ///
    /// Fails with [`MosaicError::ShapeMismatch`] for wrong lengths or empty
    /// extents and [`MosaicError::DegenerateGeometry`] for non-finite corners.
    pub fn new(
        tile: impl Into<String>,
        nx: usize,
        ny: usize,
        lon: Vec<f64>,
        lat: Vec<f64>,
    ) -> Result<Self, MosaicError> {
        let tile = tile.into();
        if nx == 0 || ny == 0 {
            return Err(MosaicError::ShapeMismatch {
                tile,
                what: "cell extent",
                expected: 1,
                found: 0,
            });
        }
        let ncorners = (nx + 1) * (ny + 1);
        for (what, arr) in [("lon", &lon), ("lat", &lat)] {
            if arr.len() != ncorners {
                return Err(MosaicError::ShapeMismatch {
                    tile,
                    what,
                    expected: ncorners,
                    found: arr.len(),
                });
            }
        }
        let mut xyz = Vec::with_capacity(ncorners);
        for (k, (&x, &y)) in lon.iter().zip(lat.iter()).enumerate() {
            if !x.is_finite() || !y.is_finite() || y.abs() > FRAC_PI_2 + 1e-12 {
                return Err(MosaicError::DegenerateGeometry {
                    tile,
                    i: k % (nx + 1),
                    j: k / (nx + 1),
                    reason: format!("invalid corner coordinate (lon={x}, lat={y})"),
                });
            }
            xyz.push(lonlat_to_xyz(x, y.clamp(-FRAC_PI_2, FRAC_PI_2)));
        }
        Ok(Self {
            tile,
            nx,
            ny,
            lon,
            lat,
            xyz,
            mask: None,
            cell_area: None,
        })
    }

    /// Attach a per-cell mask (`ny * nx` values, 1.0 active, 0.0 excluded).
    pub fn with_mask(mut self, mask: Vec<f64>) -> Result<Self, MosaicError> {
        self.check_cell_array("mask", mask.len())?;
        self.mask = Some(mask);
        Ok(self)
    }

    /// Attach precomputed cell areas (`ny * nx` values).
    pub fn with_cell_area(mut self, area: Vec<f64>) -> Result<Self, MosaicError> {
        self.check_cell_array("cell_area", area.len())?;
        self.cell_area = Some(area);
        Ok(self)
    }

    pub(crate) fn check_cell_array(
        &self,
        what: &'static str,
        len: usize,
    ) -> Result<(), MosaicError> {
        if len != self.num_cells() {
            return Err(MosaicError::ShapeMismatch {
                tile: self.tile.clone(),
                what,
                expected: self.num_cells(),
                found: len,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn tile(&self) -> &str {
        &self.tile
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Corner count along x (`nx + 1`).
    #[inline]
    pub fn nxp(&self) -> usize {
        self.nx + 1
    }

    /// Corner count along y (`ny + 1`).
    #[inline]
    pub fn nyp(&self) -> usize {
        self.ny + 1
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.nx * self.ny
    }

    #[inline]
    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    #[inline]
    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    #[inline]
    pub fn mask(&self) -> Option<&[f64]> {
        self.mask.as_deref()
    }

    /// Precomputed areas supplied by the mesh source, if any.
    #[inline]
    pub fn provided_cell_area(&self) -> Option<&[f64]> {
        self.cell_area.as_deref()
    }

    /// Flattened cell index `j * nx + i`.
    #[inline]
    pub fn flat_index(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    fn out_of_range(&self, i: usize, j: usize) -> MosaicError {
        MosaicError::IndexOutOfRange {
            tile: self.tile.clone(),
            i,
            j,
            nx: self.nx,
            ny: self.ny,
        }
    }

    /// Corner `(i, j)` as `(lon, lat)`, with `i <= nx`, `j <= ny`.
    pub fn corner(&self, i: usize, j: usize) -> Result<(f64, f64), MosaicError> {
        if i > self.nx || j > self.ny {
            return Err(self.out_of_range(i, j));
        }
        let k = j * self.nxp() + i;
        Ok((self.lon[k], self.lat[k]))
    }

    /// Corner `(i, j)` as a unit vector. Caller guarantees the range.
    #[inline]
    pub(crate) fn corner_xyz(&self, i: usize, j: usize) -> Vec3 {
        self.xyz[j * (self.nx + 1) + i]
    }

    /// The four corners of cell `(i, j)` in `(i,j), (i+1,j), (i+1,j+1), (i,j+1)` order.
    pub fn cell_corners(&self, i: usize, j: usize) -> Result<[(f64, f64); 4], MosaicError> {
        if i >= self.nx || j >= self.ny {
            return Err(self.out_of_range(i, j));
        }
        let nxp = self.nxp();
        let at = |ii: usize, jj: usize| {
            let k = jj * nxp + ii;
            (self.lon[k], self.lat[k])
        };
        Ok([at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1)])
    }

    /// Cell `(i, j)` as a counter-clockwise geodesic polygon with repeated
    /// corners (e.g. collapsed onto a pole) merged.
    pub fn cell_polygon(&self, i: usize, j: usize) -> Result<SphericalPolygon, MosaicError> {
        if i >= self.nx || j >= self.ny {
            return Err(self.out_of_range(i, j));
        }
        Ok(self.cell_polygon_unchecked(i, j))
    }

    pub(crate) fn cell_polygon_unchecked(&self, i: usize, j: usize) -> SphericalPolygon {
        SphericalPolygon::new([
            self.corner_xyz(i, j),
            self.corner_xyz(i + 1, j),
            self.corner_xyz(i + 1, j + 1),
            self.corner_xyz(i, j + 1),
        ])
        .into_ccw()
    }

    /// Area of cell `(i, j)` in steradians: the attached cell area when one
    /// was provided, the spherical excess of the cell polygon otherwise.
    pub fn cell_area(&self, i: usize, j: usize) -> Result<f64, MosaicError> {
        if i >= self.nx || j >= self.ny {
            return Err(self.out_of_range(i, j));
        }
        Ok(match &self.cell_area {
            Some(area) => area[self.flat_index(i, j)],
            None => self.cell_polygon_unchecked(i, j).area(),
        })
    }

    /// Area of every cell in steradians, row-major; see [`Mesh::cell_area`].
    pub fn cell_areas(&self) -> Vec<f64> {
        match &self.cell_area {
            Some(area) => area.clone(),
            None => self.geometric_cell_areas(),
        }
    }

    /// Spherical-excess area of every cell, ignoring any attached areas.
    pub fn geometric_cell_areas(&self) -> Vec<f64> {
        iproduct!(0..self.ny, 0..self.nx)
            .map(|(j, i)| self.cell_polygon_unchecked(i, j).area())
            .collect()
    }

    /// Whether cell `(i, j)` is active under the attached mask.
    #[inline]
    pub fn is_active(&self, i: usize, j: usize, threshold: f64) -> bool {
        self.mask
            .as_ref()
            .is_none_or(|m| m[self.flat_index(i, j)] > threshold)
    }

    /// Wrap-aware box of cell `(i, j)`.
    pub fn cell_box(&self, i: usize, j: usize) -> Result<LonLatBox, MosaicError> {
        let poly = self.cell_polygon(i, j)?;
        polygon_box(poly.vertices()).ok_or_else(|| MosaicError::DegenerateGeometry {
            tile: self.tile.clone(),
            i,
            j,
            reason: "cell collapses to nothing".into(),
        })
    }

    /// Wrap-aware box of the whole tile: the union of its cell boxes, so a
    /// tile crossing the 0/2π seam reports one arc and polar tiles report the
    /// full longitude range.
    pub fn bounding_box(&self) -> LonLatBox {
        let boxes: Vec<LonLatBox> = iproduct!(0..self.ny, 0..self.nx)
            .filter_map(|(j, i)| polygon_box(self.cell_polygon_unchecked(i, j).vertices()))
            .collect();
        LonLatBox::union_all(&boxes).unwrap_or(LonLatBox {
            lon: crate::geometry::LonInterval::full(),
            lat_min: -FRAC_PI_2,
            lat_max: FRAC_PI_2,
        })
    }

    /// Sub-window of cells `i_range × j_range` as a new tile named `tile`.
    pub fn window(
        &self,
        tile: impl Into<String>,
        i_range: Range<usize>,
        j_range: Range<usize>,
    ) -> Result<Mesh, MosaicError> {
        if i_range.is_empty()
            || j_range.is_empty()
            || i_range.end > self.nx
            || j_range.end > self.ny
        {
            return Err(self.out_of_range(i_range.end, j_range.end));
        }
        let nxp = self.nxp();
        let mut lon = Vec::with_capacity((i_range.len() + 1) * (j_range.len() + 1));
        let mut lat = Vec::with_capacity(lon.capacity());
        for j in j_range.start..=j_range.end {
            for i in i_range.start..=i_range.end {
                lon.push(self.lon[j * nxp + i]);
                lat.push(self.lat[j * nxp + i]);
            }
        }
        let mut out = Mesh::new(tile, i_range.len(), j_range.len(), lon, lat)?;
        let pick = |arr: &[f64]| -> Vec<f64> {
            iproduct!(j_range.clone(), i_range.clone())
                .map(|(j, i)| arr[j * self.nx + i])
                .collect()
        };
        out.mask = self.mask.as_deref().map(&pick);
        out.cell_area = self.cell_area.as_deref().map(&pick);
        Ok(out)
    }

    /// Add a southern row collapsed onto the south pole, for ocean tiles that
    /// stop short of Antarctica. The new row of cells is masked out.
    ///
    /// Returns `None` when the southern boundary already reaches the pole.
    pub fn extend_to_south_pole(&self) -> Result<Option<Mesh>, MosaicError> {
        const TINY: f64 = 1e-7;
        let nxp = self.nxp();
        let south_min = self.lat[..nxp].iter().copied().fold(f64::INFINITY, f64::min);
        if south_min <= -FRAC_PI_2 + TINY {
            return Ok(None);
        }
        let mut lon = Vec::with_capacity(self.lon.len() + nxp);
        lon.extend_from_slice(&self.lon[..nxp]);
        lon.extend_from_slice(&self.lon);
        let mut lat = vec![-FRAC_PI_2; nxp];
        lat.extend_from_slice(&self.lat);

        let mut mask = vec![0.0; self.nx];
        match &self.mask {
            Some(m) => mask.extend_from_slice(m),
            None => mask.extend(std::iter::repeat_n(1.0, self.num_cells())),
        }
        let mut out =
            Mesh::new(self.tile.clone(), self.nx, self.ny + 1, lon, lat)?.with_mask(mask)?;
        if let Some(area) = &self.cell_area {
            let mut extended = out.geometric_cell_areas();
            extended.truncate(self.nx);
            extended.extend_from_slice(area);
            out.cell_area = Some(extended);
        }
        Ok(Some(out))
    }
}
