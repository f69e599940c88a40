//! Uniform lon/lat bucket index over the cells of one tile.
//!
//! The index spans the tile's own wrap-aware box, so a regional tile gets
//! fine buckets over its footprint instead of a coarse global grid. Cells
//! are registered in every bucket their (padded) box touches; queries
//! return deduplicated cell ids in ascending order.

use crate::geometry::bounds::{LonInterval, LonLatBox};
use crate::geometry::sphere::{TWO_PI, wrap_lon};

#[derive(Clone, Debug)]
pub struct BucketIndex {
    lon_start: f64,
    lon_width: f64,
    lat_min: f64,
    lat_span: f64,
    nlon: usize,
    nlat: usize,
    buckets: Vec<Vec<u32>>,
}

impl BucketIndex {
    /// Build an index over `boxes` (cell id = position) within `extent`,
    /// aiming for about `density` cells per bucket. `None` entries are skipped.
    pub fn new(extent: &LonLatBox, boxes: &[Option<LonLatBox>], density: f64) -> Self {
        let ncells = boxes.iter().filter(|b| b.is_some()).count().max(1);
        let target = (ncells as f64 / density.max(1e-3)).ceil().max(1.0);
        let lon_width = extent.lon.width().max(f64::EPSILON);
        let lat_span = (extent.lat_max - extent.lat_min).max(f64::EPSILON);
        let nlat = ((target * lat_span / lon_width).sqrt().round() as usize).clamp(1, 1 << 12);
        let nlon = ((target / nlat as f64).ceil() as usize).clamp(1, 1 << 12);
        let mut index = Self {
            lon_start: extent.lon.start(),
            lon_width,
            lat_min: extent.lat_min,
            lat_span,
            nlon,
            nlat,
            buckets: vec![Vec::new(); nlon * nlat],
        };
        for (id, b) in boxes.iter().enumerate() {
            if let Some(b) = b {
                index.for_each_bucket(b, |k, buckets| buckets[k].push(id as u32));
            }
        }
        index
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.nlon, self.nlat)
    }

    fn lon_slot(&self, offset: f64) -> usize {
        ((offset / self.lon_width * self.nlon as f64) as usize).min(self.nlon - 1)
    }

    fn lat_slot(&self, lat: f64) -> usize {
        let t = ((lat - self.lat_min) / self.lat_span).clamp(0.0, 1.0);
        ((t * self.nlat as f64) as usize).min(self.nlat - 1)
    }

    /// Bucket column ranges covered by `iv`, in offset space of the index.
    fn lon_ranges(&self, iv: &LonInterval) -> [Option<(usize, usize)>; 2] {
        if iv.is_full() {
            return [Some((0, self.nlon - 1)), None];
        }
        let o = wrap_lon(iv.start() - self.lon_start);
        let end = o + iv.width();
        let head = (o <= self.lon_width)
            .then(|| (self.lon_slot(o), self.lon_slot(end.min(self.lon_width))));
        let tail = (end > TWO_PI).then(|| (0, self.lon_slot((end - TWO_PI).min(self.lon_width))));
        [head, tail]
    }

    fn for_each_bucket(&mut self, b: &LonLatBox, mut f: impl FnMut(usize, &mut Vec<Vec<u32>>)) {
        let (j0, j1) = (self.lat_slot(b.lat_min), self.lat_slot(b.lat_max));
        for (i0, i1) in self.lon_ranges(&b.lon).into_iter().flatten() {
            for j in j0..=j1 {
                for i in i0..=i1 {
                    f(j * self.nlon + i, &mut self.buckets);
                }
            }
        }
    }

    /// Cell ids whose buckets overlap `query`, sorted and deduplicated into `out`.
    pub fn query(&self, query: &LonLatBox, out: &mut Vec<u32>) {
        out.clear();
        if query.lat_max < self.lat_min || query.lat_min > self.lat_min + self.lat_span {
            return;
        }
        let (j0, j1) = (self.lat_slot(query.lat_min), self.lat_slot(query.lat_max));
        for (i0, i1) in self.lon_ranges(&query.lon).into_iter().flatten() {
            for j in j0..=j1 {
                for i in i0..=i1 {
                    out.extend_from_slice(&self.buckets[j * self.nlon + i]);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
    }
}
