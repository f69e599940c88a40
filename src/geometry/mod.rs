//! Spherical geometry for mosaic-xgrid.
//!
//! This module owns the numerical kernels the exchange grid is built on:
//! unit-vector algebra, wrap-aware bounding boxes and geodesic polygon
//! clipping with spherical-excess areas.

pub mod bounds;
pub mod polygon;
pub mod sphere;

pub use bounds::{LonInterval, LonLatBox};
pub use polygon::SphericalPolygon;
pub use sphere::{EARTH_RADIUS, Vec3};
