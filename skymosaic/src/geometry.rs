//! Planar polygon operations used for coverage accounting.
//!
//! All geometry lives in lon/lat degree space, the same space tile bounds are
//! expressed in, so clipped areas and tile areas are directly comparable.
//! Union and clipping are true boolean operations (`geo::BooleanOps`); a
//! convex hull would over-count covered area.

use crate::coord::Bound;
use geo::{Area, BooleanOps, Contains, MultiPolygon};

/// Returns an empty multipolygon.
#[inline]
pub fn empty() -> MultiPolygon<f64> {
    MultiPolygon::new(Vec::new())
}

/// True if the multipolygon has no polygons or encloses no area.
#[inline]
pub fn is_empty(polygon: &MultiPolygon<f64>) -> bool {
    polygon.0.is_empty() || area(polygon) == 0.0
}

/// Unsigned planar area.
#[inline]
pub fn area(polygon: &MultiPolygon<f64>) -> f64 {
    polygon.unsigned_area()
}

/// Clips a polygon to an axis-aligned bound.
///
/// A polygon that contains the whole bound clips to the bound itself.
/// `BooleanOps` snaps to a grid sized by the inputs' extent, so intersecting
/// a footprint many times larger than the bound loses a little area.
pub fn clip(polygon: &MultiPolygon<f64>, bound: &Bound) -> MultiPolygon<f64> {
    if polygon.0.is_empty() {
        return empty();
    }
    let window = bound.to_multi_polygon();
    if polygon.contains(&window) {
        return window;
    }
    polygon.intersection(&window)
}

/// Boolean union of two polygons.
///
/// An empty operand is the identity: the other operand is returned unchanged.
pub fn union(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if a.0.is_empty() {
        return b.clone();
    }
    if b.0.is_empty() {
        return a.clone();
    }
    a.union(b)
}
