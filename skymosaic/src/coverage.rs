//! Greedy scene selection for full tile coverage.
//!
//! Scenes are considered newest first. Each scene that intersects the tile
//! is kept; selection stops as soon as the union of kept footprints covers
//! the tile.

use geo::MultiPolygon;
use tracing::trace;

use crate::coord::Bound;
use crate::geometry;
use crate::search::Feature;

/// Coverage ratio treated as complete.
///
/// Clipping partially overlapping footprints loses area to snapping; a
/// shortfall under one pixel of a 256x256 tile counts as covered.
pub const FULL_COVERAGE: f64 = 1.0 - 1e-5;

/// Scenes chosen for a tile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Scene ids, newest first
    pub ids: Vec<String>,
    /// Fraction of the tile covered by the selected scenes
    pub coverage: f64,
}

impl Selection {
    pub fn is_complete(&self) -> bool {
        self.coverage >= FULL_COVERAGE
    }
}

/// Selects the scenes needed to cover `tile`.
///
/// `features` must be ordered newest acquisition first; the returned ids keep
/// that order. Scenes whose footprint misses the tile are skipped. If the
/// features cannot cover the tile, every intersecting scene is returned and
/// `coverage` reports the shortfall.
pub fn select_scenes(tile: &Bound, features: &[Feature]) -> Selection {
    let tile_area = tile.area();
    if tile_area <= 0.0 {
        return Selection::default();
    }

    let mut covered: MultiPolygon<f64> = geometry::empty();
    let mut selection = Selection::default();

    for feature in features {
        let clipped = geometry::clip(&feature.footprint, tile);
        if geometry::is_empty(&clipped) {
            continue;
        }

        covered = geometry::union(&covered, &clipped);
        selection.ids.push(feature.id.clone());
        selection.coverage = geometry::area(&covered) / tile_area;
        trace!(
            scene_id = %feature.id,
            coverage = selection.coverage,
            "Scene selected"
        );

        if selection.is_complete() {
            break;
        }
    }

    selection
}
