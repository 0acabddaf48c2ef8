//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile coordinates, plus the lon/lat [`Bound`] used as the
//! planar space for clipping, coverage and cache containment.

mod types;

pub use types::{
    Bound, CoordError, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;
use types::{tile_x_to_lon, tile_y_to_lat, tiles_per_side};

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = tiles_per_side(zoom) as f64;
    let max_index = (tiles_per_side(zoom) - 1) as u32;

    let x = ((lon + 180.0) / 360.0 * n) as u32;
    let lat_rad = lat * PI / 180.0;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32;

    // lon == 180.0 lands exactly on the east edge
    Ok(TileCoord {
        x: x.min(max_index),
        y: y.min(max_index),
        zoom,
    })
}

/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    (
        tile_y_to_lat(u64::from(tile.y), tile.zoom),
        tile_x_to_lon(u64::from(tile.x), tile.zoom),
    )
}
