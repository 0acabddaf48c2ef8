//! Coordinate type definitions

use geo::{Coord, MultiPolygon, Rect};
use std::fmt;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels served by the upstream tile endpoint
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;

/// Tile coordinates in the Web Mercator / Slippy Map system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// X coordinate (east-west), 0 at west
    pub x: u32,
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileCoord {
    /// Creates a tile coordinate, rejecting positions outside the zoom level.
    pub fn new(x: u32, y: u32, zoom: u8) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let n = tiles_per_side(zoom);
        if u64::from(x) >= n || u64::from(y) >= n {
            return Err(CoordError::OutOfRange { x, y, zoom });
        }
        Ok(Self { x, y, zoom })
    }

    /// Returns the geographic footprint of this tile.
    #[inline]
    pub fn bound(&self) -> Bound {
        self.padded_bound(0)
    }

    /// Returns the footprint of this tile expanded by `padding` tiles on
    /// every side, clamped to the edge of the world.
    pub fn padded_bound(&self, padding: u32) -> Bound {
        let n = tiles_per_side(self.zoom);
        let min_x = u64::from(self.x.saturating_sub(padding));
        let min_y = u64::from(self.y.saturating_sub(padding));
        let max_x = (u64::from(self.x) + 1 + u64::from(padding)).min(n);
        let max_y = (u64::from(self.y) + 1 + u64::from(padding)).min(n);

        // Row numbers grow southwards, so the north edge comes from min_y.
        Bound::new(
            Coord {
                x: tile_x_to_lon(min_x, self.zoom),
                y: tile_y_to_lat(max_y, self.zoom),
            },
            Coord {
                x: tile_x_to_lon(max_x, self.zoom),
                y: tile_y_to_lat(min_y, self.zoom),
            },
        )
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Axis-aligned rectangle in lon/lat degrees.
///
/// Used both as a tile footprint and as the region of a cached search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub min: Coord<f64>,
    pub max: Coord<f64>,
}

impl Bound {
    /// Creates a bound from two opposite corners in any order.
    pub fn new(a: Coord<f64>, b: Coord<f64>) -> Self {
        Self {
            min: Coord {
                x: a.x.min(b.x),
                y: a.y.min(b.y),
            },
            max: Coord {
                x: a.x.max(b.x),
                y: a.y.max(b.y),
            },
        }
    }

    /// True if the point lies inside or on the edge of this bound.
    #[inline]
    pub fn contains_point(&self, p: Coord<f64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// True if both extreme corners of `other` lie within this bound.
    #[inline]
    pub fn contains(&self, other: &Bound) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Planar area in square degrees.
    #[inline]
    pub fn area(&self) -> f64 {
        (self.max.x - self.min.x) * (self.max.y - self.min.y)
    }

    /// Converts this bound into a single-polygon multipolygon.
    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Rect::new(self.min, self.max).to_polygon()])
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude is outside valid range (-85.05112878 to 85.05112878)
    InvalidLatitude(f64),
    /// Longitude is outside valid range (-180.0 to 180.0)
    InvalidLongitude(f64),
    /// Zoom level is outside valid range
    InvalidZoom(u8),
    /// Tile position does not exist at this zoom level
    OutOfRange { x: u32, y: u32, zoom: u8 },
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(
                    f,
                    "Invalid latitude: {} (must be between {} and {})",
                    lat, MIN_LAT, MAX_LAT
                )
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be between {} and {})",
                    lon, MIN_LON, MAX_LON
                )
            }
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Invalid zoom level: {} (must be between {} and {})",
                    zoom, MIN_ZOOM, MAX_ZOOM
                )
            }
            CoordError::OutOfRange { x, y, zoom } => {
                write!(f, "Tile ({}, {}) does not exist at zoom {}", x, y, zoom)
            }
        }
    }
}

impl std::error::Error for CoordError {}

#[inline]
pub(super) fn tiles_per_side(zoom: u8) -> u64 {
    1u64 << zoom
}

#[inline]
pub(super) fn tile_x_to_lon(x: u64, zoom: u8) -> f64 {
    x as f64 / tiles_per_side(zoom) as f64 * 360.0 - 180.0
}

#[inline]
pub(super) fn tile_y_to_lat(y: u64, zoom: u8) -> f64 {
    let n = tiles_per_side(zoom) as f64;
    let lat_rad = (std::f64::consts::PI * (1.0 - 2.0 * y as f64 / n))
        .sinh()
        .atan();
    lat_rad.to_degrees()
}
