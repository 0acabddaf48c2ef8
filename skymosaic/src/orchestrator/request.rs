//! Tile queries and their validation.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use std::fmt;

use crate::coord::{CoordError, TileCoord};
use crate::error::ValidationError;

/// Which scenes a tile is assembled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// One explicit scene
    Scene(String),
    /// Mosaic of the scenes acquired on a calendar date
    Date(NaiveDate),
    /// Mosaic of one satellite's scenes around an instant
    SatellitePass {
        satellite_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl Selector {
    /// Cache group for selectors that search; `None` for explicit scenes.
    pub fn group_key(&self) -> Option<GroupKey> {
        match self {
            Selector::Scene(_) => None,
            Selector::Date(date) => Some(GroupKey::Date(*date)),
            Selector::SatellitePass {
                satellite_id,
                timestamp,
            } => Some(GroupKey::SatellitePass {
                satellite_id: satellite_id.clone(),
                timestamp: timestamp.timestamp(),
            }),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Scene(id) => write!(f, "scene {}", id),
            Selector::Date(date) => write!(f, "date {}", date),
            Selector::SatellitePass {
                satellite_id,
                timestamp,
            } => write!(f, "pass {}@{}", satellite_id, timestamp.timestamp()),
        }
    }
}

/// Key under which search results are cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Date(NaiveDate),
    SatellitePass { satellite_id: String, timestamp: i64 },
}

/// Raw request parameters, as they arrive from a URL or command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileParams<'a> {
    pub z: &'a str,
    pub x: &'a str,
    pub y: &'a str,
    pub id: Option<&'a str>,
    pub date: Option<&'a str>,
    pub satellite_id: Option<&'a str>,
    pub ts: Option<&'a str>,
}

/// A validated tile request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileQuery {
    pub tile: TileCoord,
    pub selector: Selector,
}

impl TileQuery {
    pub fn new(tile: TileCoord, selector: Selector) -> Self {
        Self { tile, selector }
    }

    /// Validates raw parameters.
    ///
    /// An explicit scene id wins; otherwise a `YYYY-MM-DD` date selects a
    /// mosaic (refused below `min_zoom`); otherwise a satellite id plus unix
    /// timestamp selects a satellite pass.
    pub fn from_params(params: &TileParams<'_>, min_zoom: u8) -> Result<Self, ValidationError> {
        let tile = parse_tile(params.z, params.x, params.y)?;

        if let Some(id) = non_empty(params.id) {
            return Ok(Self::new(tile, Selector::Scene(id.to_string())));
        }

        if let Some(date) = non_empty(params.date) {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|_| ValidationError::InvalidDate(date.to_string()))?;
            if tile.zoom < min_zoom {
                return Err(ValidationError::ZoomBelowFloor {
                    zoom: tile.zoom,
                    min: min_zoom,
                });
            }
            return Ok(Self::new(tile, Selector::Date(date)));
        }

        let satellite_id = non_empty(params.satellite_id).ok_or(ValidationError::MissingSatellite)?;
        let raw_ts = params.ts.unwrap_or_default().trim();
        let timestamp = raw_ts
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| ValidationError::InvalidTimestamp(raw_ts.to_string()))?;

        Ok(Self::new(
            tile,
            Selector::SatellitePass {
                satellite_id: satellite_id.to_string(),
                timestamp,
            },
        ))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_tile(z: &str, x: &str, y: &str) -> Result<TileCoord, ValidationError> {
    let invalid = |field: &'static str, value: &str| ValidationError::InvalidTile {
        field,
        value: value.to_string(),
    };
    let zoom: u8 = z.trim().parse().map_err(|_| invalid("z", z))?;
    let tx: u32 = x.trim().parse().map_err(|_| invalid("x", x))?;
    let ty: u32 = y.trim().parse().map_err(|_| invalid("y", y))?;

    TileCoord::new(tx, ty, zoom).map_err(|e| match e {
        CoordError::InvalidZoom(_) => invalid("z", z),
        _ => ValidationError::TileOutOfRange {
            x: tx,
            y: ty,
            zoom,
        },
    })
}

/// Instant at which `date` begins in the given offset.
pub fn day_start(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()))
}
