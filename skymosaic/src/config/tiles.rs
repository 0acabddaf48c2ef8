//! Tile resolution configuration.

use chrono::{FixedOffset, Offset, Utc};
use std::time::Duration;

use super::defaults::{
    DEFAULT_BOUND_PADDING_TILES, DEFAULT_CACHE_TTL_SECS, DEFAULT_MIN_MOSAIC_ZOOM,
    DEFAULT_MIN_SEARCH_ZOOM, DEFAULT_SEARCH_WINDOW_DAYS,
};

/// Configuration for per-group region caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime of a cached search result
    ttl: Duration,
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry lifetime. Default: 10 minutes.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

/// Configuration for turning tile requests into searches.
///
/// # Example
///
/// ```
/// use skymosaic::config::OrchestratorConfig;
///
/// let config = OrchestratorConfig::default();
/// assert_eq!(config.bound_padding(), 5);
/// assert_eq!(config.min_mosaic_zoom(), 11);
/// assert_eq!(config.utc_offset().local_minus_utc(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Tiles of padding around the requested tile in each search
    bound_padding: u32,
    /// Date mosaics below this zoom are refused
    min_mosaic_zoom: u8,
    /// Metadata searches are clamped up to this zoom
    min_search_zoom: u8,
    /// History covered by metadata searches
    search_window_days: i64,
    /// Offset used to interpret calendar dates
    utc_offset: FixedOffset,
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bound_padding(mut self, tiles: u32) -> Self {
        self.bound_padding = tiles;
        self
    }

    pub fn with_min_mosaic_zoom(mut self, zoom: u8) -> Self {
        self.min_mosaic_zoom = zoom;
        self
    }

    pub fn with_min_search_zoom(mut self, zoom: u8) -> Self {
        self.min_search_zoom = zoom;
        self
    }

    pub fn with_search_window_days(mut self, days: i64) -> Self {
        self.search_window_days = days;
        self
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn bound_padding(&self) -> u32 {
        self.bound_padding
    }

    pub fn min_mosaic_zoom(&self) -> u8 {
        self.min_mosaic_zoom
    }

    pub fn min_search_zoom(&self) -> u8 {
        self.min_search_zoom
    }

    pub fn search_window_days(&self) -> i64 {
        self.search_window_days
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bound_padding: DEFAULT_BOUND_PADDING_TILES,
            min_mosaic_zoom: DEFAULT_MIN_MOSAIC_ZOOM,
            min_search_zoom: DEFAULT_MIN_SEARCH_ZOOM,
            search_window_days: DEFAULT_SEARCH_WINDOW_DAYS,
            utc_offset: utc(),
        }
    }
}

/// Converts a minute offset into a `FixedOffset`, falling back to UTC when
/// the value is out of range.
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(utc)
}

fn utc() -> FixedOffset {
    Utc.fix()
}
