//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Upstream API settings
    pub planet: PlanetSettings,
    /// Search call settings
    pub search: SearchSettings,
    /// Tile fetch settings
    pub fetch: FetchSettings,
    /// Region cache settings
    pub cache: CacheSettings,
    /// Tile resolution settings
    pub tiles: TileSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// `[planet]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanetSettings {
    /// API key; the environment and CLI flag take precedence
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub item_type: String,
}

/// `[search]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    pub timeout_secs: u64,
    pub max_concurrent: usize,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

/// `[fetch]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub tile_url_template: String,
    pub shards: u32,
    pub timeout_secs: u64,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub ttl_secs: u64,
}

/// `[tiles]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSettings {
    /// Tiles of padding around a requested tile when searching
    pub bound_padding: u32,
    /// Date mosaics below this zoom are refused
    pub min_mosaic_zoom: u8,
    /// Metadata searches are clamped up to this zoom
    pub min_search_zoom: u8,
    pub search_window_days: i64,
    /// Offset used to turn calendar dates into instants
    pub utc_offset_minutes: i32,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub file: PathBuf,
}
