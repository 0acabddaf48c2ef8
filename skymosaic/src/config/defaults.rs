//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use super::file::config_directory;
use super::settings::*;

// =============================================================================
// [planet]
// =============================================================================

/// Base URL of the Planet Data API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.planet.com/data/v1";

/// Scene product type requested from search and tile endpoints.
pub const DEFAULT_ITEM_TYPE: &str = "PSScene4Band";

/// Environment variable consulted for the API key.
pub const API_KEY_ENV: &str = "PLANET_API_KEY";

// =============================================================================
// [search]
// =============================================================================

/// Absolute deadline for one search call, including retries.
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 15;

/// Searches allowed in flight across the whole process.
pub const DEFAULT_MAX_CONCURRENT_SEARCHES: usize = 3;

/// First backoff delay after an overload response.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 250;

/// Ceiling for a single backoff delay.
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 4_000;

// =============================================================================
// [fetch]
// =============================================================================

/// Tile endpoint. `{shard}`, `{item_type}`, `{id}`, `{z}`, `{x}`, `{y}` and
/// `{api_key}` are substituted per request.
pub const DEFAULT_TILE_URL_TEMPLATE: &str =
    "https://tiles{shard}.planet.com/data/v1/{item_type}/{id}/{z}/{x}/{y}.png?api_key={api_key}";

/// Number of tile hosts (`tiles0` .. `tiles3`).
pub const DEFAULT_TILE_SHARDS: u32 = 4;

/// Absolute deadline for fetching and compositing one tile.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;

/// Edge length of a tile in pixels.
pub const TILE_SIZE: u32 = 256;

// =============================================================================
// [cache]
// =============================================================================

/// Lifetime of a cached search result.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

// =============================================================================
// [tiles]
// =============================================================================

/// Tiles added on every side of the requested tile when searching.
pub const DEFAULT_BOUND_PADDING_TILES: u32 = 5;

/// Lowest zoom at which date mosaics are rendered.
pub const DEFAULT_MIN_MOSAIC_ZOOM: u8 = 11;

/// Zoom floor applied to metadata searches.
pub const DEFAULT_MIN_SEARCH_ZOOM: u8 = 12;

/// Days of history covered by a metadata search.
pub const DEFAULT_SEARCH_WINDOW_DAYS: i64 = 7;

/// Offset from UTC, in minutes, used to interpret calendar dates.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 0;

// =============================================================================
// ConfigFile::default()
// =============================================================================

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            planet: PlanetSettings {
                api_key: None,
                api_base_url: DEFAULT_API_BASE_URL.to_string(),
                item_type: DEFAULT_ITEM_TYPE.to_string(),
            },
            search: SearchSettings {
                timeout_secs: DEFAULT_SEARCH_TIMEOUT_SECS,
                max_concurrent: DEFAULT_MAX_CONCURRENT_SEARCHES,
                backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
                backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            },
            fetch: FetchSettings {
                tile_url_template: DEFAULT_TILE_URL_TEMPLATE.to_string(),
                shards: DEFAULT_TILE_SHARDS,
                timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            },
            cache: CacheSettings {
                ttl_secs: DEFAULT_CACHE_TTL_SECS,
            },
            tiles: TileSettings {
                bound_padding: DEFAULT_BOUND_PADDING_TILES,
                min_mosaic_zoom: DEFAULT_MIN_MOSAIC_ZOOM,
                min_search_zoom: DEFAULT_MIN_SEARCH_ZOOM,
                search_window_days: DEFAULT_SEARCH_WINDOW_DAYS,
                utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            },
            logging: LoggingSettings {
                file: config_directory().join("skymosaic.log"),
            },
        }
    }
}
