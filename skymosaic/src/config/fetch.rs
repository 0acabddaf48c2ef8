//! Tile fetch configuration.

use std::time::Duration;

use super::defaults::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_ITEM_TYPE, DEFAULT_TILE_SHARDS, DEFAULT_TILE_URL_TEMPLATE,
    TILE_SIZE,
};

/// Configuration for fetching and compositing scene tiles.
///
/// # Example
///
/// ```
/// use skymosaic::config::FetchConfig;
///
/// let config = FetchConfig::default().with_shards(1);
/// assert_eq!(config.shards(), 1);
/// assert_eq!(config.tile_size(), 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// URL template with `{shard}`, `{item_type}`, `{id}`, `{z}`, `{x}`,
    /// `{y}` and `{api_key}` placeholders
    tile_url_template: String,
    item_type: String,
    /// Number of tile hosts to spread requests over
    shards: u32,
    /// Deadline for all fetches of one tile
    timeout: Duration,
    /// Edge length of the blank tile returned for empty selections
    tile_size: u32,
}

impl FetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tile_url_template(mut self, template: impl Into<String>) -> Self {
        self.tile_url_template = template.into();
        self
    }

    pub fn with_item_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = item_type.into();
        self
    }

    /// Set the shard count. Values below 1 are raised to 1.
    pub fn with_shards(mut self, shards: u32) -> Self {
        self.shards = shards.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tile_url_template(&self) -> &str {
        &self.tile_url_template
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn shards(&self) -> u32 {
        self.shards
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            tile_url_template: DEFAULT_TILE_URL_TEMPLATE.to_string(),
            item_type: DEFAULT_ITEM_TYPE.to_string(),
            shards: DEFAULT_TILE_SHARDS,
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            tile_size: TILE_SIZE,
        }
    }
}
