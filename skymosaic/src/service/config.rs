//! Service configuration types.

use std::time::Duration;

use crate::config::{
    offset_from_minutes, CacheConfig, ConfigFile, FetchConfig, OrchestratorConfig, SearchConfig,
    API_KEY_ENV,
};

/// Configuration for the skymosaic service.
///
/// Aggregates the per-component configs plus the API key.
///
/// # Example
///
/// ```
/// use skymosaic::service::ServiceConfig;
/// use skymosaic::config::SearchConfig;
///
/// let config = ServiceConfig::builder()
///     .api_key("PLAK0000")
///     .search(SearchConfig::default().with_max_concurrent(1))
///     .build();
///
/// assert_eq!(config.api_key(), Some("PLAK0000"));
/// assert_eq!(config.search().max_concurrent(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    api_key: Option<String>,
    search: SearchConfig,
    fetch: FetchConfig,
    cache: CacheConfig,
    orchestrator: OrchestratorConfig,
}

impl ServiceConfig {
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Builds a config from the INI file contents.
    ///
    /// The API key is taken from the file only; use [`resolve_api_key`] to
    /// apply the environment and command line on top.
    pub fn from_config_file(file: &ConfigFile) -> Self {
        let search = SearchConfig::default()
            .with_api_base_url(file.planet.api_base_url.clone())
            .with_item_type(file.planet.item_type.clone())
            .with_timeout(Duration::from_secs(file.search.timeout_secs))
            .with_max_concurrent(file.search.max_concurrent)
            .with_backoff(
                Duration::from_millis(file.search.backoff_base_ms),
                Duration::from_millis(file.search.backoff_max_ms),
            );

        let fetch = FetchConfig::default()
            .with_tile_url_template(file.fetch.tile_url_template.clone())
            .with_item_type(file.planet.item_type.clone())
            .with_shards(file.fetch.shards)
            .with_timeout(Duration::from_secs(file.fetch.timeout_secs));

        let orchestrator = OrchestratorConfig::default()
            .with_bound_padding(file.tiles.bound_padding)
            .with_min_mosaic_zoom(file.tiles.min_mosaic_zoom)
            .with_min_search_zoom(file.tiles.min_search_zoom)
            .with_search_window_days(file.tiles.search_window_days)
            .with_utc_offset(offset_from_minutes(file.tiles.utc_offset_minutes));

        Self {
            api_key: file.planet.api_key.clone(),
            search,
            fetch,
            cache: CacheConfig::default().with_ttl(Duration::from_secs(file.cache.ttl_secs)),
            orchestrator,
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn search(&self) -> &SearchConfig {
        &self.search
    }

    pub fn fetch(&self) -> &FetchConfig {
        &self.fetch
    }

    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    pub fn orchestrator(&self) -> &OrchestratorConfig {
        &self.orchestrator
    }

    /// Replaces the API key.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServiceConfigBuilder {
    api_key: Option<String>,
    search: Option<SearchConfig>,
    fetch: Option<FetchConfig>,
    cache: Option<CacheConfig>,
    orchestrator: Option<OrchestratorConfig>,
}

impl ServiceConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn search(mut self, config: SearchConfig) -> Self {
        self.search = Some(config);
        self
    }

    pub fn fetch(mut self, config: FetchConfig) -> Self {
        self.fetch = Some(config);
        self
    }

    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = Some(config);
        self
    }

    pub fn orchestrator(mut self, config: OrchestratorConfig) -> Self {
        self.orchestrator = Some(config);
        self
    }

    pub fn build(self) -> ServiceConfig {
        ServiceConfig {
            api_key: self.api_key,
            search: self.search.unwrap_or_default(),
            fetch: self.fetch.unwrap_or_default(),
            cache: self.cache.unwrap_or_default(),
            orchestrator: self.orchestrator.unwrap_or_default(),
        }
    }
}

/// Picks the API key: command-line flag, then environment, then file.
///
/// Blank values are ignored at every level.
pub fn resolve_api_key(
    flag: Option<&str>,
    env: Option<String>,
    file: Option<&str>,
) -> Option<String> {
    let non_blank = |value: &str| {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    };

    flag.and_then(non_blank)
        .or_else(|| env.as_deref().and_then(non_blank))
        .or_else(|| file.and_then(non_blank))
}

/// Reads the API key from the process environment.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV).ok()
}
