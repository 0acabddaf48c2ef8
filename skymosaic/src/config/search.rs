//! Search client configuration.

use std::time::Duration;

use super::defaults::{
    DEFAULT_API_BASE_URL, DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_MAX_MS, DEFAULT_ITEM_TYPE,
    DEFAULT_MAX_CONCURRENT_SEARCHES, DEFAULT_SEARCH_TIMEOUT_SECS,
};

const MIN_BACKOFF_BASE: Duration = Duration::from_millis(1);

/// Configuration for the upstream scene search.
///
/// # Example
///
/// ```
/// use skymosaic::config::SearchConfig;
/// use std::time::Duration;
///
/// let config = SearchConfig::default();
/// assert_eq!(config.timeout(), Duration::from_secs(15));
/// assert_eq!(config.max_concurrent(), 3);
///
/// let config = SearchConfig::new()
///     .with_timeout(Duration::from_secs(5))
///     .with_item_type("PSScene");
/// assert_eq!(config.item_type(), "PSScene");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Data API base URL, without trailing slash
    api_base_url: String,
    /// Product type searched and tiled
    item_type: String,
    /// Absolute deadline for one call, retries included
    timeout: Duration,
    /// Searches allowed in flight process-wide
    max_concurrent: usize,
    /// First overload backoff delay
    backoff_base: Duration,
    /// Ceiling for a single backoff delay
    backoff_max: Duration,
}

impl SearchConfig {
    /// Create a new search configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_item_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = item_type.into();
        self
    }

    /// Set the call deadline. Default: 15 seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the process-wide admission limit. Default: 3.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Set the backoff range used for 429 and 5xx responses.
    ///
    /// The base is raised to at least 1 ms so overload retries always wait.
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        let base = base.max(MIN_BACKOFF_BASE);
        self.backoff_base = base;
        self.backoff_max = max.max(base);
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    pub fn backoff_max(&self) -> Duration {
        self.backoff_max
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            item_type: DEFAULT_ITEM_TYPE.to_string(),
            timeout: Duration::from_secs(DEFAULT_SEARCH_TIMEOUT_SECS),
            max_concurrent: DEFAULT_MAX_CONCURRENT_SEARCHES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            backoff_max: Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
        }
    }
}
