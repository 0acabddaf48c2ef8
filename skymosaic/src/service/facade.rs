//! skymosaic service facade implementation.

use chrono::Utc;
use image::RgbaImage;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::config::ServiceConfig;
use super::error::ServiceError;
use crate::cache::{CacheStats, KeyedCacheRegistry};
use crate::error::Result;
use crate::fetch::{encode_png, TileFetcher};
use crate::http::{AsyncHttpClient, AsyncReqwestClient};
use crate::metadata::{self, GroupBy, SceneSummary};
use crate::orchestrator::{GroupKey, TileOrchestrator, TileParams, TileQuery};
use crate::search::{AdmissionLimiter, SearchClient};

/// High-level facade over tile resolution, scene search and thumbnails.
///
/// One HTTP client and one admission limiter are shared by every component,
/// so concurrent callers of all operations count against the same search
/// admission budget.
///
/// # Example
///
/// ```ignore
/// use skymosaic::service::{MosaicService, ServiceConfig};
/// use skymosaic::orchestrator::TileParams;
/// use tokio_util::sync::CancellationToken;
///
/// let service = MosaicService::new(ServiceConfig::builder().api_key("PLAK…").build())?;
/// let query = service.parse_tile_query(&TileParams {
///     z: "13", x: "4093", y: "2723", date: Some("2024-03-01"), ..Default::default()
/// })?;
/// let png = service.tile_png(&query, &CancellationToken::new()).await?;
/// ```
pub struct MosaicService<C: AsyncHttpClient + 'static = AsyncReqwestClient> {
    config: ServiceConfig,
    search: Arc<SearchClient<C>>,
    limiter: Arc<AdmissionLimiter>,
    orchestrator: TileOrchestrator<C>,
}

impl MosaicService<AsyncReqwestClient> {
    /// Creates the service with a reqwest-backed HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured or the HTTP client
    /// cannot be created.
    pub fn new(config: ServiceConfig) -> std::result::Result<Self, ServiceError> {
        let http = AsyncReqwestClient::new()
            .map_err(|e| ServiceError::HttpClientError(e.to_string()))?;
        let limiter = Arc::new(AdmissionLimiter::new(config.search().max_concurrent()));
        Self::with_client(config, Arc::new(http), limiter)
    }
}

impl<C: AsyncHttpClient + 'static> MosaicService<C> {
    /// Wires the service around an existing HTTP client and limiter.
    pub fn with_client(
        config: ServiceConfig,
        http: Arc<C>,
        limiter: Arc<AdmissionLimiter>,
    ) -> std::result::Result<Self, ServiceError> {
        let api_key = config
            .api_key()
            .ok_or(ServiceError::MissingApiKey)?
            .to_string();

        let search = Arc::new(SearchClient::new(
            Arc::clone(&http),
            Arc::clone(&limiter),
            config.search().clone(),
            api_key.clone(),
        ));
        let fetcher = Arc::new(TileFetcher::new(http, config.fetch().clone(), api_key));
        let registry = Arc::new(KeyedCacheRegistry::<GroupKey>::new(config.cache().ttl()));
        let orchestrator = TileOrchestrator::new(
            Arc::clone(&search),
            fetcher,
            registry,
            config.orchestrator().clone(),
        );

        info!(
            item_type = config.search().item_type(),
            max_concurrent = limiter.max_concurrent(),
            cache_ttl = ?config.cache().ttl(),
            "Mosaic service ready"
        );

        Ok(Self {
            config,
            search,
            limiter,
            orchestrator,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn limiter(&self) -> &AdmissionLimiter {
        &self.limiter
    }

    /// Validates raw tile parameters with the configured mosaic zoom floor.
    pub fn parse_tile_query(&self, params: &TileParams<'_>) -> Result<TileQuery> {
        Ok(TileQuery::from_params(
            params,
            self.config.orchestrator().min_mosaic_zoom(),
        )?)
    }

    /// Resolves one tile into a composited image.
    pub async fn tile(&self, query: &TileQuery, cancel: &CancellationToken) -> Result<RgbaImage> {
        self.orchestrator.resolve(query, cancel).await
    }

    /// Resolves one tile and encodes it as PNG.
    pub async fn tile_png(&self, query: &TileQuery, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let image = self.tile(query, cancel).await?;
        tokio::task::spawn_blocking(move || encode_png(&image))
            .await
            .map_err(|e| crate::error::MosaicError::Internal(format!("encode task failed: {}", e)))?
    }

    /// Lists recent scenes around a point.
    #[instrument(skip(self, cancel))]
    pub async fn search_scenes(
        &self,
        lat: f64,
        lng: f64,
        zoom: u8,
        group_by: GroupBy,
        cancel: &CancellationToken,
    ) -> Result<Vec<SceneSummary>> {
        let request = metadata::region_request(
            lat,
            lng,
            zoom,
            Utc::now(),
            self.config.orchestrator(),
            self.config.search().item_type(),
        )?;

        let response = self.search.search(&request, cancel).await?;
        let summaries = metadata::summarize(
            &response.features,
            group_by,
            self.config.orchestrator().utc_offset(),
        );
        info!(
            scenes = response.features.len(),
            entries = summaries.len(),
            "Scene search complete"
        );
        Ok(summaries)
    }

    /// Fetches a scene thumbnail PNG.
    pub async fn thumbnail(&self, id: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        self.search.fetch_thumbnail(id, cancel).await
    }

    /// Summed statistics of every region cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.orchestrator.registry().stats()
    }
}
