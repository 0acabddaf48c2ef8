//! Tile resolution.
//!
//! Wires the cache, search client, coverage selection and tile fetcher
//! together for one tile request:
//!
//! ```text
//! TileQuery ─► GroupKey ─► RegionCache::get(tile bound)
//!                              │ miss
//!                              ▼
//!                         claim(tile, padded region)
//!                    ┌─────────┴──────────┐
//!                 Owner                Coalesced
//!      spawn search(padded region)   wait on Watcher
//!      race Watcher vs own result    (closed → retry)
//!                    └─────────┬──────────┘
//!                              ▼
//!                  select_scenes ─► TileFetcher ─► RgbaImage
//! ```

mod request;

pub use request::{day_start, GroupKey, Selector, TileParams, TileQuery};

use image::RgbaImage;
use std::sync::Arc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::{Claim, KeyedCacheRegistry};
use crate::config::OrchestratorConfig;
use crate::coord::{Bound, TileCoord};
use crate::coverage::{select_scenes, Selection};
use crate::error::{MosaicError, Result};
use crate::fetch::TileFetcher;
use crate::http::AsyncHttpClient;
use crate::search::{FeatureList, SearchClient, SearchRequest};

/// Resolves tile queries into composited images.
pub struct TileOrchestrator<C: AsyncHttpClient + 'static> {
    search: Arc<SearchClient<C>>,
    fetcher: Arc<TileFetcher<C>>,
    registry: Arc<KeyedCacheRegistry<GroupKey>>,
    config: OrchestratorConfig,
}

impl<C: AsyncHttpClient + 'static> TileOrchestrator<C> {
    pub fn new(
        search: Arc<SearchClient<C>>,
        fetcher: Arc<TileFetcher<C>>,
        registry: Arc<KeyedCacheRegistry<GroupKey>>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            search,
            fetcher,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &KeyedCacheRegistry<GroupKey> {
        &self.registry
    }

    /// Resolves a query into a composited tile.
    #[instrument(skip(self, cancel), fields(tile = %query.tile, selector = %query.selector))]
    pub async fn resolve(&self, query: &TileQuery, cancel: &CancellationToken) -> Result<RgbaImage> {
        let ids = match &query.selector {
            Selector::Scene(id) => vec![id.clone()],
            _ => self.select(query, cancel).await?.ids,
        };
        self.fetcher
            .fetch_and_composite(&ids, query.tile, cancel)
            .await
    }

    /// Chooses the scenes a search-based query would composite.
    pub async fn select(&self, query: &TileQuery, cancel: &CancellationToken) -> Result<Selection> {
        if let Selector::Scene(id) = &query.selector {
            return Ok(Selection {
                ids: vec![id.clone()],
                coverage: 1.0,
            });
        }

        let features = self.features_for(query.tile, &query.selector, cancel).await?;
        let selection = select_scenes(&query.tile.bound(), &features);
        info!(
            candidates = features.len(),
            selected = selection.ids.len(),
            coverage = selection.coverage,
            "Scenes selected"
        );
        Ok(selection)
    }

    /// Returns the features covering `tile` for a search-based selector.
    ///
    /// Served from the group's cache when a live entry contains the tile.
    /// Otherwise either becomes the owner of a search over the padded region,
    /// or waits on a search already covering the tile. One search deadline,
    /// started here, bounds the whole call including retries after a joined
    /// search fails.
    pub async fn features_for(
        &self,
        tile: TileCoord,
        selector: &Selector,
        cancel: &CancellationToken,
    ) -> Result<FeatureList> {
        let key = selector.group_key().ok_or_else(|| {
            MosaicError::Internal(format!("{} has no search group", selector))
        })?;
        let cache = self.registry.get_or_create(&key);
        let tile_bound = tile.bound();
        let search_bound = tile.padded_bound(self.config.bound_padding());
        let deadline = Instant::now() + self.search.config().timeout();

        loop {
            if cancel.is_cancelled() {
                return Err(MosaicError::Cancelled);
            }
            if let Some(features) = cache.get(&tile_bound) {
                debug!("Features served from cache");
                return Ok(features);
            }
            if Instant::now() >= deadline {
                return Err(self.timeout());
            }

            match cache.claim(tile_bound, search_bound) {
                Claim::Coalesced(mut watcher) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(MosaicError::Cancelled),
                        delivered = watcher.recv() => match delivered {
                            Some(features) => {
                                debug!("Features delivered by in-flight search");
                                return Ok(features);
                            }
                            None => {
                                debug!("In-flight search ended without result, retrying");
                                continue;
                            }
                        },
                        _ = sleep_until(deadline) => {
                            warn!("In-flight search outlived deadline");
                            return Err(self.timeout());
                        }
                    }
                }
                Claim::Owner {
                    mut watcher,
                    search: in_flight,
                } => {
                    let request = self.search_request(selector, in_flight.bound())?;
                    let client = Arc::clone(&self.search);
                    let token = cancel.clone();

                    // Detached: a search that loses the race still fills the cache
                    let mut own_search = tokio::spawn(async move {
                        let response = client.search_until(&request, deadline, &token).await?;
                        let features: FeatureList = Arc::new(response.features);
                        in_flight.complete(Arc::clone(&features));
                        Ok::<_, MosaicError>(features)
                    });

                    return tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(MosaicError::Cancelled),
                        delivered = watcher.recv() => match delivered {
                            Some(features) => Ok(features),
                            None => join_search(own_search.await),
                        },
                        joined = &mut own_search => join_search(joined),
                    };
                }
            }
        }
    }

    /// Builds the search a selector needs over `bound`.
    pub fn search_request(&self, selector: &Selector, bound: Bound) -> Result<SearchRequest> {
        let item_type = self.search.config().item_type();
        match selector {
            Selector::Date(date) => Ok(SearchRequest::region_on_date(
                bound,
                day_start(*date, self.config.utc_offset()),
                item_type,
            )),
            Selector::SatellitePass {
                satellite_id,
                timestamp,
            } => Ok(SearchRequest::satellite_pass(
                bound,
                satellite_id,
                *timestamp,
                item_type,
            )),
            Selector::Scene(_) => Err(MosaicError::Internal(format!(
                "{} has no search request",
                selector
            ))),
        }
    }

    fn timeout(&self) -> MosaicError {
        MosaicError::Timeout(self.search.config().timeout())
    }
}

fn join_search(
    joined: std::result::Result<Result<FeatureList>, tokio::task::JoinError>,
) -> Result<FeatureList> {
    joined.map_err(|e| MosaicError::Internal(format!("search task failed: {}", e)))?
}
