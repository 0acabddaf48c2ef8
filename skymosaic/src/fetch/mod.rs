//! Parallel scene tile fetch and composite.
//!
//! One task per scene fetches the scene's tile from a randomly chosen tile
//! host. The first failure aborts the remaining tasks and is returned as is;
//! a partial mosaic is never produced.

mod composite;

pub use composite::{blank_tile, composite, decode_png, encode_png};

use image::RgbaImage;
use rand::Rng;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::FetchConfig;
use crate::coord::TileCoord;
use crate::error::{MosaicError, Result};
use crate::http::AsyncHttpClient;

/// Fetches scene tiles and stacks them into one image.
pub struct TileFetcher<C> {
    http: Arc<C>,
    config: FetchConfig,
    api_key: String,
}

impl<C: AsyncHttpClient + 'static> TileFetcher<C> {
    pub fn new(http: Arc<C>, config: FetchConfig, api_key: impl Into<String>) -> Self {
        Self {
            http,
            config,
            api_key: api_key.into(),
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Builds the URL of one scene tile on tile host `shard`.
    pub fn tile_url(&self, scene_id: &str, tile: TileCoord, shard: u32) -> String {
        self.config
            .tile_url_template()
            .replace("{shard}", &shard.to_string())
            .replace("{item_type}", self.config.item_type())
            .replace("{id}", scene_id)
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
            .replace("{api_key}", &self.api_key)
    }

    /// Fetches `ids` (newest first) for `tile` and composites them with the
    /// newest scene on top.
    ///
    /// An empty id list yields a blank transparent tile without any request.
    #[instrument(skip(self, ids, cancel), fields(tile = %tile, scenes = ids.len()))]
    pub async fn fetch_and_composite(
        &self,
        ids: &[String],
        tile: TileCoord,
        cancel: &CancellationToken,
    ) -> Result<RgbaImage> {
        if ids.is_empty() {
            return Ok(blank_tile(self.config.tile_size()));
        }
        if cancel.is_cancelled() {
            return Err(MosaicError::Cancelled);
        }

        let deadline = Instant::now() + self.config.timeout();
        let mut fetches = JoinSet::new();
        for (index, id) in ids.iter().enumerate() {
            let shard = rand::rng().random_range(0..self.config.shards());
            let url = self.tile_url(id, tile, shard);
            let http = Arc::clone(&self.http);
            let scene_id = id.clone();

            fetches.spawn(async move {
                fetch_scene_tile(http.as_ref(), &url, &scene_id)
                    .await
                    .map(|image| (index, image))
            });
        }

        let mut layers: Vec<Option<RgbaImage>> = vec![None; ids.len()];
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("Tile fetch cancelled - aborting remaining fetches");
                    fetches.abort_all();
                    return Err(MosaicError::Cancelled);
                }

                _ = sleep_until(deadline) => {
                    warn!(timeout = ?self.config.timeout(), "Tile fetch deadline exceeded");
                    fetches.abort_all();
                    return Err(MosaicError::Timeout(self.config.timeout()));
                }

                joined = fetches.join_next() => match joined {
                    Some(Ok(Ok((index, image)))) => layers[index] = Some(image),
                    Some(Ok(Err(e))) => {
                        warn!(error = %e, "Scene tile fetch failed - aborting remaining fetches");
                        fetches.abort_all();
                        return Err(e);
                    }
                    Some(Err(join_err)) => {
                        fetches.abort_all();
                        return Err(MosaicError::Internal(format!(
                            "fetch task failed: {}",
                            join_err
                        )));
                    }
                    None => break,
                },
            }
        }

        let layers: Vec<RgbaImage> = layers.into_iter().flatten().collect();
        let image = tokio::task::spawn_blocking(move || composite(&layers))
            .await
            .map_err(|e| MosaicError::Internal(format!("composite task failed: {}", e)))??;

        debug!("Tile composited");
        Ok(image)
    }
}

async fn fetch_scene_tile<C: AsyncHttpClient>(
    http: &C,
    url: &str,
    scene_id: &str,
) -> Result<RgbaImage> {
    let response = http
        .get(url, None)
        .await
        .map_err(|e| MosaicError::Transport(e.0))?;

    if !response.is_success() {
        return Err(MosaicError::UpstreamRejection {
            status: response.status,
            body: format!("scene {}: {}", scene_id, response.body_text()),
        });
    }
    decode_png(&response.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::http::tests::MockAsyncHttpClient;
    use crate::http::HttpResponse;
    use image::Rgba;
    use std::time::Duration;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn png(size: u32, color: Rgba<u8>) -> Vec<u8> {
        encode_png(&RgbaImage::from_pixel(size, size, color)).unwrap()
    }

    fn tile() -> TileCoord {
        TileCoord::new(100, 200, 13).unwrap()
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn fetcher(mock: &MockAsyncHttpClient) -> TileFetcher<MockAsyncHttpClient> {
        TileFetcher::new(Arc::new(mock.clone()), FetchConfig::default(), "key")
    }

    #[test]
    fn test_tile_url() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(200, vec![])));
        let url = fetcher(&mock).tile_url("scene1", tile(), 2);
        assert_eq!(
            url,
            "https://tiles2.planet.com/data/v1/PSScene4Band/scene1/13/100/200.png?api_key=key"
        );
    }

    #[tokio::test]
    async fn test_empty_ids_yield_blank_tile() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(500, vec![])));
        let image = fetcher(&mock)
            .fetch_and_composite(&[], tile(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(image.dimensions(), (256, 256));
        assert!(image.pixels().all(|p| p.0[3] == 0));
        assert_eq!(mock.get_count(), 0);
    }

    #[tokio::test]
    async fn test_newest_scene_drawn_last() {
        let mock = MockAsyncHttpClient::new(|url, _| {
            let color = if url.contains("/newer/") { RED } else { BLUE };
            Ok(HttpResponse::new(200, png(256, color)))
        });

        let image = fetcher(&mock)
            .fetch_and_composite(&ids(&["newer", "older"]), tile(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(*image.get_pixel(128, 128), RED);
        assert_eq!(mock.get_count(), 2);
    }

    #[tokio::test]
    async fn test_requests_spread_over_shards() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(200, png(256, RED))));
        let all: Vec<String> = (0..16).map(|i| format!("s{i}")).collect();

        fetcher(&mock)
            .fetch_and_composite(&all, tile(), &CancellationToken::new())
            .await
            .unwrap();

        for url in mock.requested_urls() {
            let shard = url
                .strip_prefix("https://tiles")
                .and_then(|rest| rest.chars().next())
                .and_then(|c| c.to_digit(10))
                .unwrap();
            assert!(shard < 4);
        }
    }

    #[tokio::test]
    async fn test_single_failure_fails_whole_tile() {
        let mock = MockAsyncHttpClient::new(|url, _| {
            if url.contains("/broken/") {
                Ok(HttpResponse::new(404, "no such scene"))
            } else {
                Ok(HttpResponse::new(200, png(256, RED)))
            }
        });

        let err = fetcher(&mock)
            .fetch_and_composite(&ids(&["a", "broken", "b"]), tile(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UpstreamRejection);
        assert!(err.to_string().contains("broken"));
    }

    #[tokio::test]
    async fn test_mismatched_tile_sizes() {
        let mock = MockAsyncHttpClient::new(|url, _| {
            let size = if url.contains("/big/") { 512 } else { 256 };
            Ok(HttpResponse::new(200, png(size, RED)))
        });

        let err = fetcher(&mock)
            .fetch_and_composite(&ids(&["small", "big"]), tile(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }

    #[tokio::test]
    async fn test_undecodable_tile() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(200, "not an image")));
        let err = fetcher(&mock)
            .fetch_and_composite(&ids(&["a"]), tile(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_fetches() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(200, png(256, RED))))
            .with_delay(Duration::from_secs(10));
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let err = fetcher(&mock)
            .fetch_and_composite(&ids(&["a", "b"]), tile(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_fetch() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(200, png(256, RED))))
            .with_delay(Duration::from_secs(60));

        let err = fetcher(&mock)
            .fetch_and_composite(&ids(&["a"]), tile(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
