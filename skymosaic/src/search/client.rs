//! Rate-limited, retrying client for the upstream search API.

use std::future::Future;
use std::sync::Arc;
use tokio::time::{sleep, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use super::filter::SearchRequest;
use super::limiter::AdmissionLimiter;
use super::types::SearchResponse;
use crate::config::SearchConfig;
use crate::error::{MosaicError, Result};
use crate::http::{AsyncHttpClient, BasicAuth, HttpResponse, TransportError};

/// Statuses that mean "try again later" rather than "no".
fn is_overload(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Client for quick-search and thumbnail calls.
///
/// Every call holds an admission slot from the shared limiter for its whole
/// duration, retries included, and is bounded by an absolute deadline taken
/// at call start.
pub struct SearchClient<C: AsyncHttpClient> {
    http: Arc<C>,
    limiter: Arc<AdmissionLimiter>,
    config: SearchConfig,
    auth: BasicAuth,
}

impl<C: AsyncHttpClient> SearchClient<C> {
    pub fn new(
        http: Arc<C>,
        limiter: Arc<AdmissionLimiter>,
        config: SearchConfig,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            limiter,
            config,
            auth: BasicAuth::api_key(api_key),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs one quick-search, features newest first.
    ///
    /// # Errors
    ///
    /// - `Timeout` if the deadline passes while waiting for admission, during
    ///   a request, or while backing off from overload responses
    /// - `UpstreamRejection` for any other non-success status, without retry
    /// - `Transport` for connection failures, without retry
    /// - `InvalidResponse` if a 2xx body does not decode
    /// - `Cancelled` if `cancel` fires first
    pub async fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse> {
        let deadline = Instant::now() + self.config.timeout();
        self.search_until(request, deadline, cancel).await
    }

    /// Like [`search`](Self::search), bounded by a deadline the caller
    /// already started.
    pub async fn search_until(
        &self,
        request: &SearchRequest,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse> {
        if Instant::now() >= deadline {
            return Err(self.timeout());
        }
        let body = serde_json::to_string(request)
            .map_err(|e| MosaicError::Internal(format!("search request encode: {}", e)))?;
        let url = format!(
            "{}/quick-search?_sort=acquired%20desc",
            self.config.api_base_url()
        );

        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MosaicError::Cancelled),
            admitted = timeout_at(deadline, self.limiter.acquire()) => match admitted {
                Ok(Ok(permit)) => permit,
                Ok(Err(_closed)) => {
                    return Err(MosaicError::Internal("search limiter closed".to_string()))
                }
                Err(_elapsed) => {
                    warn!("Search admission wait exceeded deadline");
                    return Err(self.timeout());
                }
            },
        };
        debug!(body = %body, "Search request");

        let mut backoff = Backoff::new(self.config.backoff_base(), self.config.backoff_max());
        loop {
            let attempt = backoff.attempts() + 1;
            let response = self
                .send_until(deadline, cancel, self.http.post_json(&url, Some(&self.auth), &body))
                .await?;

            if response.is_success() {
                let decoded: SearchResponse = serde_json::from_slice(&response.body)
                    .map_err(|e| MosaicError::InvalidResponse(format!("search decode: {}", e)))?;
                debug!(
                    attempt,
                    features = decoded.features.len(),
                    "Search completed"
                );
                return Ok(decoded);
            }

            if !is_overload(response.status) {
                warn!(status = response.status, attempt, "Search rejected");
                return Err(MosaicError::UpstreamRejection {
                    status: response.status,
                    body: response.body_text(),
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timeout());
            }
            let delay = backoff.next_delay().min(remaining);
            info!(
                status = response.status,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Search overloaded, backing off"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MosaicError::Cancelled),
                _ = sleep(delay) => {}
            }
            if Instant::now() >= deadline {
                warn!(attempt, "Search still overloaded at deadline");
                return Err(self.timeout());
            }
        }
    }

    /// Fetches the PNG thumbnail of one scene.
    pub async fn fetch_thumbnail(&self, id: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let deadline = Instant::now() + self.config.timeout();
        let url = format!(
            "{}/item-types/{}/items/{}/thumb",
            self.config.api_base_url(),
            self.config.item_type(),
            id
        );

        let response = self
            .send_until(deadline, cancel, self.http.get(&url, Some(&self.auth)))
            .await?;
        if !response.is_success() {
            warn!(scene_id = id, status = response.status, "Thumbnail rejected");
            return Err(MosaicError::UpstreamRejection {
                status: response.status,
                body: response.body_text(),
            });
        }
        Ok(response.body)
    }

    async fn send_until(
        &self,
        deadline: Instant,
        cancel: &CancellationToken,
        request: impl Future<Output = std::result::Result<HttpResponse, TransportError>>,
    ) -> Result<HttpResponse> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MosaicError::Cancelled),
            sent = timeout_at(deadline, request) => match sent {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(e)) => Err(MosaicError::Transport(e.0)),
                Err(_elapsed) => Err(self.timeout()),
            },
        }
    }

    fn timeout(&self) -> MosaicError {
        MosaicError::Timeout(self.config.timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;
    use crate::error::ErrorKind;
    use crate::http::tests::MockAsyncHttpClient;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ONE_FEATURE: &str = r#"{"features":[{"id":"s1","geometry":{"type":"Polygon",
        "coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]},
        "properties":{"acquired":"2024-03-01T10:00:00Z","satellite_id":"0f2b"}}]}"#;

    fn request() -> SearchRequest {
        let bound = TileCoord::new(100, 200, 13).unwrap().padded_bound(5);
        let day = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        SearchRequest::region_on_date(bound, day, "PSScene4Band")
    }

    fn client(mock: &MockAsyncHttpClient, max_concurrent: usize) -> SearchClient<MockAsyncHttpClient> {
        SearchClient::new(
            Arc::new(mock.clone()),
            Arc::new(AdmissionLimiter::new(max_concurrent)),
            SearchConfig::default().with_api_base_url("http://planet.test/v1"),
            "key",
        )
    }

    #[tokio::test]
    async fn test_success_decodes_features() {
        let mock = MockAsyncHttpClient::new(|url, body| {
            assert!(url.starts_with("http://planet.test/v1/quick-search?_sort=acquired"));
            assert!(body.unwrap().contains("AndFilter"));
            Ok(HttpResponse::new(200, ONE_FEATURE))
        });
        let client = client(&mock, 3);

        let response = client
            .search(&request(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.features.len(), 1);
        assert_eq!(response.features[0].id, "s1");
        assert_eq!(mock.post_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_overload_times_out() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(429, "slow down")));
        let client = client(&mock, 3);

        let start = Instant::now();
        let err = client
            .search(&request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(mock.post_count() > 1);
        assert!(start.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_passed_deadline_skips_request() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(200, ONE_FEATURE)));
        let client = client(&mock, 3);

        let err = client
            .search_until(&request(), Instant::now(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(mock.post_count(), 0);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(404, "no such item type")));
        let client = client(&mock, 3);

        let err = client
            .search(&request(), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            MosaicError::UpstreamRejection { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no such item type");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(mock.post_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_then_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mock = MockAsyncHttpClient::new(move |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(HttpResponse::new(503, "busy"))
            } else {
                Ok(HttpResponse::new(200, ONE_FEATURE))
            }
        });
        let client = client(&mock, 3);

        let response = client
            .search(&request(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.features.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let mock = MockAsyncHttpClient::fixed(Err(TransportError("connection refused".into())));
        let client = client(&mock, 3);

        let err = client
            .search(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(mock.post_count(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(200, "<html>")));
        let client = client(&mock, 3);

        let err = client
            .search(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_request() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(200, ONE_FEATURE)))
            .with_delay(Duration::from_secs(10));
        let client = client(&mock, 3);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let err = client.search(&request(), &cancel).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admission_limits_concurrency() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(200, ONE_FEATURE)))
            .with_delay(Duration::from_secs(1));
        let client = Arc::new(client(&mock, 1));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let client = Arc::clone(&client);
            handles.push(tokio::spawn(async move {
                client.search(&request(), &CancellationToken::new()).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(client.limiter.peak_in_flight(), 1);
        assert_eq!(mock.post_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admission_wait_bounded_by_deadline() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(200, ONE_FEATURE)));
        let client = client(&mock, 1);
        let _held = client.limiter.acquire().await.unwrap();

        let err = client
            .search(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(mock.post_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_thumbnail() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(200, b"\x89PNG".to_vec())));
        let client = client(&mock, 1);

        let bytes = client
            .fetch_thumbnail("s1", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(bytes, b"\x89PNG");
        assert_eq!(
            mock.requested_urls(),
            vec!["http://planet.test/v1/item-types/PSScene4Band/items/s1/thumb"]
        );
    }

    #[tokio::test]
    async fn test_fetch_thumbnail_not_found() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(404, "missing")));
        let client = client(&mock, 1);

        let err = client
            .fetch_thumbnail("nope", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamRejection);
    }
}
