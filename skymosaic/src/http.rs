//! HTTP client abstraction for testability
//!
//! Upstream clients are generic over [`AsyncHttpClient`] so tests can script
//! responses without a network. Unlike a plain "bytes or error" API, responses
//! carry their status code: callers decide what counts as retryable.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Connection-level failure (DNS, connect, TLS, body read).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded lossily, for error context.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP basic-auth credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    /// Planet authenticates with the API key as user name and no password.
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            username: key.into(),
            password: String::new(),
        }
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &"<redacted>")
            .finish()
    }
}

/// Trait for asynchronous HTTP client operations.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    fn get(
        &self,
        url: &str,
        auth: Option<&BasicAuth>,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;

    /// Performs an HTTP POST request with a JSON body.
    fn post_json(
        &self,
        url: &str,
        auth: Option<&BasicAuth>,
        json_body: &str,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// Default User-Agent string for HTTP requests.
const DEFAULT_USER_AGENT: &str = concat!("skymosaic/", env!("CARGO_PKG_VERSION"));

/// Async HTTP client implementation using reqwest.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a client with a 30 second per-request ceiling.
    ///
    /// Callers apply their own, usually tighter, deadlines on top.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Creates a client with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            // Tile fan-out hits the same few shard hosts repeatedly
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| TransportError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<HttpResponse, TransportError> {
        trace!(url = url, "HTTP request starting");

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(TransportError(format!("Request failed: {}", e)));
            }
        };

        let status = response.status().as_u16();
        debug!(url = url, status, "HTTP response received");

        match response.bytes().await {
            Ok(bytes) => Ok(HttpResponse {
                status,
                body: bytes.to_vec(),
            }),
            Err(e) => {
                warn!(url = url, error = %e, "Failed to read response body");
                Err(TransportError(format!("Failed to read response: {}", e)))
            }
        }
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(
        &self,
        url: &str,
        auth: Option<&BasicAuth>,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.get(url);
        if let Some(auth) = auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }
        self.send(request, url).await
    }

    async fn post_json(
        &self,
        url: &str,
        auth: Option<&BasicAuth>,
        json_body: &str,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(json_body.to_string());
        if let Some(auth) = auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }
        self.send(request, url).await
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type Handler =
        dyn Fn(&str, Option<&str>) -> Result<HttpResponse, TransportError> + Send + Sync;

    /// Scriptable mock HTTP client.
    ///
    /// The handler receives the URL and, for POSTs, the JSON body. An
    /// optional delay is applied before every response so tests can hold
    /// requests in flight.
    #[derive(Clone)]
    pub struct MockAsyncHttpClient {
        handler: Arc<Handler>,
        delay: Duration,
        gets: Arc<AtomicUsize>,
        posts: Arc<AtomicUsize>,
        urls: Arc<Mutex<Vec<String>>>,
    }

    impl MockAsyncHttpClient {
        pub fn new<F>(handler: F) -> Self
        where
            F: Fn(&str, Option<&str>) -> Result<HttpResponse, TransportError>
                + Send
                + Sync
                + 'static,
        {
            Self {
                handler: Arc::new(handler),
                delay: Duration::ZERO,
                gets: Arc::new(AtomicUsize::new(0)),
                posts: Arc::new(AtomicUsize::new(0)),
                urls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Always answers with the same response.
        pub fn fixed(response: Result<HttpResponse, TransportError>) -> Self {
            Self::new(move |_, _| response.clone())
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn get_count(&self) -> usize {
            self.gets.load(Ordering::SeqCst)
        }

        pub fn post_count(&self) -> usize {
            self.posts.load(Ordering::SeqCst)
        }

        pub fn requested_urls(&self) -> Vec<String> {
            self.urls.lock().clone()
        }

        async fn respond(
            &self,
            url: &str,
            body: Option<&str>,
        ) -> Result<HttpResponse, TransportError> {
            self.urls.lock().push(url.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.handler)(url, body)
        }
    }

    impl AsyncHttpClient for MockAsyncHttpClient {
        async fn get(
            &self,
            url: &str,
            _auth: Option<&BasicAuth>,
        ) -> Result<HttpResponse, TransportError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.respond(url, None).await
        }

        async fn post_json(
            &self,
            url: &str,
            _auth: Option<&BasicAuth>,
            json_body: &str,
        ) -> Result<HttpResponse, TransportError> {
            self.posts.fetch_add(1, Ordering::SeqCst);
            self.respond(url, Some(json_body)).await
        }
    }

    #[test]
    fn test_success_range() {
        assert!(HttpResponse::new(200, vec![]).is_success());
        assert!(HttpResponse::new(204, vec![]).is_success());
        assert!(!HttpResponse::new(301, vec![]).is_success());
        assert!(!HttpResponse::new(429, vec![]).is_success());
    }

    #[test]
    fn test_basic_auth_debug_redacts_key() {
        let auth = BasicAuth::api_key("secret-key");
        assert!(!format!("{:?}", auth).contains("secret-key"));
        assert!(auth.password.is_empty());
    }

    #[tokio::test]
    async fn test_mock_counts_requests() {
        let mock = MockAsyncHttpClient::fixed(Ok(HttpResponse::new(200, b"ok".to_vec())));

        let response = mock.get("http://example.com/a", None).await.unwrap();
        assert_eq!(response.body_text(), "ok");
        mock.post_json("http://example.com/b", None, "{}")
            .await
            .unwrap();

        assert_eq!(mock.get_count(), 1);
        assert_eq!(mock.post_count(), 1);
        assert_eq!(
            mock.requested_urls(),
            vec!["http://example.com/a", "http://example.com/b"]
        );
    }

    #[tokio::test]
    async fn test_mock_transport_error() {
        let mock = MockAsyncHttpClient::fixed(Err(TransportError("refused".into())));
        let result = mock.get("http://example.com", None).await;
        assert_eq!(result, Err(TransportError("refused".into())));
    }
}
