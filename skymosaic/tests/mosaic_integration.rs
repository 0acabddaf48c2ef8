//! Integration tests for tile resolution through the service facade.
//!
//! These tests drive [`MosaicService`] against a scripted Planet API and
//! verify:
//! - Neighbouring tiles share one padded-region search
//! - Admission limits hold across concurrent searches
//! - Overloaded searches are retried until they succeed
//! - Coalesced tiles share one deadline when searches stay overloaded
//! - A scene much larger than the tile is the only one fetched
//! - Cached searches expire after their TTL
//! - Composites stack the newest scene on top

use chrono::NaiveDate;
use futures::future::join_all;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use skymosaic::config::{CacheConfig, SearchConfig};
use skymosaic::coord::TileCoord;
use skymosaic::fetch::{decode_png, encode_png};
use skymosaic::http::{AsyncHttpClient, BasicAuth, HttpResponse, TransportError};
use skymosaic::orchestrator::{Selector, TileQuery};
use skymosaic::search::AdmissionLimiter;
use skymosaic::service::{MosaicService, ServiceConfig};
use skymosaic::ErrorKind;

// =============================================================================
// Test Helpers
// =============================================================================

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

/// Scripted Planet API.
///
/// Searches answer with two scenes: `older` (blue) over the whole test area
/// and `newer` (red) starting just east of the prime meridian, so tile
/// (4096, y) at zoom 13 needs both. The first `overloaded` searches answer
/// 429.
#[derive(Clone)]
struct FakePlanet {
    searches: Arc<AtomicUsize>,
    tile_fetches: Arc<AtomicUsize>,
    overloaded: usize,
    delay: Duration,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl FakePlanet {
    fn new() -> Self {
        Self {
            searches: Arc::new(AtomicUsize::new(0)),
            tile_fetches: Arc::new(AtomicUsize::new(0)),
            overloaded: 0,
            delay: Duration::ZERO,
            bodies: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn overloaded(mut self, searches: usize) -> Self {
        self.overloaded = searches;
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    fn tile_fetches(&self) -> usize {
        self.tile_fetches.load(Ordering::SeqCst)
    }

    fn search_body() -> String {
        let area = |x0: f64, x1: f64| {
            json!({
                "type": "Polygon",
                "coordinates": [[[x0, -10.0], [x1, -10.0], [x1, 60.0], [x0, 60.0], [x0, -10.0]]]
            })
        };
        json!({
            "features": [
                {
                    "id": "newer",
                    "geometry": area(0.02, 10.0),
                    "properties": {"acquired": "2024-03-01T11:00:00Z", "satellite_id": "0f2b"}
                },
                {
                    "id": "older",
                    "geometry": area(-10.0, 10.0),
                    "properties": {"acquired": "2024-03-01T09:00:00Z", "satellite_id": "1a2b"}
                }
            ]
        })
        .to_string()
    }

    fn scene_tile(url: &str) -> Vec<u8> {
        let image = if url.contains("/newer/") {
            // Transparent west half lets the older scene show through
            RgbaImage::from_fn(256, 256, |x, _| if x < 128 { Rgba([0, 0, 0, 0]) } else { RED })
        } else {
            RgbaImage::from_pixel(256, 256, BLUE)
        };
        encode_png(&image).unwrap()
    }
}

impl AsyncHttpClient for FakePlanet {
    async fn get(
        &self,
        url: &str,
        _auth: Option<&BasicAuth>,
    ) -> Result<HttpResponse, TransportError> {
        self.tile_fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(HttpResponse::new(200, Self::scene_tile(url)))
    }

    async fn post_json(
        &self,
        _url: &str,
        auth: Option<&BasicAuth>,
        json_body: &str,
    ) -> Result<HttpResponse, TransportError> {
        assert!(auth.is_some(), "searches must be authenticated");
        let n = self.searches.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().push(json_body.to_string());
        tokio::time::sleep(self.delay).await;

        if n < self.overloaded {
            return Ok(HttpResponse::new(429, "slow down"));
        }
        Ok(HttpResponse::new(200, Self::search_body()))
    }
}

fn service_with(
    planet: &FakePlanet,
    limiter: Arc<AdmissionLimiter>,
    cache_ttl: Duration,
) -> Arc<MosaicService<FakePlanet>> {
    let config = ServiceConfig::builder()
        .api_key("test-key")
        .search(
            SearchConfig::default()
                .with_backoff(Duration::from_millis(100), Duration::from_millis(400)),
        )
        .cache(CacheConfig::default().with_ttl(cache_ttl))
        .build();
    Arc::new(MosaicService::with_client(config, Arc::new(planet.clone()), limiter).unwrap())
}

fn service(planet: &FakePlanet) -> Arc<MosaicService<FakePlanet>> {
    service_with(
        planet,
        Arc::new(AdmissionLimiter::new(3)),
        Duration::from_secs(600),
    )
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

/// Tile at zoom 13 near lon 0, lat 0.
fn tile(dx: u32, dy: u32) -> TileCoord {
    TileCoord::new(4096 + dx, 4090 + dy, 13).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_date_mosaic_stacks_newest_on_top() {
    let planet = FakePlanet::new();
    let service = service(&planet);
    let query = TileQuery::new(tile(0, 0), Selector::Date(date(1)));

    let png = service
        .tile_png(&query, &CancellationToken::new())
        .await
        .unwrap();
    let image = decode_png(&png).unwrap();

    assert_eq!(*image.get_pixel(200, 128), RED);
    assert_eq!(*image.get_pixel(10, 128), BLUE);
    assert_eq!(planet.searches(), 1);
    assert_eq!(planet.tile_fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_neighbouring_tiles_share_one_search() {
    let planet = FakePlanet::new().with_delay(Duration::from_millis(300));
    let service = service(&planet);
    let cancel = CancellationToken::new();

    let queries: Vec<TileQuery> = (0..3)
        .flat_map(|dx| (0..3).map(move |dy| (dx, dy)))
        .map(|(dx, dy)| TileQuery::new(tile(dx, dy), Selector::Date(date(1))))
        .collect();

    let results = join_all(queries.iter().map(|q| service.tile(q, &cancel))).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(planet.searches(), 1);
    assert_eq!(service.cache_stats().searches, 1);
}

#[tokio::test(start_paused = true)]
async fn test_admission_limit_across_groups() {
    let planet = FakePlanet::new().with_delay(Duration::from_millis(500));
    let limiter = Arc::new(AdmissionLimiter::new(2));
    let service = service_with(&planet, Arc::clone(&limiter), Duration::from_secs(600));
    let cancel = CancellationToken::new();

    // Distinct dates never coalesce
    let queries: Vec<TileQuery> = (1..=6)
        .map(|day| TileQuery::new(tile(0, 0), Selector::Date(date(day))))
        .collect();
    let results = join_all(queries.iter().map(|q| service.tile(q, &cancel))).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(planet.searches(), 6);
    assert_eq!(limiter.peak_in_flight(), 2);
    assert_eq!(limiter.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_overloaded_search_is_retried() {
    let planet = FakePlanet::new().overloaded(2);
    let service = service(&planet);
    let query = TileQuery::new(tile(0, 0), Selector::Date(date(1)));

    service.tile(&query, &CancellationToken::new()).await.unwrap();

    assert_eq!(planet.searches(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_overload_times_out() {
    let planet = FakePlanet::new().overloaded(usize::MAX);
    let service = service(&planet);
    let query = TileQuery::new(tile(0, 0), Selector::Date(date(1)));

    let err = service
        .tile(&query, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(planet.searches() > 1);
    assert_eq!(planet.tile_fetches(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_neighbours_fail_together_under_overload() {
    let planet = FakePlanet::new().overloaded(usize::MAX);
    let service = service(&planet);
    let cancel = CancellationToken::new();

    let queries: Vec<TileQuery> = (0..3)
        .flat_map(|dx| (0..3).map(move |dy| (dx, dy)))
        .map(|(dx, dy)| TileQuery::new(tile(dx, dy), Selector::Date(date(1))))
        .collect();

    let start = tokio::time::Instant::now();
    let results = join_all(queries.iter().map(|q| service.tile(q, &cancel))).await;

    assert!(results
        .iter()
        .all(|r| matches!(r, Err(e) if e.kind() == ErrorKind::Timeout)));
    assert!(start.elapsed() <= SearchConfig::default().timeout() + Duration::from_secs(1));
    assert_eq!(service.cache_stats().searches, 1);
    assert_eq!(planet.tile_fetches(), 0);
}

#[tokio::test]
async fn test_wide_scene_alone_covers_tile() {
    // Tile 13/4097/4090 lies wholly inside the newer footprint
    let planet = FakePlanet::new();
    let service = service(&planet);
    let query = TileQuery::new(tile(1, 0), Selector::Date(date(1)));

    service.tile(&query, &CancellationToken::new()).await.unwrap();

    assert_eq!(planet.searches(), 1);
    assert_eq!(planet.tile_fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cached_search_expires() {
    let planet = FakePlanet::new();
    let service = service_with(
        &planet,
        Arc::new(AdmissionLimiter::new(3)),
        Duration::from_secs(600),
    );
    let query = TileQuery::new(tile(0, 0), Selector::Date(date(1)));
    let cancel = CancellationToken::new();

    service.tile(&query, &cancel).await.unwrap();
    tokio::time::advance(Duration::from_secs(300)).await;
    service.tile(&query, &cancel).await.unwrap();
    assert_eq!(planet.searches(), 1);

    tokio::time::advance(Duration::from_secs(301)).await;
    service.tile(&query, &cancel).await.unwrap();
    assert_eq!(planet.searches(), 2);
}

#[tokio::test]
async fn test_satellite_pass_and_scene_selectors() {
    let planet = FakePlanet::new();
    let service = service(&planet);
    let cancel = CancellationToken::new();

    let pass = TileQuery::new(
        tile(0, 0),
        Selector::SatellitePass {
            satellite_id: "0f2b".into(),
            timestamp: chrono::DateTime::from_timestamp(1_709_290_800, 0).unwrap(),
        },
    );
    service.tile(&pass, &cancel).await.unwrap();
    assert!(planet.bodies.lock()[0].contains("StringInFilter"));

    let scene = TileQuery::new(tile(0, 0), Selector::Scene("older".into()));
    let image = service.tile(&scene, &cancel).await.unwrap();
    assert_eq!(*image.get_pixel(0, 0), BLUE);
    assert_eq!(planet.searches(), 1);
}
