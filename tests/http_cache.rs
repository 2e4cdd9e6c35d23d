//! Integration tests for the cached HTTP surface
//!
//! Each test starts a mock upstream (news backend, CoinGecko and Alpha
//! Vantage in one axum app) and a tickerwire router, both on ephemeral
//! localhost ports, and talks to them with reqwest.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use tickerwire::cache::{ManualClock, TtlStore};
use tickerwire::config::Config;
use tickerwire::server::{build_router, AppState};

/// Upstream call counters
#[derive(Clone, Default)]
struct Hits {
    articles: Arc<AtomicUsize>,
    polls: Arc<AtomicUsize>,
    locations: Arc<AtomicUsize>,
    markets: Arc<AtomicUsize>,
    quotes: Arc<AtomicUsize>,
}

impl Hits {
    fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Deserialize)]
struct MarketParams {
    ids: String,
}

#[derive(Deserialize)]
struct QuoteParams {
    symbol: String,
}

async fn mock_articles(State(hits): State<Hits>, RawQuery(query): RawQuery) -> Json<Value> {
    hits.articles.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(20)).await;
    Json(json!({ "articles": [{ "id": 1, "title": "Council approves budget" }], "query": query }))
}

async fn mock_poll(State(hits): State<Hits>, Path(id): Path<String>) -> Response {
    hits.polls.fetch_add(1, Ordering::SeqCst);
    if id == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "Poll not found" }))).into_response();
    }
    Json(json!({ "id": id, "question": "Best coffee in town?" })).into_response()
}

async fn mock_locations(State(hits): State<Hits>) -> Response {
    hits.locations.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "text/plain")], "not json").into_response()
}

async fn mock_markets(State(hits): State<Hits>, Query(params): Query<MarketParams>) -> Response {
    hits.markets.fetch_add(1, Ordering::SeqCst);
    if params.ids.contains("broken") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    let markets: Vec<Value> = params.ids.split(',').map(market).collect();
    Json(Value::Array(markets)).into_response()
}

/// Market object with integer numbers and no symbol or name
fn market(id: &str) -> Value {
    json!({
        "id": id,
        "current_price": 100,
        "market_cap": 1_260_000_000_000_u64,
        "market_cap_rank": 1
    })
}

async fn mock_quote(State(hits): State<Hits>, Query(params): Query<QuoteParams>) -> Json<Value> {
    hits.quotes.fetch_add(1, Ordering::SeqCst);
    if params.symbol == "BAD" {
        return Json(json!({ "Error Message": "Invalid API call." }));
    }
    Json(json!({ "Global Quote": { "01. symbol": params.symbol, "05. price": "187.50" } }))
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });
    format!("http://{}", addr)
}

async fn spawn_upstream() -> (String, Hits) {
    let hits = Hits::default();
    let router = Router::new()
        .route("/api/articles", get(mock_articles))
        .route("/api/polls/{id}", get(mock_poll))
        .route("/api/locations", get(mock_locations))
        .route("/coins/markets", get(mock_markets))
        .route("/query", get(mock_quote))
        .with_state(hits.clone());
    (spawn(router).await, hits)
}

struct TestApp {
    base: String,
    store: TtlStore,
    hits: Hits,
    client: reqwest::Client,
}

impl TestApp {
    async fn start() -> Self {
        Self::start_with(TtlStore::new(), |_| {}).await
    }

    async fn start_with(store: TtlStore, tweak: impl FnOnce(&mut Config)) -> Self {
        let (upstream, hits) = spawn_upstream().await;
        let mut config = Config {
            upstream_url: Some(upstream.clone()),
            coingecko_base_url: upstream.clone(),
            alpha_vantage_base_url: upstream,
            ..Config::default()
        };
        tweak(&mut config);

        let state = AppState::new(&config, store.clone());
        let base = spawn(build_router(state)).await;

        Self {
            base,
            store,
            hits,
            client: reqwest::Client::new(),
        }
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .expect("Request failed")
    }

    async fn get_json(&self, path: &str) -> (StatusCode, Option<String>, Value) {
        let response = self.get(path).await;
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        let cache = response
            .headers()
            .get("x-cache")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.json().await.expect("Body is not JSON");
        (status, cache, body)
    }
}

#[tokio::test]
async fn test_identical_route_requests_hit_upstream_once() {
    let app = TestApp::start().await;

    let (status1, cache1, body1) = app.get_json("/api/articles?page=1").await;
    let (status2, cache2, body2) = app.get_json("/api/articles?page=1").await;

    assert_eq!(status1, StatusCode::OK);
    assert_eq!(status2, StatusCode::OK);
    assert!(cache1.is_none(), "first response comes from upstream");
    assert_eq!(cache2.as_deref(), Some("HIT"));
    assert_eq!(body1, body2);
    assert_eq!(Hits::get(&app.hits.articles), 1);

    let (_, cache3, body3) = app.get_json("/api/articles?page=2").await;

    assert!(cache3.is_none());
    assert_eq!(body3["query"], "page=2");
    assert_eq!(Hits::get(&app.hits.articles), 2);
    assert!(app
        .store
        .keys()
        .contains(&"articles-list:/api/articles?page=1".to_string()));
}

#[tokio::test]
async fn test_route_entry_expires_after_ttl() {
    let clock = ManualClock::default();
    let app = TestApp::start_with(TtlStore::with_clock(Arc::new(clock.clone())), |_| {}).await;

    app.get_json("/api/articles").await;
    clock.advance_secs(299);
    app.get_json("/api/articles").await;
    assert_eq!(Hits::get(&app.hits.articles), 1);

    clock.advance_secs(2);
    let (_, cache, _) = app.get_json("/api/articles").await;

    assert!(cache.is_none());
    assert_eq!(Hits::get(&app.hits.articles), 2);
}

#[tokio::test]
async fn test_failed_route_response_is_not_cached() {
    let app = TestApp::start().await;

    let (status1, _, body1) = app.get_json("/api/polls/missing").await;
    let (status2, cache2, _) = app.get_json("/api/polls/missing").await;

    assert_eq!(status1, StatusCode::NOT_FOUND);
    assert_eq!(status2, StatusCode::NOT_FOUND);
    assert!(cache2.is_none());
    assert_eq!(body1, json!({ "error": "Poll not found" }));
    assert_eq!(Hits::get(&app.hits.polls), 2);
    assert!(app.store.is_empty());

    let (status, _, body) = app.get_json("/api/polls/7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "7");
    assert_eq!(app.store.keys(), vec!["poll:/api/polls/7".to_string()]);
}

#[tokio::test]
async fn test_non_json_body_is_passed_through_uncached() {
    let app = TestApp::start().await;

    for _ in 0..2 {
        let response = app.get("/api/locations").await;
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(
            response.headers().get("content-type").and_then(|v| v.to_str().ok()),
            Some("text/plain")
        );
        assert_eq!(response.text().await.unwrap(), "not json");
    }

    assert_eq!(Hits::get(&app.hits.locations), 2);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_concurrent_misses_all_receive_the_same_body() {
    let app = TestApp::start().await;

    let requests = (0..5).map(|_| app.get_json("/api/articles?feed=local"));
    let responses = futures::future::join_all(requests).await;

    let first = &responses[0].2;
    assert!(responses.iter().all(|(status, _, body)| *status == StatusCode::OK && body == first));
    // Concurrent misses are not coalesced, but they never create duplicate entries.
    let upstream_calls = Hits::get(&app.hits.articles);
    assert!((1..=5).contains(&upstream_calls));
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn test_crypto_endpoint_caches_by_ids() {
    let app = TestApp::start().await;

    let (status, _, body) = app.get_json("/api/crypto").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([market("bitcoin"), market("ethereum")]));
    assert!(body[0]["current_price"].is_u64(), "integers are echoed as integers");
    assert!(body[0].get("symbol").is_none(), "absent fields stay absent");
    assert_eq!(Hits::get(&app.hits.markets), 1);

    let (_, cache, cached_body) = app.get_json("/api/crypto").await;
    assert!(cache.is_none(), "quote endpoints do not set the route cache header");
    assert_eq!(cached_body, body);
    assert_eq!(app.store.keys(), vec!["crypto_bitcoin,ethereum".to_string()]);

    app.get_json("/api/crypto?ids=solana").await;
    assert_eq!(Hits::get(&app.hits.markets), 2);
}

#[tokio::test]
async fn test_crypto_failure_serves_fallback_uncached() {
    let app = TestApp::start().await;

    let (status, _, body) = app.get_json("/api/crypto?ids=broken").await;
    app.get_json("/api/crypto?ids=broken").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], "bitcoin");
    assert_eq!(body[0]["current_price"], 43456.78);
    assert_eq!(Hits::get(&app.hits.markets), 2);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_stock_requires_symbol() {
    let app = TestApp::start().await;

    let (status, _, body) = app.get_json("/api/stock").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Symbol parameter is required" }));
    assert_eq!(Hits::get(&app.hits.quotes), 0);
}

#[tokio::test]
async fn test_stock_quote_is_cached_and_errors_are_not() {
    let app = TestApp::start().await;

    let (status, _, body) = app.get_json("/api/stock?symbol=IBM").await;
    app.get_json("/api/stock?symbol=IBM&function=GLOBAL_QUOTE").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Global Quote"]["01. symbol"], "IBM");
    assert_eq!(Hits::get(&app.hits.quotes), 1);
    assert_eq!(app.store.keys(), vec!["stock_GLOBAL_QUOTE_IBM".to_string()]);

    let (status, _, body) = app.get_json("/api/stock?symbol=BAD").await;
    app.get_json("/api/stock?symbol=BAD").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to fetch stock data" }));
    assert_eq!(Hits::get(&app.hits.quotes), 3);
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn test_stock_cleanup_removes_day_old_quotes() {
    let clock = ManualClock::default();
    let app = TestApp::start_with(TtlStore::with_clock(Arc::new(clock.clone())), |config| {
        config.cache_ttl_secs = 7 * 24 * 60 * 60;
    })
    .await;

    app.get_json("/api/stock?symbol=IBM").await;
    clock.advance_secs(25 * 60 * 60);
    app.get_json("/api/stock?symbol=MSFT").await;
    app.get_json("/api/articles").await;

    let response = app
        .client
        .post(format!("{}/api/stock", app.base))
        .send()
        .await
        .expect("Request failed");
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["message"], "Cache cleaned successfully");
    assert_eq!(body["removed"], 1);
    assert_eq!(
        app.store.keys(),
        vec![
            "articles-list:/api/articles".to_string(),
            "stock_GLOBAL_QUOTE_MSFT".to_string()
        ]
    );
}

#[tokio::test]
async fn test_admin_clears_by_pattern_and_all() {
    let app = TestApp::start().await;
    app.get_json("/api/articles?page=1").await;
    app.get_json("/api/polls/3").await;
    app.get_json("/api/crypto").await;

    let (_, _, stats) = app.get_json("/admin/cache").await;
    assert_eq!(stats["entries"], 3);

    let cleared: Value = app
        .client
        .delete(format!("{}/admin/cache?pattern=crypto", app.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleared, json!({ "cleared": 1 }));
    assert_eq!(app.store.len(), 2);

    // Pattern is a plain substring, so it reaches into the path part of route keys
    let cleared: Value = app
        .client
        .delete(format!("{}/admin/cache?pattern=page=1", app.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleared, json!({ "cleared": 1 }));
    assert_eq!(app.store.keys(), vec!["poll:/api/polls/3".to_string()]);

    let cleared: Value = app
        .client
        .delete(format!("{}/admin/cache", app.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleared, json!({ "cleared": "all" }));
    assert!(app.store.is_empty());

    app.get_json("/api/polls/3").await;
    assert_eq!(Hits::get(&app.hits.polls), 2, "cleared entries are fetched again");
}

#[tokio::test]
async fn test_admin_token_is_enforced_when_configured() {
    let app = TestApp::start_with(TtlStore::new(), |config| {
        config.admin_token = Some("s3cret".to_string());
    })
    .await;

    let response = app.get("/admin/cache").await;
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .client
        .get(format!("{}/admin/cache", app.base))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .client
        .delete(format!("{}/admin/cache", app.base))
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_backend_routes_need_upstream() {
    let app = TestApp::start_with(TtlStore::new(), |config| {
        config.upstream_url = None;
    })
    .await;

    let (status, _, body) = app.get_json("/api/articles").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "error": "News backend is not configured" }));
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::start().await;

    let (status, _, body) = app.get_json("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
