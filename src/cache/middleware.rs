//! HTTP response caching for axum routes
//!
//! Attach [`cache_response`] to a route with
//! `axum::middleware::from_fn_with_state(RouteCache::new(..), cache_response)`.
//! Successful JSON responses to `GET` requests are stored under a route key
//! and replayed until they expire.

use axum::{
    body::{self, Body},
    extract::{Request, State},
    http::{header::HeaderName, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error, warn};

use super::key::CacheKey;
use super::store::TtlStore;

/// Header added to responses replayed from the store
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache");

/// Per-route cache settings
#[derive(Debug, Clone)]
pub struct RouteCache {
    store: TtlStore,
    namespace: String,
    ttl_seconds: u64,
    normalize_query: bool,
}

impl RouteCache {
    /// Creates route settings; query strings are keyed verbatim
    pub fn new(store: TtlStore, namespace: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            ttl_seconds,
            normalize_query: false,
        }
    }

    /// Sorts query pairs before keying, so parameter order does not split the cache
    pub fn with_normalized_query(mut self) -> Self {
        self.normalize_query = true;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    fn key_for(&self, request: &Request) -> CacheKey {
        if self.normalize_query {
            CacheKey::route_normalized(&self.namespace, request.uri())
        } else {
            CacheKey::route(&self.namespace, request.uri())
        }
    }
}

/// Serves cached `GET` responses and records fresh successful ones
///
/// Non-`GET` requests and non-2xx responses pass through untouched. A 2xx
/// body that is not valid JSON is returned as-is and not stored.
pub async fn cache_response(State(route): State<RouteCache>, request: Request, next: Next) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = route.key_for(&request);

    if let Some(payload) = route.store.get(key.as_str()) {
        debug!(key = %key, "route cache hit");
        return ([(CACHE_STATUS_HEADER, "HIT")], Json(payload)).into_response();
    }

    let response = next.run(request).await;
    if !response.status().is_success() {
        debug!(key = %key, status = %response.status(), "unsuccessful response not cached");
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(key = %key, error = %err, "failed to read response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(payload) => {
            route.store.set(key.as_str(), payload, route.ttl_seconds);
            debug!(key = %key, ttl = route.ttl_seconds, "route response cached");
        }
        Err(err) => {
            warn!(key = %key, error = %err, "response body is not JSON, skipping cache write");
        }
    }

    Response::from_parts(parts, Body::from(bytes))
}
