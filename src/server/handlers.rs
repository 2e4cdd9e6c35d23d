use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Duration;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use super::state::AppState;
use crate::cache::{OutcomeStatus, Served};
use crate::data::crypto::DEFAULT_IDS;
use crate::data::stock::{DEFAULT_FUNCTION, STOCK_NAMESPACE};
use crate::data::StockQuery;

/// Stock entries older than this are removed by `POST /api/stock`
const STOCK_SWEEP_MAX_AGE_HOURS: i64 = 24;

#[derive(Debug, Deserialize)]
pub struct CryptoParams {
    pub ids: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StockParams {
    pub symbol: Option<String>,
    pub function: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClearParams {
    pub pattern: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn status_code(status: OutcomeStatus) -> StatusCode {
    match status {
        OutcomeStatus::Http(code) => StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        OutcomeStatus::Flag(true) => StatusCode::OK,
        OutcomeStatus::Flag(false) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/crypto?ids=bitcoin,ethereum
///
/// Always answers 200: upstream failures are covered by fallback quotes.
pub async fn crypto_markets(
    State(state): State<AppState>,
    Query(params): Query<CryptoParams>,
) -> Json<Vec<Value>> {
    let ids = non_empty(params.ids).unwrap_or_else(|| DEFAULT_IDS.to_string());
    Json(state.crypto.call(ids).await.into_payload())
}

/// GET /api/stock?symbol=IBM&function=GLOBAL_QUOTE
pub async fn stock_quote(State(state): State<AppState>, Query(params): Query<StockParams>) -> Response {
    let Some(symbol) = non_empty(params.symbol) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Symbol parameter is required" })),
        )
            .into_response();
    };
    let query = StockQuery {
        function: non_empty(params.function).unwrap_or_else(|| DEFAULT_FUNCTION.to_string()),
        symbol,
    };

    match state.stock.call(query).await {
        Served::Hit(body) => Json(body).into_response(),
        Served::Miss(outcome) => (status_code(outcome.status), Json(outcome.payload)).into_response(),
    }
}

/// POST /api/stock
///
/// Drops stock quotes stored more than a day ago.
pub async fn clean_stock_cache(State(state): State<AppState>) -> Json<Value> {
    let prefix = format!("{}_", STOCK_NAMESPACE);
    let removed = state
        .store
        .purge_stale(&prefix, Duration::hours(STOCK_SWEEP_MAX_AGE_HOURS));
    info!(removed, "CLEAN_STOCK_CACHE");

    Json(json!({ "message": "Cache cleaned successfully", "removed": removed }))
}

/// GET on any cached backend route
///
/// Forwards the request target unchanged; the backend's status, content
/// type and body are relayed as-is.
pub async fn forward_to_backend(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(ref upstream) = state.upstream else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "News backend is not configured" })),
        )
            .into_response();
    };

    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    match upstream.forward(target).await {
        Ok(upstream_response) => {
            let status = StatusCode::from_u16(upstream_response.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut response = (status, upstream_response.body).into_response();
            if let Some(content_type) = upstream_response
                .content_type
                .and_then(|ct| HeaderValue::from_str(&ct).ok())
            {
                response.headers_mut().insert(header::CONTENT_TYPE, content_type);
            }
            response
        }
        Err(err) => {
            error!(path = target, error = %err, "news backend request failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "News backend unavailable" })),
            )
                .into_response()
        }
    }
}

/// GET /admin/cache
pub async fn cache_stats(State(state): State<AppState>) -> Json<Value> {
    let keys = state.store.keys();
    Json(json!({ "entries": keys.len(), "keys": keys }))
}

/// DELETE /admin/cache?pattern=...
///
/// Without a pattern every entry is dropped.
pub async fn clear_cache(State(state): State<AppState>, Query(params): Query<ClearParams>) -> Json<Value> {
    match non_empty(params.pattern) {
        Some(pattern) => {
            let cleared = state.store.delete_matching(&pattern);
            info!(pattern = %pattern, cleared, "CLEAR_CACHE");
            Json(json!({ "cleared": cleared }))
        }
        None => {
            state.store.clear_all();
            info!("CLEAR_CACHE: all");
            Json(json!({ "cleared": "all" }))
        }
    }
}
