//! Alpha Vantage quote client
//!
//! Alpha Vantage reports most failures with HTTP 200 and a body carrying
//! `Error Message`, `Note` (rate limit) or `Information`; those bodies are
//! surfaced as [`StockError::Upstream`] so they are never cached.

use futures::FutureExt;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use super::StockQuery;
use crate::cache::{with_cache, BoxedOperation, CacheKey, CachedHandler, Outcome, TtlStore};

/// Base URL for the Alpha Vantage API
pub const ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co";

/// Function requested when the caller does not name one
pub const DEFAULT_FUNCTION: &str = "GLOBAL_QUOTE";

/// Namespace for stock cache keys
pub const STOCK_NAMESPACE: &str = "stock";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body fields Alpha Vantage uses to report a failed call
const UPSTREAM_ERROR_FIELDS: [&str; 3] = ["Error Message", "Note", "Information"];

/// Errors that can occur when fetching stock quotes
#[derive(Debug, Error)]
pub enum StockError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Upstream answered with a non-success status
    #[error("Alpha Vantage returned status {0}")]
    Status(u16),

    /// Upstream answered 200 with an error body
    #[error("Alpha Vantage error: {0}")]
    Upstream(String),
}

/// Client for the Alpha Vantage query endpoint
#[derive(Debug, Clone)]
pub struct StockClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl StockClient {
    /// Create a new StockClient against the public Alpha Vantage API
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(ALPHA_VANTAGE_BASE_URL, api_key)
    }

    /// Create a new StockClient against a different base URL
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Fetch a quote
    ///
    /// # Arguments
    /// * `query` - Function and symbol to request
    ///
    /// # Returns
    /// * `Ok(Value)` - The Alpha Vantage body, unmodified
    /// * `Err(StockError)` - If the request fails or Alpha Vantage reports an error
    pub async fn fetch_quote(&self, query: &StockQuery) -> Result<Value, StockError> {
        let url = format!("{}/query", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("function", query.function.as_str()),
                ("symbol", query.symbol.as_str()),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StockError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text)?;
        check_body(body)
    }
}

fn check_body(body: Value) -> Result<Value, StockError> {
    for field in UPSTREAM_ERROR_FIELDS {
        if let Some(message) = body.get(field) {
            let message = message
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| message.to_string());
            return Err(StockError::Upstream(message));
        }
    }
    Ok(body)
}

/// Cache key for a quote: `stock_{function}_{symbol}`
pub fn quote_key(query: &StockQuery) -> CacheKey {
    CacheKey::param(STOCK_NAMESPACE, &format!("{}_{}", query.function, query.symbol))
}

/// Cached quote lookups
pub type StockQuotes = CachedHandler<fn(&StockQuery) -> CacheKey, BoxedOperation<StockQuery, Value>>;

/// Wraps `client` in a read-through cache on `store`
///
/// Failures become a 500 outcome with a generic error body, which is passed
/// to the caller and not cached.
pub fn cached_quotes(client: StockClient, store: TtlStore, ttl_seconds: u64) -> StockQuotes {
    let operation: BoxedOperation<StockQuery, Value> = Box::new(move |query: StockQuery| {
        let client = client.clone();
        async move {
            match client.fetch_quote(&query).await {
                Ok(body) => Outcome::http(body, 200),
                Err(err) => {
                    warn!(symbol = %query.symbol, function = %query.function, error = %err, "stock fetch failed");
                    Outcome::http(json!({ "error": "Failed to fetch stock data" }), 500)
                }
            }
        }
        .boxed()
    });

    with_cache(store, quote_key as fn(&StockQuery) -> CacheKey, ttl_seconds, operation)
}
