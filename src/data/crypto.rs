//! CoinGecko market data client
//!
//! Fetches USD market data for a comma-separated list of coin ids. Market
//! objects are kept exactly as CoinGecko sends them. The cached wrapper serves
//! built-in fallback quotes when CoinGecko is unreachable; those are returned
//! to the caller but never stored.

use futures::FutureExt;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::cache::{with_cache, BoxedOperation, CacheKey, CachedHandler, Outcome, TtlStore};

/// Base URL for the CoinGecko v3 API
pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Ids requested when the caller does not name any
pub const DEFAULT_IDS: &str = "bitcoin,ethereum";

/// Namespace for crypto cache keys
pub const CRYPTO_NAMESPACE: &str = "crypto";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when fetching crypto market data
#[derive(Debug, Error)]
pub enum CryptoError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Upstream answered with a non-success status
    #[error("CoinGecko returned status {0}")]
    Status(u16),
}

/// Client for the CoinGecko markets endpoint
#[derive(Debug, Clone)]
pub struct CryptoClient {
    client: Client,
    base_url: String,
}

impl Default for CryptoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoClient {
    /// Create a new CryptoClient pointed at the public CoinGecko API
    pub fn new() -> Self {
        Self::with_base_url(COINGECKO_BASE_URL)
    }

    /// Create a new CryptoClient against a different base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch market data for the given ids
    ///
    /// # Arguments
    /// * `ids` - Comma-separated CoinGecko ids (e.g. "bitcoin,ethereum")
    ///
    /// # Returns
    /// * `Ok(Vec<Value>)` - Market objects as sent by CoinGecko
    /// * `Err(CryptoError)` - If the request fails, is rejected, or the body is not a JSON array
    pub async fn fetch_markets(&self, ids: &str) -> Result<Vec<Value>, CryptoError> {
        let url = format!("{}/coins/markets", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", "usd"),
                ("ids", ids),
                ("order", "market_cap_desc"),
                ("per_page", "100"),
                ("page", "1"),
                ("sparkline", "false"),
                ("price_change_percentage", "24h"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CryptoError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        parse_markets(&text)
    }
}

/// Parses a `/coins/markets` body, requiring only that it is a JSON array
fn parse_markets(text: &str) -> Result<Vec<Value>, CryptoError> {
    Ok(serde_json::from_str(text)?)
}

/// Quotes served when CoinGecko cannot be reached
pub fn fallback_markets() -> Vec<Value> {
    vec![
        json!({
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "current_price": 43456.78,
            "price_change_24h": 1234.56,
            "price_change_percentage_24h": 2.91,
            "market_cap": 845678912345_u64
        }),
        json!({
            "id": "ethereum",
            "symbol": "eth",
            "name": "Ethereum",
            "current_price": 2345.67,
            "price_change_24h": -43.67,
            "price_change_percentage_24h": -1.7,
            "market_cap": 276543123456_u64
        }),
    ]
}

/// Cache key for an id list: `crypto_{ids}`
pub fn markets_key(ids: &str) -> CacheKey {
    CacheKey::param(CRYPTO_NAMESPACE, ids)
}

/// Cached market lookups, keyed by the raw id list
pub type CryptoQuotes = CachedHandler<fn(&String) -> CacheKey, BoxedOperation<String, Vec<Value>>>;

/// Wraps `client` in a read-through cache on `store`
///
/// A failed fetch yields the fallback quotes flagged as unsuccessful, so they
/// reach the caller without populating the cache.
pub fn cached_markets(client: CryptoClient, store: TtlStore, ttl_seconds: u64) -> CryptoQuotes {
    let operation: BoxedOperation<String, Vec<Value>> = Box::new(move |ids: String| {
        let client = client.clone();
        async move {
            match client.fetch_markets(&ids).await {
                Ok(markets) => Outcome::flagged(markets, true),
                Err(err) => {
                    warn!(ids = %ids, error = %err, "crypto fetch failed, serving fallback quotes");
                    Outcome::flagged(fallback_markets(), false)
                }
            }
        }
        .boxed()
    });

    let key_fn: fn(&String) -> CacheKey = |ids| markets_key(ids);
    with_cache(store, key_fn, ttl_seconds, operation)
}
