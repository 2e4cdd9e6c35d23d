use std::sync::Arc;

use crate::cache::TtlStore;
use crate::config::Config;
use crate::data::{cached_markets, cached_quotes, CryptoClient, CryptoQuotes, StockClient, StockQuotes, UpstreamClient};

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The one store every cached route and quote endpoint writes to
    pub store: TtlStore,
    pub crypto: Arc<CryptoQuotes>,
    pub stock: Arc<StockQuotes>,
    pub upstream: Option<UpstreamClient>,
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    /// Wires clients and cached handlers around `store` according to `config`
    pub fn new(config: &Config, store: TtlStore) -> Self {
        let crypto = cached_markets(
            CryptoClient::with_base_url(&config.coingecko_base_url),
            store.clone(),
            config.cache_ttl_secs,
        );
        let stock = cached_quotes(
            StockClient::with_base_url(&config.alpha_vantage_base_url, &config.alpha_vantage_api_key),
            store.clone(),
            config.cache_ttl_secs,
        );
        let upstream = config.upstream_url.as_ref().map(|url| {
            let client = UpstreamClient::new(url);
            match config.upstream_api_key {
                Some(ref key) => client.with_api_key(key),
                None => client,
            }
        });

        Self {
            store,
            crypto: Arc::new(crypto),
            stock: Arc::new(stock),
            upstream,
            admin_token: config.admin_token.as_deref().map(Arc::from),
        }
    }
}
