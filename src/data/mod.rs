//! Upstream data sources and their models
//!
//! This module contains the clients for the third-party quote APIs and the
//! news backend, plus the request types they take.

pub mod crypto;
pub mod stock;
pub mod upstream;

pub use crypto::{cached_markets, CryptoClient, CryptoError, CryptoQuotes};
pub use stock::{cached_quotes, StockClient, StockError, StockQuotes};
pub use upstream::{UpstreamClient, UpstreamError, UpstreamResponse};

/// Parameters identifying a stock quote request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockQuery {
    /// Alpha Vantage function (e.g. "GLOBAL_QUOTE")
    pub function: String,
    /// Ticker symbol (e.g. "IBM")
    pub symbol: String,
}
