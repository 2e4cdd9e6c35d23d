//! Cache key derivation
//!
//! Two shapes are in use. Route keys join a namespace with the request's raw
//! path and query (`articles-list:/api/articles?page=2`). Parameter keys join
//! a namespace with a single identifying value (`crypto_bitcoin,ethereum`).
//!
//! Query parameters are taken verbatim, so `?a=1&b=2` and `?b=2&a=1` produce
//! different keys unless normalization is asked for explicitly.

use axum::http::Uri;
use std::fmt;

/// A derived cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for an HTTP route: `"{namespace}:{path}?{query}"`
    pub fn route(namespace: &str, uri: &Uri) -> Self {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        Self(format!("{}:{}", namespace, path_and_query))
    }

    /// Like [`CacheKey::route`], but with query pairs sorted
    pub fn route_normalized(namespace: &str, uri: &Uri) -> Self {
        match uri.query() {
            Some(query) if !query.is_empty() => {
                let mut pairs: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
                pairs.sort_unstable();
                Self(format!("{}:{}?{}", namespace, uri.path(), pairs.join("&")))
            }
            _ => Self(format!("{}:{}", namespace, uri.path())),
        }
    }

    /// Key for a single identifying parameter: `"{namespace}_{identifier}"`
    pub fn param(namespace: &str, identifier: &str) -> Self {
        Self(format!("{}_{}", namespace, identifier))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
