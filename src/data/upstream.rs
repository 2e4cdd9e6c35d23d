//! Pass-through client for the news backend
//!
//! Forwards read requests verbatim (path and query) to the configured
//! backend origin and hands back its status, content type and body.

use axum::body::Bytes;
use reqwest::{header, Client};
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when calling the news backend
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// A response from the news backend, not yet interpreted
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Client for the news backend
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl UpstreamClient {
    /// Create a new UpstreamClient for the given origin (e.g. "http://backend:5000")
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Sends `apikey` and bearer headers with every request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward a GET request
    ///
    /// # Arguments
    /// * `path_and_query` - Request target starting with `/` (e.g. "/api/polls?page=2")
    ///
    /// # Returns
    /// * `Ok(UpstreamResponse)` - Whatever the backend answered, including 4xx/5xx
    /// * `Err(UpstreamError)` - If the backend could not be reached
    pub async fn forward(&self, path_and_query: &str) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}{}", self.base_url, path_and_query);

        let mut request = self.client.get(&url).header(header::ACCEPT, "application/json");
        if let Some(ref api_key) = self.api_key {
            request = request.header("apikey", api_key).bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_client_trims_trailing_slash() {
        let client = UpstreamClient::new("http://backend:5000/");
        assert_eq!(client.base_url(), "http://backend:5000");
        assert!(client.api_key.is_none());
    }

    #[test]
    fn test_upstream_client_with_api_key() {
        let client = UpstreamClient::new("http://backend:5000").with_api_key("secret");
        assert_eq!(client.api_key.as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn test_forward_to_unreachable_backend_fails() {
        let client = UpstreamClient::new("http://127.0.0.1:9");
        let result = client.forward("/api/articles").await;
        assert!(matches!(result, Err(UpstreamError::RequestFailed(_))));
    }
}
