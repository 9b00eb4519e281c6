//! Jupiter API Client
//!
//! HTTP client for the Jupiter swap API quote endpoint. One attempt per
//! call: the aggregator drops a failed source for the round instead of
//! retrying it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use super::quote::{JupiterQuoteParams, JupiterQuoteResponse};
use crate::domain::venue::JupiterVenueConfig;
use crate::domain::{Quote, QuoteRequest, RoutingError, Venue};
use crate::ports::QuoteSource;

/// Jupiter API client configuration
#[derive(Debug, Clone)]
pub struct JupiterConfig {
    /// Base URL for Jupiter API
    pub api_base_url: String,
    /// Optional API key for higher rate limits
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for JupiterConfig {
    fn default() -> Self {
        Self {
            // https://api.jup.ag/swap/v1 needs an API key for higher rate limits
            api_base_url: "https://api.jup.ag/swap/v1".to_string(),
            api_key: None,
            timeout: Duration::from_secs(8),
        }
    }
}

impl From<&JupiterVenueConfig> for JupiterConfig {
    fn from(venue: &JupiterVenueConfig) -> Self {
        Self {
            api_base_url: venue.api_url.trim_end_matches('/').to_string(),
            api_key: venue.api_key.clone(),
            ..Default::default()
        }
    }
}

/// Jupiter DEX aggregator client
#[derive(Debug, Clone)]
pub struct JupiterClient {
    config: JupiterConfig,
    http: Client,
}

fn unavailable(reason: impl Into<String>) -> RoutingError {
    RoutingError::source_unavailable(Venue::Jupiter.name(), reason)
}

impl JupiterClient {
    /// Create a new Jupiter client with default configuration
    pub fn new() -> Result<Self, RoutingError> {
        Self::with_config(JupiterConfig::default())
    }

    /// Create a new Jupiter client with custom configuration
    pub fn with_config(config: JupiterConfig) -> Result<Self, RoutingError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    /// Create a new Jupiter client with API key
    pub fn with_api_key(api_key: String) -> Result<Self, RoutingError> {
        let config = JupiterConfig {
            api_key: Some(api_key),
            ..Default::default()
        };
        Self::with_config(config)
    }

    /// Get a raw quote response for a token swap
    pub async fn get_quote(&self, params: &JupiterQuoteParams) -> Result<JupiterQuoteResponse, RoutingError> {
        let url = format!("{}/quote", self.config.api_base_url);

        let mut req = self.http.get(&url).query(&params.query_pairs());
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("x-api-key", api_key);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                unavailable("request timed out")
            } else {
                unavailable(e.to_string())
            }
        })?;

        self.handle_response(response).await
    }

    /// Handle API response and deserialize
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T, RoutingError> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(unavailable("rate limit exceeded"));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("API error {}: {}", status, error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse response: {}", e)))
    }

    /// Get the configured API base URL
    pub fn api_base_url(&self) -> &str {
        &self.config.api_base_url
    }
}

#[async_trait]
impl QuoteSource for JupiterClient {
    fn venue(&self) -> Venue {
        Venue::Jupiter
    }

    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote, RoutingError> {
        let started = Instant::now();
        let params = JupiterQuoteParams::new(
            request.input_mint.clone(),
            request.output_mint.clone(),
            request.amount,
            request.slippage_bps,
        );

        let response = self.get_quote(&params).await?;
        response
            .into_quote(started.elapsed().as_millis() as u64)
            .ok_or_else(|| unavailable("unparseable amounts in quote"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jupiter_config_default() {
        let config = JupiterConfig::default();
        assert_eq!(config.api_base_url, "https://api.jup.ag/swap/v1");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_config_from_venue_record() {
        let venue = JupiterVenueConfig {
            api_url: "https://example.org/swap/v1/".into(),
            api_key: Some("key".into()),
            enabled: true,
        };
        let config = JupiterConfig::from(&venue);
        assert_eq!(config.api_base_url, "https://example.org/swap/v1");
        assert_eq!(config.api_key.as_deref(), Some("key"));
    }

    #[test]
    fn test_jupiter_client_creation() {
        let client = JupiterClient::new().unwrap();
        assert_eq!(client.venue(), Venue::Jupiter);
        assert_eq!(client.priority(), 1);
    }

    #[test]
    fn test_jupiter_client_with_api_key() {
        let client = JupiterClient::with_api_key("test-key".to_string());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_source_unavailable() {
        let client = JupiterClient::with_config(JupiterConfig {
            api_base_url: "http://127.0.0.1:9".into(),
            api_key: None,
            timeout: Duration::from_millis(500),
        })
        .unwrap();

        let err = client
            .fetch_quote(&QuoteRequest::new("SOL", "USDC", 1_000))
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::SourceUnavailable { ref name, .. } if name == "jupiter"));
    }
}
