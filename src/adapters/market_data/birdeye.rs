//! Birdeye public API price source. Requires an API key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::ports::{PriceError, PriceSource};

pub const BIRDEYE_PRICE_API: &str = "https://public-api.birdeye.so/defi/price";

#[derive(Debug, Clone)]
pub struct BirdeyePriceClient {
    http: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct BirdeyeResponse {
    #[serde(default)]
    success: bool,
    data: Option<BirdeyePrice>,
}

#[derive(Debug, Deserialize)]
struct BirdeyePrice {
    value: f64,
}

impl BirdeyePriceClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, PriceError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            base_url: BIRDEYE_PRICE_API.to_string(),
        })
    }

    fn parse(mint: &str, response: BirdeyeResponse) -> Result<f64, PriceError> {
        match response.data {
            Some(price) if response.success => Ok(price.value),
            _ => Err(PriceError::NoPriceData(mint.to_string())),
        }
    }
}

#[async_trait]
impl PriceSource for BirdeyePriceClient {
    fn name(&self) -> &str {
        "birdeye"
    }

    async fn fetch_usd_price(&self, mint: &str) -> Result<f64, PriceError> {
        let response: BirdeyeResponse = self
            .http
            .get(&self.base_url)
            .query(&[("address", mint)])
            .header("X-API-KEY", &self.api_key)
            .header("x-chain", "solana")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Self::parse(mint, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let response: BirdeyeResponse =
            serde_json::from_str(r#"{"success": true, "data": {"value": 0.8512, "updateUnixTime": 1}}"#).unwrap();
        assert!((BirdeyePriceClient::parse("JUP", response).unwrap() - 0.8512).abs() < 1e-12);
    }

    #[test]
    fn test_parse_failure() {
        let response: BirdeyeResponse = serde_json::from_str(r#"{"success": false, "data": null}"#).unwrap();
        assert!(BirdeyePriceClient::parse("JUP", response).is_err());
    }
}
