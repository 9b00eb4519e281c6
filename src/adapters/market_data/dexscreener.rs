//! DexScreener price source. Free, no key; uses the most liquid pair.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::ports::{PriceError, PriceSource};

pub const DEXSCREENER_TOKENS_API: &str = "https://api.dexscreener.com/latest/dex/tokens";

#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TokensResponse {
    #[serde(default)]
    pairs: Option<Vec<Pair>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pair {
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    liquidity: Option<Liquidity>,
}

#[derive(Debug, Deserialize)]
struct Liquidity {
    #[serde(default)]
    usd: f64,
}

impl Pair {
    fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().map(|l| l.usd).unwrap_or(0.0)
    }
}

impl DexScreenerClient {
    pub fn new(timeout: Duration) -> Result<Self, PriceError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: DEXSCREENER_TOKENS_API.to_string(),
        })
    }

    fn most_liquid_price(mint: &str, response: TokensResponse) -> Result<f64, PriceError> {
        let pairs = response.pairs.unwrap_or_default();
        let best = pairs
            .iter()
            .filter(|p| p.price_usd.is_some())
            .max_by(|a, b| a.liquidity_usd().total_cmp(&b.liquidity_usd()))
            .ok_or_else(|| PriceError::NoPriceData(mint.to_string()))?;

        best.price_usd
            .as_deref()
            .and_then(|p| p.parse::<f64>().ok())
            .ok_or_else(|| PriceError::ParseError(format!("priceUsd for {}", mint)))
    }
}

#[async_trait]
impl PriceSource for DexScreenerClient {
    fn name(&self) -> &str {
        "dexscreener"
    }

    async fn fetch_usd_price(&self, mint: &str) -> Result<f64, PriceError> {
        let url = format!("{}/{}", self.base_url, mint);
        let response: TokensResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Self::most_liquid_price(mint, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picks_most_liquid_pair() {
        let response: TokensResponse = serde_json::from_str(
            r#"{"pairs": [
                {"priceUsd": "0.84", "liquidity": {"usd": 1000.0}},
                {"priceUsd": "0.86", "liquidity": {"usd": 2500000.0}},
                {"priceUsd": "0.90"}
            ]}"#,
        )
        .unwrap();
        let price = DexScreenerClient::most_liquid_price("JUP", response).unwrap();
        assert!((price - 0.86).abs() < 1e-12);
    }

    #[test]
    fn test_no_pairs() {
        let response: TokensResponse = serde_json::from_str(r#"{"pairs": null}"#).unwrap();
        assert!(matches!(
            DexScreenerClient::most_liquid_price("JUP", response),
            Err(PriceError::NoPriceData(_))
        ));
    }
}
