use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::ports::{PriceError, PriceSource};

pub const JUPITER_PRICE_API: &str = "https://api.jup.ag/price/v2";

#[derive(Debug, Clone)]
pub struct JupiterPriceClient {
    http: Client,
    base_url: String,
}

impl JupiterPriceClient {
    pub fn new(timeout: Duration) -> Result<Self, PriceError> {
        Self::with_base_url(JUPITER_PRICE_API, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, PriceError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get price for a single token in USD
    pub async fn get_price(&self, mint: &str) -> Result<f64, PriceError> {
        let response: PriceResponse = self
            .http
            .get(&self.base_url)
            .query(&[("ids", mint)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.price_of(mint)
    }

    /// Get price of base token in terms of quote token
    pub async fn get_pair_price(&self, base_mint: &str, quote_mint: &str) -> Result<f64, PriceError> {
        let ids = format!("{},{}", base_mint, quote_mint);
        let response: PriceResponse = self
            .http
            .get(&self.base_url)
            .query(&[("ids", ids.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let base_price = response.price_of(base_mint)?;
        let quote_price = response.price_of(quote_mint)?;

        // Return base in terms of quote
        Ok(base_price / quote_price)
    }
}

#[async_trait]
impl PriceSource for JupiterPriceClient {
    fn name(&self) -> &str {
        "jupiter"
    }

    async fn fetch_usd_price(&self, mint: &str) -> Result<f64, PriceError> {
        self.get_price(mint).await
    }
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    data: HashMap<String, Option<PriceData>>,
}

impl PriceResponse {
    fn price_of(&self, mint: &str) -> Result<f64, PriceError> {
        let data = self
            .data
            .get(mint)
            .and_then(|d| d.as_ref())
            .ok_or_else(|| PriceError::NoPriceData(mint.to_string()))?;
        data.price
            .value()
            .ok_or_else(|| PriceError::ParseError(format!("price for {}", mint)))
    }
}

#[derive(Debug, Deserialize)]
struct PriceData {
    price: PriceValue,
}

/// v2 sends prices as strings, older versions as numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceValue {
    Text(String),
    Number(f64),
}

impl PriceValue {
    fn value(&self) -> Option<f64> {
        match self {
            PriceValue::Text(s) => s.parse().ok(),
            PriceValue::Number(n) => Some(*n),
        }
    }
}
