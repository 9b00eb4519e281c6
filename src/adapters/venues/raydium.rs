//! Raydium price-based quote estimate.
//!
//! Raydium's public API exposes USD prices, not quotes. The estimate is
//! `amount * price_in / price_out` less the pool fee, with a nominal
//! price impact.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::time::Instant;

use crate::domain::venue::RaydiumVenueConfig;
use crate::domain::{Quote, QuoteRequest, RouteLeg, RoutingError, Venue};
use crate::ports::QuoteSource;

/// Price impact reported for estimates
const ESTIMATE_PRICE_IMPACT_PCT: f64 = 0.1;

/// Buffer applied to the estimate for `other_amount_threshold`
const THRESHOLD_BUFFER_BPS: u128 = 100;

#[derive(Debug, Clone)]
pub struct RaydiumClient {
    api_url: String,
    fee_bps: u16,
    http: Client,
}

/// `/main/price` answers either `{mint: price}` or `{mint: {price}}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceEntry {
    Plain(f64),
    Nested { price: f64 },
}

impl PriceEntry {
    fn value(&self) -> f64 {
        match self {
            PriceEntry::Plain(p) => *p,
            PriceEntry::Nested { price } => *price,
        }
    }
}

fn unavailable(reason: impl Into<String>) -> RoutingError {
    RoutingError::source_unavailable(Venue::Raydium.name(), reason)
}

impl RaydiumClient {
    pub fn new(config: &RaydiumVenueConfig, timeout: Duration) -> Result<Self, RoutingError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| unavailable(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            fee_bps: config.fee_bps,
            http,
        })
    }

    async fn fetch_prices(&self, input_mint: &str, output_mint: &str) -> Result<(f64, f64), RoutingError> {
        let url = format!("{}/main/price", self.api_url);
        let tokens = format!("{},{}", input_mint, output_mint);

        let response = self
            .http
            .get(&url)
            .query(&[("tokens", tokens.as_str())])
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unavailable(format!("API error {}", response.status())));
        }

        let prices: HashMap<String, PriceEntry> = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse response: {}", e)))?;

        let price = |mint: &str| {
            prices
                .get(mint)
                .map(PriceEntry::value)
                .filter(|p| p.is_finite() && *p > 0.0)
                .ok_or_else(|| unavailable(format!("no price for {}", mint)))
        };
        Ok((price(input_mint)?, price(output_mint)?))
    }

    /// Output estimate in output base units
    pub fn estimate(&self, request: &QuoteRequest, price_in: f64, price_out: f64) -> u64 {
        let out_tokens = request.amount_ui() * price_in / price_out;
        let gross = (out_tokens * 10f64.powi(request.output_decimals as i32)).floor() as u128;
        let keep = 10_000u128.saturating_sub(self.fee_bps as u128);
        (gross * keep / 10_000) as u64
    }
}

#[async_trait]
impl QuoteSource for RaydiumClient {
    fn venue(&self) -> Venue {
        Venue::Raydium
    }

    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote, RoutingError> {
        let started = Instant::now();
        let (price_in, price_out) = self.fetch_prices(&request.input_mint, &request.output_mint).await?;
        let out_amount = self.estimate(request, price_in, price_out);

        Ok(Quote {
            input_mint: request.input_mint.clone(),
            output_mint: request.output_mint.clone(),
            in_amount: request.amount,
            out_amount,
            other_amount_threshold: (out_amount as u128 * (10_000 - THRESHOLD_BUFFER_BPS) / 10_000) as u64,
            price_impact_pct: ESTIMATE_PRICE_IMPACT_PCT,
            route_plan: vec![RouteLeg {
                venue: Venue::Raydium,
                label: "Raydium".into(),
                in_amount: request.amount,
                out_amount,
            }],
            context_slot: None,
            time_taken_ms: started.elapsed().as_millis() as u64,
        })
    }
}
