//! Orca Whirlpool quote API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::time::Instant;

use crate::domain::venue::OrcaVenueConfig;
use crate::domain::{Quote, QuoteRequest, RouteLeg, RoutingError, Venue};
use crate::ports::QuoteSource;

/// Used when the API omits price impact
const DEFAULT_PRICE_IMPACT_PCT: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct OrcaClient {
    api_url: String,
    http: Client,
}

/// Amounts may arrive as strings or numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Amount {
    Text(String),
    Number(u64),
}

impl Amount {
    fn value(&self) -> Option<u64> {
        match self {
            Amount::Text(s) => s.trim().parse().ok(),
            Amount::Number(n) => Some(*n),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrcaQuoteResponse {
    #[serde(default)]
    in_amount: Option<Amount>,
    out_amount: Amount,
    #[serde(default, alias = "priceImpactPct")]
    price_impact: Option<serde_json::Value>,
}

impl OrcaQuoteResponse {
    fn price_impact_pct(&self) -> f64 {
        match &self.price_impact {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        }
        .map(f64::abs)
        .unwrap_or(DEFAULT_PRICE_IMPACT_PCT)
    }
}

fn unavailable(reason: impl Into<String>) -> RoutingError {
    RoutingError::source_unavailable(Venue::Orca.name(), reason)
}

impl OrcaClient {
    pub fn new(config: &OrcaVenueConfig, timeout: Duration) -> Result<Self, RoutingError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| unavailable(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn to_quote(request: &QuoteRequest, response: OrcaQuoteResponse, time_taken_ms: u64) -> Result<Quote, RoutingError> {
        let out_amount = response
            .out_amount
            .value()
            .filter(|out| *out > 0)
            .ok_or_else(|| unavailable("missing outAmount"))?;
        let in_amount = response
            .in_amount
            .as_ref()
            .and_then(Amount::value)
            .unwrap_or(request.amount);

        Ok(Quote {
            input_mint: request.input_mint.clone(),
            output_mint: request.output_mint.clone(),
            in_amount,
            out_amount,
            other_amount_threshold: (out_amount as u128 * 9_900 / 10_000) as u64,
            price_impact_pct: response.price_impact_pct(),
            route_plan: vec![RouteLeg {
                venue: Venue::Orca,
                label: "Whirlpool".into(),
                in_amount,
                out_amount,
            }],
            context_slot: None,
            time_taken_ms,
        })
    }
}

#[async_trait]
impl QuoteSource for OrcaClient {
    fn venue(&self) -> Venue {
        Venue::Orca
    }

    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote, RoutingError> {
        let started = Instant::now();
        let url = format!("{}/quote", self.api_url);
        let amount = request.amount.to_string();
        let slippage = (request.slippage_bps as f64 / 10_000.0).to_string();

        let response = self
            .http
            .get(&url)
            .query(&[
                ("inputMint", request.input_mint.as_str()),
                ("outputMint", request.output_mint.as_str()),
                ("amount", amount.as_str()),
                ("slippage", slippage.as_str()),
            ])
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unavailable(format!("API error {}", response.status())));
        }

        let body: OrcaQuoteResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse response: {}", e)))?;

        Self::to_quote(request, body, started.elapsed().as_millis() as u64)
    }
}
