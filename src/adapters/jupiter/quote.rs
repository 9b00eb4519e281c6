//! Jupiter Quote Types
//!
//! Wire format of the Jupiter swap API `/quote` endpoint and its mapping
//! onto the venue-neutral `Quote`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Quote, RouteLeg, Venue};

/// Query parameters for `/quote`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JupiterQuoteParams {
    pub input_mint: String,
    pub output_mint: String,
    /// Amount in base units (lamports for SOL)
    pub amount: u64,
    /// Slippage tolerance in basis points (1 = 0.01%)
    pub slippage_bps: u16,
    /// Only use direct routes (no intermediate tokens)
    #[serde(default)]
    pub only_direct_routes: bool,
}

impl JupiterQuoteParams {
    pub fn new(input_mint: String, output_mint: String, amount: u64, slippage_bps: u16) -> Self {
        Self {
            input_mint,
            output_mint,
            amount,
            slippage_bps,
            only_direct_routes: false,
        }
    }

    pub fn with_direct_routes(mut self, direct: bool) -> Self {
        self.only_direct_routes = direct;
        self
    }

    /// Query string pairs in the order the API documents them
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("inputMint", self.input_mint.clone()),
            ("outputMint", self.output_mint.clone()),
            ("amount", self.amount.to_string()),
            ("slippageBps", self.slippage_bps.to_string()),
        ];
        if self.only_direct_routes {
            pairs.push(("onlyDirectRoutes", "true".to_string()));
        }
        pairs
    }
}

/// Response from the Jupiter quote API. Amounts arrive as decimal strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JupiterQuoteResponse {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: String,
    pub out_amount: String,
    /// Minimum output amount after slippage
    pub other_amount_threshold: String,
    #[serde(default)]
    pub swap_mode: String,
    #[serde(default)]
    pub slippage_bps: u16,
    /// Price impact as a string ratio
    #[serde(default)]
    pub price_impact_pct: String,
    pub route_plan: Vec<RoutePlanStep>,
    #[serde(default)]
    pub context_slot: Option<u64>,
    #[serde(default)]
    pub time_taken: Option<f64>,
    /// Catch-all for any additional fields from API
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A step in the route plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanStep {
    pub swap_info: SwapInfo,
    /// Percentage of the trade going through this step
    pub percent: u8,
}

/// A single hop of the route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInfo {
    pub amm_key: String,
    /// DEX label (e.g. "Raydium", "Whirlpool")
    pub label: String,
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: String,
    pub out_amount: String,
    /// Not always returned by the API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_mint: Option<String>,
}

fn parse_amount(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}

impl JupiterQuoteResponse {
    pub fn input_amount(&self) -> Option<u64> {
        parse_amount(&self.in_amount)
    }

    pub fn output_amount(&self) -> Option<u64> {
        parse_amount(&self.out_amount)
    }

    /// Price impact in percent. The API reports a ratio (0.0012 = 0.12%).
    pub fn price_impact_percent(&self) -> f64 {
        self.price_impact_pct
            .parse::<f64>()
            .map(|ratio| ratio.abs() * 100.0)
            .unwrap_or(0.0)
    }

    /// Map onto the venue-neutral quote; None when amounts do not parse
    pub fn into_quote(self, time_taken_ms: u64) -> Option<Quote> {
        let in_amount = self.input_amount()?;
        let out_amount = self.output_amount()?;
        let other_amount_threshold = parse_amount(&self.other_amount_threshold).unwrap_or(out_amount);
        let price_impact_pct = self.price_impact_percent();

        let route_plan = self
            .route_plan
            .iter()
            .map(|step| RouteLeg {
                venue: Venue::Jupiter,
                label: step.swap_info.label.clone(),
                in_amount: parse_amount(&step.swap_info.in_amount).unwrap_or(0),
                out_amount: parse_amount(&step.swap_info.out_amount).unwrap_or(0),
            })
            .collect();

        Some(Quote {
            input_mint: self.input_mint,
            output_mint: self.output_mint,
            in_amount,
            out_amount,
            other_amount_threshold,
            price_impact_pct,
            route_plan,
            context_slot: self.context_slot,
            time_taken_ms,
        })
    }
}
