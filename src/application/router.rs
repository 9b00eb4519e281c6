//! Quote Router
//!
//! Turns a swap request into an executable plan: cached or fanned-out
//! quotes, split allocation for large trades, slippage sizing, and an
//! internal pool fill when the pool beats the venues.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::application::aggregator::{BestQuote, MultiSourceAggregator};
use crate::application::price_oracle::PriceOracle;
use crate::domain::{
    DynamicSlippageCalculator, InternalFill, InternalLiquidityPool, QuoteRequest, RouteSplit,
    RoutingError, SplitOutcome, SplitRouteCalculator, SwapOpportunity, SwapPlan, Venue,
};

/// Default validity of a routed plan
pub const DEFAULT_PLAN_TTL_MS: i64 = 30_000;

const FULL_WEIGHT_BPS: u16 = 10_000;

/// Largest token precision accepted; 10^18 still fits a u64
pub const MAX_TOKEN_DECIMALS: u8 = 18;

/// A caller's swap request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapRequest {
    pub input_mint: String,
    pub output_mint: String,
    /// Input amount in base units
    pub amount: u64,
    pub input_decimals: u8,
    pub output_decimals: u8,
    /// Fixed tolerance; dynamic sizing when None
    pub slippage_bps: Option<u32>,
    pub volatility_bps: u32,
    /// Depth of the traded pool, None when unknown
    pub pool_tvl_usd: Option<u64>,
}

impl SwapRequest {
    pub fn new(input_mint: impl Into<String>, output_mint: impl Into<String>, amount: u64) -> Self {
        Self {
            input_mint: input_mint.into(),
            output_mint: output_mint.into(),
            amount,
            input_decimals: 9,
            output_decimals: 6,
            slippage_bps: None,
            volatility_bps: 0,
            pool_tvl_usd: None,
        }
    }

    pub fn with_decimals(mut self, input_decimals: u8, output_decimals: u8) -> Self {
        self.input_decimals = input_decimals;
        self.output_decimals = output_decimals;
        self
    }

    pub fn with_slippage(mut self, slippage_bps: u32) -> Self {
        self.slippage_bps = Some(slippage_bps);
        self
    }

    pub fn with_market(mut self, volatility_bps: u32, pool_tvl_usd: Option<u64>) -> Self {
        self.volatility_bps = volatility_bps;
        self.pool_tvl_usd = pool_tvl_usd;
        self
    }

    fn quote_request(&self) -> QuoteRequest {
        let slippage = self.slippage_bps.unwrap_or(50).min(u16::MAX as u32) as u16;
        QuoteRequest::new(self.input_mint.clone(), self.output_mint.clone(), self.amount)
            .with_decimals(self.input_decimals, self.output_decimals)
            .with_slippage(slippage)
    }
}

/// Per-venue line of the quote breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueBreakdown {
    pub venue: Venue,
    pub out_amount: u64,
    pub price_impact_pct: f64,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedQuote {
    pub plan: SwapPlan,
    pub breakdown: Vec<VenueBreakdown>,
    pub split: Option<SplitOutcome>,
    /// Output of the primary plan in output base units
    pub expected_out: u64,
    pub min_out: u64,
    pub slippage_bps: u32,
    pub trade_size_usd: Option<f64>,
    /// Set when the internal pool fills the trade
    pub internal: Option<SwapOpportunity>,
    pub from_cache: bool,
}

impl RoutedQuote {
    pub fn is_internal(&self) -> bool {
        self.internal.is_some()
    }
}

pub struct QuoteRouter {
    aggregator: Arc<MultiSourceAggregator>,
    oracle: Arc<PriceOracle>,
    pool: Arc<InternalLiquidityPool>,
    split: SplitRouteCalculator,
    slippage: DynamicSlippageCalculator,
    plan_ttl: chrono::Duration,
}

impl std::fmt::Debug for QuoteRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteRouter")
            .field("aggregator", &self.aggregator)
            .field("plan_ttl", &self.plan_ttl)
            .finish()
    }
}

impl QuoteRouter {
    pub fn new(
        aggregator: Arc<MultiSourceAggregator>,
        oracle: Arc<PriceOracle>,
        pool: Arc<InternalLiquidityPool>,
        split: SplitRouteCalculator,
        slippage: DynamicSlippageCalculator,
    ) -> Self {
        Self {
            aggregator,
            oracle,
            pool,
            split,
            slippage,
            plan_ttl: chrono::Duration::milliseconds(DEFAULT_PLAN_TTL_MS),
        }
    }

    pub fn with_plan_ttl(mut self, plan_ttl: chrono::Duration) -> Self {
        self.plan_ttl = plan_ttl;
        self
    }

    pub fn aggregator(&self) -> &Arc<MultiSourceAggregator> {
        &self.aggregator
    }

    pub fn pool(&self) -> &Arc<InternalLiquidityPool> {
        &self.pool
    }

    pub fn slippage(&self) -> &DynamicSlippageCalculator {
        &self.slippage
    }

    /// Route a swap request into a plan with per-venue breakdown
    pub async fn quote(&self, request: &SwapRequest) -> Result<RoutedQuote, RoutingError> {
        check_decimals(request.input_decimals)?;
        check_decimals(request.output_decimals)?;
        let quote_request = request.quote_request();
        let best = self.aggregator.get_best_quote(&quote_request).await?;

        if best.best.quote.in_amount < request.amount {
            return Err(RoutingError::NoRouteFound {
                requested: request.amount,
                fillable: best.best.quote.in_amount,
            });
        }

        let trade_size_usd = match self
            .oracle
            .usd_value(&request.input_mint, request.amount, request.input_decimals)
            .await
        {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Trade size unknown, routing single venue: {}", e);
                None
            }
        };

        let split = self.try_split(&best, request.amount, trade_size_usd)?;
        let now = Utc::now();

        let single_plan = |venue: Venue, expected_output: u64| {
            SwapPlan::single(
                RouteSplit {
                    venue,
                    weight_bps: FULL_WEIGHT_BPS,
                    input_amount: request.amount,
                    expected_output,
                },
                now,
                self.plan_ttl,
            )
        };

        let mut fallbacks: Vec<SwapPlan> = Vec::new();
        let (mut plan, mut expected_out) = match &split {
            Some(outcome) => {
                fallbacks.push(single_plan(best.best.venue, best.best.quote.out_amount));
                (SwapPlan::new(outcome.splits.clone(), now, self.plan_ttl), outcome.total_output)
            }
            None => (single_plan(best.best.venue, best.best.quote.out_amount), best.best.quote.out_amount),
        };
        fallbacks.extend(
            best.alternatives
                .iter()
                .filter(|alt| alt.quote.in_amount >= request.amount)
                .map(|alt| single_plan(alt.venue, alt.quote.out_amount)),
        );

        let internal = self.internal_opportunity(request, expected_out).await;
        if let Some(opportunity) = &internal {
            let internal_out = to_base_units(opportunity.output_amount, request.output_decimals)?;
            tracing::info!(
                "Internal pool beats venues by {} {}",
                opportunity.savings,
                request.output_mint
            );
            fallbacks.insert(0, plan);
            plan = single_plan(Venue::Internal, internal_out);
            expected_out = internal_out;
        }
        let plan = plan.with_fallbacks(fallbacks);

        let slippage_bps = request.slippage_bps.unwrap_or_else(|| {
            self.slippage.calculate(
                trade_size_usd.unwrap_or(0.0) as u64,
                request.pool_tvl_usd.unwrap_or(0),
                request.volatility_bps,
            )
        });
        let min_out = apply_slippage(expected_out, slippage_bps);

        let breakdown = best
            .all()
            .map(|q| VenueBreakdown {
                venue: q.venue,
                out_amount: q.quote.out_amount,
                price_impact_pct: q.quote.price_impact_pct,
                latency_ms: q.latency_ms,
            })
            .collect();

        tracing::info!(
            "Routed {} {} -> {}: {} venue(s), expected {}, min {} ({} bps)",
            request.amount,
            request.input_mint,
            request.output_mint,
            plan.venues.len(),
            expected_out,
            min_out,
            slippage_bps
        );

        Ok(RoutedQuote {
            plan,
            breakdown,
            split,
            expected_out,
            min_out,
            slippage_bps,
            trade_size_usd,
            internal,
            from_cache: best.from_cache,
        })
    }

    /// Fill a routed quote from the internal pool. The plan must still be fresh.
    pub fn execute_internal(&self, request: &SwapRequest, routed: &RoutedQuote) -> Result<InternalFill, RoutingError> {
        routed.plan.ensure_fresh(Utc::now())?;
        if !routed.is_internal() {
            return Err(RoutingError::InvalidRequest("plan does not route through the internal pool".into()));
        }
        let amount = to_whole_tokens(request.amount, request.input_decimals)?;
        self.pool
            .execute_internal_swap(&request.input_mint, &request.output_mint, amount)
    }

    fn try_split(
        &self,
        best: &BestQuote,
        amount: u64,
        trade_size_usd: Option<f64>,
    ) -> Result<Option<SplitOutcome>, RoutingError> {
        let large_enough = trade_size_usd
            .map(|usd| self.split.should_use_split_route(usd))
            .unwrap_or(false);
        if !large_enough || best.alternatives.is_empty() {
            return Ok(None);
        }

        let outcome = self
            .split
            .compute_split(
                best.all().map(|q| (q.venue, q.quote.as_ref())),
                amount,
                self.split.options(),
            )?
            .require_full()?;

        if outcome.is_split() && outcome.total_output > best.best.quote.out_amount {
            Ok(Some(outcome))
        } else {
            Ok(None)
        }
    }

    async fn internal_opportunity(&self, request: &SwapRequest, external_out: u64) -> Option<SwapOpportunity> {
        if !InternalLiquidityPool::is_supported(&request.input_mint)
            || !InternalLiquidityPool::is_supported(&request.output_mint)
        {
            return None;
        }

        let prices = self
            .oracle
            .get_prices(&[request.input_mint.as_str(), request.output_mint.as_str()])
            .await;
        for (mint, price) in &prices {
            self.pool.update_price(mint, *price);
        }

        let amount = to_whole_tokens(request.amount, request.input_decimals).ok()?;
        if !self
            .pool
            .can_execute_internally(&request.input_mint, &request.output_mint, amount)
        {
            return None;
        }

        let external = to_whole_tokens(external_out, request.output_decimals).ok()?;
        self.pool
            .calculate_savings(&request.input_mint, &request.output_mint, amount, external)
            .filter(|opportunity| opportunity.savings > Decimal::ZERO)
    }
}

/// Minimum acceptable output for a slippage tolerance
pub fn apply_slippage(expected_out: u64, slippage_bps: u32) -> u64 {
    let keep = 10_000u128.saturating_sub(slippage_bps as u128);
    (expected_out as u128 * keep / 10_000) as u64
}

fn check_decimals(decimals: u8) -> Result<(), RoutingError> {
    if decimals > MAX_TOKEN_DECIMALS {
        return Err(RoutingError::InvalidRequest(format!(
            "token decimals {} exceed {}",
            decimals, MAX_TOKEN_DECIMALS
        )));
    }
    Ok(())
}

pub fn to_whole_tokens(amount: u64, decimals: u8) -> Result<Decimal, RoutingError> {
    check_decimals(decimals)?;
    Decimal::try_from_i128_with_scale(amount as i128, decimals as u32)
        .map_err(|e| RoutingError::InvalidRequest(format!("amount {} not representable: {}", amount, e)))
}

/// Floor of `amount` in base units; errors when negative or above u64
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<u64, RoutingError> {
    check_decimals(decimals)?;
    let overflow = || RoutingError::InvalidRequest(format!("amount {} out of range at {} decimals", amount, decimals));
    let unit = 10u64.checked_pow(decimals as u32).ok_or_else(overflow)?;
    amount
        .checked_mul(Decimal::from(unit))
        .ok_or_else(overflow)?
        .floor()
        .to_u64()
        .ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::quote_cache::QuoteCache;
    use crate::domain::tokens::{SOL_MINT, USDC_MINT};
    use crate::domain::{PoolConfig, SlippageConfig, SplitRouteConfig};
    use crate::ports::mocks::{MockPriceSource, MockQuoteSource};
    use rust_decimal_macros::dec;

    struct Harness {
        router: QuoteRouter,
        pool: Arc<InternalLiquidityPool>,
    }

    fn harness(sources: Vec<MockQuoteSource>, sol_price: f64) -> Harness {
        let mut sources = sources.into_iter();
        let jupiter = sources
            .next()
            .unwrap_or_else(|| MockQuoteSource::with_rate(Venue::Jupiter, 0.18));
        let mut aggregator = MultiSourceAggregator::new(Arc::new(jupiter), Arc::new(QuoteCache::default()));
        for source in sources {
            aggregator = aggregator.with_source(Arc::new(source));
        }

        let oracle = PriceOracle::default()
            .with_source(Arc::new(MockPriceSource::new("mock").with_price(SOL_MINT, sol_price)));
        let pool = Arc::new(InternalLiquidityPool::new(PoolConfig::default()));

        let router = QuoteRouter::new(
            Arc::new(aggregator),
            Arc::new(oracle),
            pool.clone(),
            SplitRouteCalculator::new(SplitRouteConfig::default()),
            DynamicSlippageCalculator::new(SlippageConfig::default()),
        );
        Harness { router, pool }
    }

    #[tokio::test]
    async fn test_small_trade_single_venue() {
        // 0.1 SOL at $180 is below the split threshold
        let h = harness(
            vec![
                MockQuoteSource::with_rate(Venue::Jupiter, 0.180),
                MockQuoteSource::with_rate(Venue::Orca, 0.179),
            ],
            180.0,
        );
        let request = SwapRequest::new(SOL_MINT, USDC_MINT, 100_000_000);
        let routed = h.router.quote(&request).await.unwrap();

        assert!(!routed.plan.is_split());
        assert_eq!(routed.plan.venues[0].venue, Venue::Jupiter);
        assert_eq!(routed.plan.total_weight_bps(), 10_000);
        assert_eq!(routed.breakdown.len(), 2);
        assert_eq!(routed.plan.fallback_plans.len(), 1);
        assert!(routed.plan.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_large_trade_splits_across_venues() {
        let h = harness(
            vec![
                MockQuoteSource::with_rate(Venue::Jupiter, 0.1800).with_price_impact(2.0),
                MockQuoteSource::with_rate(Venue::Raydium, 0.1798).with_price_impact(2.0),
            ],
            180.0,
        );
        // 1000 SOL
        let request = SwapRequest::new(SOL_MINT, USDC_MINT, 1_000_000_000_000);
        let routed = h.router.quote(&request).await.unwrap();

        let outcome = routed.split.as_ref().expect("split chosen");
        assert!(outcome.is_split());
        assert_eq!(routed.plan.total_weight_bps(), 10_000);
        assert!(routed.expected_out > routed.breakdown[0].out_amount);
        // single-venue fallback first
        assert_eq!(routed.plan.fallback_plans[0].venues.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_large_trade_still_splits() {
        let h = harness(
            vec![
                MockQuoteSource::with_rate(Venue::Jupiter, 0.1800).with_price_impact(2.0),
                MockQuoteSource::with_rate(Venue::Raydium, 0.1798).with_price_impact(2.0),
            ],
            180.0,
        );
        let request = SwapRequest::new(SOL_MINT, USDC_MINT, 1_000_000_000_000);
        let first = h.router.quote(&request).await.unwrap();
        let second = h.router.quote(&request).await.unwrap();

        assert!(second.from_cache);
        assert!(second.plan.is_split());
        assert_eq!(second.breakdown.len(), 2);
        assert_eq!(second.expected_out, first.expected_out);
        assert_eq!(second.plan.fallback_plans.len(), first.plan.fallback_plans.len());
    }

    #[tokio::test]
    async fn test_amounts_sharing_a_tier_are_not_mixed_up() {
        let h = harness(vec![MockQuoteSource::with_rate(Venue::Jupiter, 0.18)], 180.0);

        let small = h
            .router
            .quote(&SwapRequest::new(SOL_MINT, USDC_MINT, 940_000_000))
            .await
            .unwrap();
        assert_eq!(small.expected_out, 169_200_000);

        // same tier as 0.94 SOL, but more input than the cached round covers
        let one = h
            .router
            .quote(&SwapRequest::new(SOL_MINT, USDC_MINT, 1_000_000_000))
            .await
            .unwrap();
        assert!(!one.from_cache);
        assert_eq!(one.expected_out, 180_000_000);

        // a smaller amount is answered from the 1 SOL round, scaled down
        let request = SwapRequest::new(SOL_MINT, USDC_MINT, 980_000_000).with_slippage(0);
        let scaled = h.router.quote(&request).await.unwrap();
        assert!(scaled.from_cache);
        assert_eq!(scaled.expected_out, 176_400_000);
        assert_eq!(scaled.min_out, 176_400_000);
        assert_eq!(scaled.plan.venues[0].input_amount, 980_000_000);
    }

    #[tokio::test]
    async fn test_excessive_decimals_rejected() {
        let h = harness(vec![MockQuoteSource::with_out_amount(Venue::Jupiter, 180_000_000)], 180.0);
        let request = SwapRequest::new(SOL_MINT, USDC_MINT, 1_000_000_000).with_decimals(20, 6);
        let err = h.router.quote(&request).await.unwrap_err();
        assert!(matches!(err, RoutingError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_explicit_slippage_overrides_dynamic() {
        let h = harness(vec![MockQuoteSource::with_out_amount(Venue::Jupiter, 180_000_000)], 180.0);
        let request = SwapRequest::new(SOL_MINT, USDC_MINT, 1_000_000_000).with_slippage(100);
        let routed = h.router.quote(&request).await.unwrap();

        assert_eq!(routed.slippage_bps, 100);
        assert_eq!(routed.min_out, 178_200_000);
    }

    #[tokio::test]
    async fn test_dynamic_slippage_unknown_tvl() {
        let h = harness(vec![MockQuoteSource::with_out_amount(Venue::Jupiter, 180_000_000)], 180.0);
        let request = SwapRequest::new(SOL_MINT, USDC_MINT, 1_000_000_000);
        let routed = h.router.quote(&request).await.unwrap();
        assert_eq!(routed.slippage_bps, 150);
    }

    #[tokio::test]
    async fn test_internal_pool_preferred_when_better() {
        let h = harness(vec![MockQuoteSource::with_out_amount(Venue::Jupiter, 170_000_000)], 180.0);
        h.pool
            .deposit_liquidity("lp", USDC_MINT, dec!(100000), 0)
            .unwrap();

        let request = SwapRequest::new(SOL_MINT, USDC_MINT, 1_000_000_000);
        let routed = h.router.quote(&request).await.unwrap();

        assert!(routed.is_internal());
        assert_eq!(routed.plan.venues[0].venue, Venue::Internal);
        assert!(routed.expected_out > 170_000_000);
        assert_eq!(routed.plan.fallback_plans[0].venues[0].venue, Venue::Jupiter);

        let fill = h.router.execute_internal(&request, &routed).unwrap();
        assert_eq!(fill.input_amount, dec!(1));
    }

    #[tokio::test]
    async fn test_internal_pool_skipped_without_liquidity() {
        let h = harness(vec![MockQuoteSource::with_out_amount(Venue::Jupiter, 170_000_000)], 180.0);
        let request = SwapRequest::new(SOL_MINT, USDC_MINT, 1_000_000_000);
        let routed = h.router.quote(&request).await.unwrap();
        assert!(!routed.is_internal());
        assert!(h.router.execute_internal(&request, &routed).is_err());
    }

    #[tokio::test]
    async fn test_all_sources_down_propagates() {
        let h = harness(vec![MockQuoteSource::failing(Venue::Jupiter)], 180.0);
        let err = h
            .router
            .quote(&SwapRequest::new(SOL_MINT, USDC_MINT, 1_000_000_000))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_apply_slippage() {
        assert_eq!(apply_slippage(1_000_000, 50), 995_000);
        assert_eq!(apply_slippage(1_000_000, 20_000), 0);
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(to_whole_tokens(1_500_000_000, 9).unwrap(), dec!(1.5));
        assert_eq!(to_base_units(dec!(180.1234567), 6).unwrap(), 180_123_456);
    }

    #[test]
    fn test_unit_conversion_out_of_range() {
        assert!(to_base_units(Decimal::MAX, 9).is_err());
        assert!(to_base_units(dec!(-1), 6).is_err());
        assert!(to_base_units(dec!(1), 20).is_err());
        assert!(to_whole_tokens(1, 19).is_err());
        assert_eq!(to_whole_tokens(u64::MAX, 18).unwrap(), dec!(18.446744073709551615));
    }
}
