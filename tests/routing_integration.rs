//! Routing Integration Tests
//!
//! Verifies the routing components work together:
//! 1. Aggregator -> QuoteCache round trip with TTL expiry
//! 2. HealthMonitor classification and aggregator health gating
//! 3. Runtime source enable/disable
//! 4. QuoteRouter end to end: venue plan, slippage, internal pool fill
//! 5. BundleBuilder submission and confirmation across endpoints
//!
//! All tests are deterministic (no real network calls) and use the port mocks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use swapback_router::adapters::jito::{BundleBuilder, BundleConfig, BundleStatus, BundleTransaction, JitoError};
use swapback_router::adapters::jupiter::JupiterQuoteResponse;
use swapback_router::application::router::apply_slippage;
use swapback_router::application::{
    HealthConfig, HealthMonitor, HealthStatus, MultiSourceAggregator, OracleConfig, PriceOracle,
    QuoteCache, QuoteRouter, ServiceOptions, SwapRequest,
};
use swapback_router::domain::tokens::{SOL_MINT, USDC_MINT};
use swapback_router::domain::{
    AmountTier, DynamicSlippageCalculator, InternalLiquidityPool, PoolConfig, QuoteRequest,
    RoutingError, SlippageConfig, SplitRouteCalculator, SplitRouteConfig, Venue,
};
use swapback_router::ports::mocks::{MockBundleEndpoint, MockPriceSource, MockQuoteSource};
use swapback_router::ports::{ProbeResult, QuoteSource};

// ============================================================================
// Test Fixtures
// ============================================================================

const ONE_SOL: u64 = 1_000_000_000;

/// Jupiter answer for 1 SOL -> 180 USDC
const JUPITER_SOL_USDC: &str = r#"{
    "inputMint": "So11111111111111111111111111111111111111112",
    "outputMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
    "inAmount": "1000000000",
    "outAmount": "180000000",
    "otherAmountThreshold": "179100000",
    "swapMode": "ExactIn",
    "slippageBps": 50,
    "priceImpactPct": "0.001",
    "routePlan": [{
        "swapInfo": {
            "ammKey": "pool123",
            "label": "Whirlpool",
            "inputMint": "So11111111111111111111111111111111111111112",
            "outputMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "inAmount": "1000000000",
            "outAmount": "180000000",
            "feeAmount": "1500",
            "feeMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
        },
        "percent": 100
    }],
    "contextSlot": 301234567,
    "timeTaken": 0.01
}"#;

fn sol_usdc(amount: u64) -> QuoteRequest {
    QuoteRequest::new(SOL_MINT, USDC_MINT, amount)
}

/// Aggregator over the given mocks; the first one is the primary source
fn create_aggregator(
    primary: Arc<MockQuoteSource>,
    others: Vec<Arc<MockQuoteSource>>,
    cache: Arc<QuoteCache>,
) -> MultiSourceAggregator {
    let primary: Arc<dyn QuoteSource> = primary;
    others.into_iter().fold(
        MultiSourceAggregator::new(primary, cache).with_timeout(Duration::from_secs(8)),
        |aggregator, source| aggregator.with_source(source),
    )
}

/// SOL at $180, USDC at $1
fn create_oracle() -> Arc<PriceOracle> {
    let prices = MockPriceSource::new("mock")
        .with_price(SOL_MINT, 180.0)
        .with_price(USDC_MINT, 1.0);
    Arc::new(PriceOracle::new(OracleConfig::default()).with_source(Arc::new(prices)))
}

fn create_router(aggregator: MultiSourceAggregator, pool: Arc<InternalLiquidityPool>) -> QuoteRouter {
    QuoteRouter::new(
        Arc::new(aggregator),
        create_oracle(),
        pool,
        SplitRouteCalculator::new(SplitRouteConfig::default()),
        DynamicSlippageCalculator::new(SlippageConfig::default()),
    )
}

fn fast_bundle_config() -> BundleConfig {
    BundleConfig {
        request_timeout_ms: 1_000,
        poll_interval_ms: 100,
        max_wait_ms: 1_000,
        ..BundleConfig::default()
    }
}

// ============================================================================
// Quote Cache Flow
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_best_quote_cached_until_ttl() {
    let cache = Arc::new(QuoteCache::new(Duration::from_secs(2)));
    let jupiter = Arc::new(MockQuoteSource::with_out_amount(Venue::Jupiter, 180_000_000));
    let aggregator = create_aggregator(Arc::clone(&jupiter), vec![], Arc::clone(&cache));

    let first = aggregator.get_best_quote(&sol_usdc(ONE_SOL)).await.unwrap();
    assert!(!first.from_cache);
    assert_eq!(first.best.quote.out_amount, 180_000_000);

    let cached = cache
        .get(SOL_MINT, USDC_MINT, AmountTier::from_amount(ONE_SOL))
        .expect("best quote should be cached under its tier");
    assert_eq!(cached.out_amount.to_string(), "180000000");

    let second = aggregator.get_best_quote(&sol_usdc(ONE_SOL)).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(jupiter.call_count(), 1);

    tokio::time::advance(Duration::from_millis(2_001)).await;
    assert!(cache.get(SOL_MINT, USDC_MINT, AmountTier::from_amount(ONE_SOL)).is_none());

    let third = aggregator.get_best_quote(&sol_usdc(ONE_SOL)).await.unwrap();
    assert!(!third.from_cache);
    assert_eq!(jupiter.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_parsed_jupiter_quote_round_trips_cache() {
    let cache = QuoteCache::new(Duration::from_secs(2));
    let response: JupiterQuoteResponse = serde_json::from_str(JUPITER_SOL_USDC).unwrap();
    let quote = Arc::new(response.into_quote(10).unwrap());

    cache.set(SOL_MINT, USDC_MINT, AmountTier::from_amount(ONE_SOL), quote);
    tokio::time::advance(Duration::from_millis(1_500)).await;

    let hit = cache.get(SOL_MINT, USDC_MINT, AmountTier::from_amount(ONE_SOL)).unwrap();
    assert_eq!(hit.out_amount, 180_000_000);
    assert_eq!(hit.primary_venue(), Some(Venue::Jupiter));

    tokio::time::advance(Duration::from_millis(600)).await;
    assert!(cache.get(SOL_MINT, USDC_MINT, AmountTier::from_amount(ONE_SOL)).is_none());
}

// ============================================================================
// Health Monitoring
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_health_classification() {
    let monitor = HealthMonitor::new(HealthConfig::default());
    monitor.register_service("fast", Arc::new(|| async { ProbeResult::ok(5) }), ServiceOptions::critical());
    monitor.register_service(
        "slow",
        Arc::new(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            ProbeResult::ok(1)
        }),
        ServiceOptions::optional(),
    );
    monitor.register_service(
        "broken",
        Arc::new(|| async { ProbeResult::failed("connection refused") }),
        ServiceOptions::optional(),
    );

    let health = monitor.check_all().await;
    assert_eq!(health.status_of("fast"), Some(HealthStatus::Healthy));
    assert_eq!(health.status_of("slow"), Some(HealthStatus::Degraded));
    assert_eq!(health.status_of("broken"), Some(HealthStatus::Down));
    // Only optional services are unhealthy
    assert_eq!(health.overall, HealthStatus::Degraded);
    assert_eq!(health.services.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_critical_service_down_takes_system_down() {
    let monitor = HealthMonitor::new(HealthConfig::default());
    monitor.register_service(
        "jupiter",
        Arc::new(|| async { ProbeResult::failed("503") }),
        ServiceOptions::critical(),
    );
    monitor.register_service("orca", Arc::new(|| async { ProbeResult::ok(5) }), ServiceOptions::optional());

    let health = monitor.check_all().await;
    assert_eq!(health.overall, HealthStatus::Down);
    assert!(health.is_down("jupiter"));
}

#[tokio::test(start_paused = true)]
async fn test_hung_probe_bounded_by_timeout() {
    let monitor = HealthMonitor::new(HealthConfig::default());
    monitor.register_service(
        "hung",
        Arc::new(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            ProbeResult::ok(1)
        }),
        ServiceOptions::optional().with_timeout(Duration::from_secs(1)),
    );

    let health = monitor.check_all().await;
    assert_eq!(health.status_of("hung"), Some(HealthStatus::Down));
    assert!(health.services[0].latency_ms < 2_000);
}

#[tokio::test(start_paused = true)]
async fn test_listeners_notified_every_check() {
    let monitor = HealthMonitor::new(HealthConfig::default());
    monitor.register_service("jupiter", Arc::new(|| async { ProbeResult::ok(5) }), ServiceOptions::critical());

    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    monitor.on_health_change(Arc::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    monitor.check_all().await;
    monitor.check_all().await;
    assert_eq!(notified.load(Ordering::SeqCst), 2);
    assert_eq!(monitor.last_health().unwrap().overall, HealthStatus::Healthy);
}

#[tokio::test(start_paused = true)]
async fn test_aggregator_skips_venues_marked_down() {
    let health = Arc::new(HealthMonitor::new(HealthConfig::default()));
    health.register_service("jupiter", Arc::new(|| async { ProbeResult::ok(5) }), ServiceOptions::critical());
    health.register_service(
        "raydium",
        Arc::new(|| async { ProbeResult::failed("timeout") }),
        ServiceOptions::optional(),
    );
    health.check_all().await;

    let jupiter = Arc::new(MockQuoteSource::with_rate(Venue::Jupiter, 0.18));
    let raydium = Arc::new(MockQuoteSource::with_rate(Venue::Raydium, 0.19));
    let aggregator = create_aggregator(
        Arc::clone(&jupiter),
        vec![Arc::clone(&raydium)],
        Arc::new(QuoteCache::new(Duration::from_secs(2))),
    )
    .with_health(health);

    let quotes = aggregator.get_quotes(&sol_usdc(ONE_SOL)).await;
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].venue, Venue::Jupiter);
    assert_eq!(raydium.call_count(), 0);
}

// ============================================================================
// Source Management
// ============================================================================

#[tokio::test]
async fn test_disabled_source_excluded_from_fan_out() {
    let jupiter = Arc::new(MockQuoteSource::with_rate(Venue::Jupiter, 0.18));
    let raydium = Arc::new(MockQuoteSource::with_rate(Venue::Raydium, 0.19));
    let orca = Arc::new(MockQuoteSource::with_rate(Venue::Orca, 0.17));
    let aggregator = create_aggregator(
        Arc::clone(&jupiter),
        vec![Arc::clone(&raydium), Arc::clone(&orca)],
        Arc::new(QuoteCache::new(Duration::from_secs(2))),
    );

    let names: Vec<String> = aggregator.source_stats().into_iter().map(|s| s.name).collect();
    assert!(names.contains(&"jupiter".to_string()));
    assert_eq!(names.len(), 3);

    let quotes = aggregator.get_quotes(&sol_usdc(ONE_SOL)).await;
    assert_eq!(quotes[0].venue, Venue::Raydium);

    assert!(aggregator.set_source_enabled(Venue::Raydium, false));
    let quotes = aggregator.get_quotes(&sol_usdc(ONE_SOL)).await;
    assert!(quotes.iter().all(|q| q.venue != Venue::Raydium));
    assert_eq!(quotes[0].venue, Venue::Jupiter);
    assert_eq!(raydium.call_count(), 1);

    // Unknown venues are reported, not registered
    assert!(!aggregator.set_source_enabled(Venue::Internal, false));
}

#[tokio::test]
async fn test_all_sources_failing() {
    let aggregator = create_aggregator(
        Arc::new(MockQuoteSource::failing(Venue::Jupiter)),
        vec![Arc::new(MockQuoteSource::failing(Venue::Orca))],
        Arc::new(QuoteCache::new(Duration::from_secs(2))),
    );

    let result = aggregator.get_best_quote(&sol_usdc(ONE_SOL)).await;
    assert!(matches!(result, Err(RoutingError::AllSourcesUnavailable { .. })));
}

// ============================================================================
// Internal Liquidity Pool
// ============================================================================

#[test]
fn test_pool_deposit_and_stats() {
    let pool = InternalLiquidityPool::new(PoolConfig::default());

    assert!(pool.deposit_liquidity("lp1", "NotARealMint111", dec!(1000), 0).is_none());
    assert!(pool.get_pool_stats().is_empty());

    pool.deposit_liquidity("lp1", USDC_MINT, dec!(1000), 0).unwrap();
    let stats = pool.get_pool_stats();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].symbol, "USDC");
    assert_eq!(stats[0].total_liquidity, dec!(1000));
    assert_eq!(stats[0].providers, 1);
}

#[test]
fn test_pool_savings_and_rewards() {
    let pool = InternalLiquidityPool::new(PoolConfig::default());
    pool.deposit_liquidity("lp1", USDC_MINT, dec!(20000), 90).unwrap();
    pool.update_price(SOL_MINT, 180.0);
    pool.update_price(USDC_MINT, 1.0);

    let opportunity = pool
        .calculate_savings(SOL_MINT, USDC_MINT, dec!(1), dec!(179))
        .expect("both assets priced");
    assert!(opportunity.savings > Decimal::ZERO);
    assert!(opportunity.rebate_amount <= opportunity.savings);

    let later = chrono::Utc::now() + chrono::Duration::days(90);
    let rewards = pool.calculate_rewards_at("lp1", later);
    assert_eq!(rewards.len(), 1);
    assert!(rewards[0].rewards >= Decimal::ZERO);
    assert!(rewards[0].apr_pct > pool.effective_apr_pct(0));
}

// ============================================================================
// Slippage and Split Threshold
// ============================================================================

#[test]
fn test_slippage_reference_values() {
    let calculator = DynamicSlippageCalculator::new(SlippageConfig::default());

    // Small trade in a deep, calm pool sits on the floor
    assert_eq!(calculator.calculate(1_000, 10_000_000, 0), 100);
    // Oversized trade is clamped
    assert_eq!(calculator.calculate(1_000_000, 10_000_000, 0), 500);
    // 100 bps of volatility adds 15 bps
    assert_eq!(calculator.calculate(1_000, 10_000_000, 100), 115);
    // Unknown depth adds a safety margin
    assert_eq!(calculator.calculate(1_000, 0, 0), 150);
}

#[test]
fn test_split_threshold() {
    let calculator = SplitRouteCalculator::new(SplitRouteConfig::default());
    assert!(!calculator.should_use_split_route(99.99));
    assert!(calculator.should_use_split_route(100.0));
    assert!(calculator.should_use_split_route(250_000.0));
}

// ============================================================================
// Router End to End
// ============================================================================

#[tokio::test]
async fn test_router_routes_small_trade_to_best_venue() {
    let jupiter = Arc::new(MockQuoteSource::with_rate(Venue::Jupiter, 0.18));
    let orca = Arc::new(MockQuoteSource::with_rate(Venue::Orca, 0.17));
    let aggregator = create_aggregator(
        jupiter,
        vec![orca],
        Arc::new(QuoteCache::new(Duration::from_secs(2))),
    );
    let router = create_router(aggregator, Arc::new(InternalLiquidityPool::default()));

    // 0.1 SOL is $18, below the split threshold
    let request = SwapRequest::new(SOL_MINT, USDC_MINT, ONE_SOL / 10);
    let routed = router.quote(&request).await.unwrap();

    assert!(routed.split.is_none());
    assert!(!routed.is_internal());
    assert_eq!(routed.plan.venues.len(), 1);
    assert_eq!(routed.plan.venues[0].venue, Venue::Jupiter);
    assert_eq!(routed.expected_out, 18_000_000);
    assert_eq!(routed.breakdown.len(), 2);
    assert!((routed.trade_size_usd.unwrap() - 18.0).abs() < 1e-9);

    // Unknown pool depth gets the margin on top of the floor
    assert_eq!(routed.slippage_bps, 150);
    assert_eq!(routed.min_out, apply_slippage(routed.expected_out, routed.slippage_bps));
    assert_eq!(routed.plan.fallback_plans.len(), 1);
}

#[tokio::test]
async fn test_router_fixed_slippage_overrides_dynamic() {
    let aggregator = create_aggregator(
        Arc::new(MockQuoteSource::with_rate(Venue::Jupiter, 0.18)),
        vec![],
        Arc::new(QuoteCache::new(Duration::from_secs(2))),
    );
    let router = create_router(aggregator, Arc::new(InternalLiquidityPool::default()));

    let request = SwapRequest::new(SOL_MINT, USDC_MINT, ONE_SOL).with_slippage(30);
    let routed = router.quote(&request).await.unwrap();
    assert_eq!(routed.slippage_bps, 30);
    assert_eq!(routed.min_out, apply_slippage(180_000_000, 30));
}

#[tokio::test]
async fn test_router_prefers_internal_pool_when_cheaper() {
    let pool = Arc::new(InternalLiquidityPool::default());
    pool.deposit_liquidity("lp1", USDC_MINT, dec!(20000), 0).unwrap();

    // Venues only offer 150 USDC per SOL while the pool prices at 180
    let aggregator = create_aggregator(
        Arc::new(MockQuoteSource::with_rate(Venue::Jupiter, 0.15)),
        vec![],
        Arc::new(QuoteCache::new(Duration::from_secs(2))),
    );
    let router = create_router(aggregator, Arc::clone(&pool));

    let request = SwapRequest::new(SOL_MINT, USDC_MINT, ONE_SOL / 10);
    let routed = router.quote(&request).await.unwrap();

    assert!(routed.is_internal());
    assert_eq!(routed.plan.venues[0].venue, Venue::Internal);
    assert!(routed.expected_out > 15_000_000);
    assert_eq!(routed.plan.fallback_plans[0].venues[0].venue, Venue::Jupiter);

    let fill = router.execute_internal(&request, &routed).unwrap();
    assert!(fill.output_amount > dec!(15));
    let stats = pool.get_pool_stats();
    assert!(stats[0].available < dec!(20000));
}

#[tokio::test]
async fn test_router_rejects_invalid_request() {
    let aggregator = create_aggregator(
        Arc::new(MockQuoteSource::with_rate(Venue::Jupiter, 0.18)),
        vec![],
        Arc::new(QuoteCache::new(Duration::from_secs(2))),
    );
    let router = create_router(aggregator, Arc::new(InternalLiquidityPool::default()));

    let zero = SwapRequest::new(SOL_MINT, USDC_MINT, 0);
    assert!(matches!(router.quote(&zero).await, Err(RoutingError::InvalidRequest(_))));

    let same = SwapRequest::new(SOL_MINT, SOL_MINT, ONE_SOL);
    assert!(matches!(router.quote(&same).await, Err(RoutingError::InvalidRequest(_))));
}

// ============================================================================
// Bundle Execution
// ============================================================================

#[test]
fn test_bundle_rejects_sixth_transaction() {
    let mut bundle = BundleBuilder::new(fast_bundle_config(), vec![]);
    for i in 0..5 {
        bundle
            .add_transaction(BundleTransaction::new(format!("tx{}", i), "AAAA", i))
            .unwrap();
    }
    assert!(bundle.is_full());

    let result = bundle.add_transaction(BundleTransaction::new("tx5", "AAAA", 0));
    assert!(matches!(result, Err(JitoError::BundleFull { max: 5 })));
    assert_eq!(bundle.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_bundle_all_endpoints_fail() {
    let first = Arc::new(MockBundleEndpoint::failing("https://a.example"));
    let second = Arc::new(MockBundleEndpoint::failing("https://b.example"));
    let bundle = BundleBuilder::new(
        fast_bundle_config(),
        vec![first.clone(), second.clone()],
    );

    let signed = vec!["tx1".to_string(), "tx2".to_string()];
    let result = bundle.submit_bundle(&signed).await;

    assert!(!result.success);
    assert!(result.bundle_id.is_none());
    assert_eq!(result.transaction_count, 2);
    assert!(result.error.is_some());
    // Every endpoint tried once per round
    assert_eq!(first.submission_count(), 3);
    assert_eq!(second.submission_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_bundle_fails_over_and_lands() {
    let down = Arc::new(MockBundleEndpoint::failing("https://a.example"));
    let up = Arc::new(
        MockBundleEndpoint::accepting("https://b.example", "bundle-1")
            .with_statuses(vec![BundleStatus::Pending, BundleStatus::Landed]),
    );
    let mut bundle = BundleBuilder::new(fast_bundle_config(), vec![down.clone(), up.clone()]);
    bundle.add_transaction(BundleTransaction::new("swap", "AAAA", 0)).unwrap();
    bundle.add_transaction(BundleTransaction::new("tip", "BBBB", 1)).unwrap();

    let result = bundle.submit().await;
    assert!(result.success);
    assert_eq!(result.bundle_id.as_deref(), Some("bundle-1"));
    assert_eq!(result.endpoint.as_deref(), Some("https://b.example"));
    assert_eq!(up.get_submissions()[0], vec!["AAAA".to_string(), "BBBB".to_string()]);

    let status = bundle.confirm().await.unwrap();
    assert_eq!(status, BundleStatus::Landed);
    assert!(bundle.state().is_terminal());
}
