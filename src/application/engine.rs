//! Swap Engine
//!
//! Builds one instance of every routing component from a `Config` and wires
//! them together. Nothing here is global: each engine owns its cache, health
//! monitor, pool and block-engine clients.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::aggregator::MultiSourceAggregator;
use super::health_monitor::{AggregateHealth, HealthConfig, HealthMonitor, ServiceOptions};
use super::price_oracle::{OracleConfig, PriceOracle};
use super::quote_cache::QuoteCache;
use super::router::{QuoteRouter, RoutedQuote, SwapRequest};
use crate::adapters::jito::{BundleBuilder, BundleStatus, JitoError};
use crate::adapters::jupiter::{JupiterClient, JupiterConfig};
use crate::adapters::market_data::{
    BirdeyePriceClient, DexScreenerClient, JupiterPriceClient, BIRDEYE_PRICE_API,
    DEXSCREENER_TOKENS_API, JUPITER_PRICE_API,
};
use crate::adapters::probes::{HttpProbe, JsonRpcProbe};
use crate::adapters::venues::{OrcaClient, RaydiumClient};
use crate::config::{Config, ConfigError};
use crate::domain::tokens::{SOL_MINT, USDC_MINT};
use crate::domain::{
    DynamicSlippageCalculator, InternalLiquidityPool, QuoteRequest, RoutingError,
    SplitRouteCalculator, VenueConfig,
};
use crate::ports::{PriceError, PriceSource, ProbeResult, QuoteSource};

/// Probe trade used to check a venue end to end (0.01 SOL -> USDC)
const PROBE_AMOUNT_LAMPORTS: u64 = 10_000_000;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build venue client: {0}")]
    Venue(#[from] RoutingError),

    #[error("Failed to build price client: {0}")]
    Price(#[from] PriceError),

    #[error("Failed to build block engine client: {0}")]
    BlockEngine(#[from] JitoError),

    #[error("Failed to build health probe: {0}")]
    Probe(#[from] reqwest::Error),
}

pub struct SwapEngine {
    cache: Arc<QuoteCache>,
    health: Arc<HealthMonitor>,
    aggregator: Arc<MultiSourceAggregator>,
    oracle: Arc<PriceOracle>,
    pool: Arc<InternalLiquidityPool>,
    router: QuoteRouter,
    /// Empty builder cloned for every execution
    bundles: BundleBuilder,
    default_volatility_bps: u32,
}

impl std::fmt::Debug for SwapEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapEngine")
            .field("router", &self.router)
            .field("bundles", &self.bundles)
            .finish()
    }
}

impl SwapEngine {
    /// Assemble an engine from already built components
    pub fn new(
        health: Arc<HealthMonitor>,
        aggregator: Arc<MultiSourceAggregator>,
        oracle: Arc<PriceOracle>,
        pool: Arc<InternalLiquidityPool>,
        router: QuoteRouter,
        bundles: BundleBuilder,
    ) -> Self {
        Self {
            cache: Arc::clone(aggregator.cache()),
            health,
            aggregator,
            oracle,
            pool,
            router,
            bundles,
            default_volatility_bps: 0,
        }
    }

    /// Build every component with its HTTP adapters
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        config.validate()?;

        let cache = Arc::new(
            QuoteCache::with_config(Duration::from_millis(config.cache.ttl_ms), config.cache.max_entries)
                .with_prediction(
                    config.cache.prediction_threshold,
                    Duration::from_millis(config.cache.refresh_interval_ms),
                ),
        );
        let health = Arc::new(HealthMonitor::new(HealthConfig::from(&config.health)));
        let source_timeout = Duration::from_millis(config.aggregator.source_timeout_ms);

        // Jupiter is always a source
        let jupiter: Arc<dyn QuoteSource> = Arc::new(JupiterClient::with_config(JupiterConfig {
            timeout: source_timeout,
            ..JupiterConfig::from(&config.jupiter())
        })?);
        register_venue_probe(&health, Arc::clone(&jupiter), ServiceOptions::critical());

        let mut aggregator = MultiSourceAggregator::new(Arc::clone(&jupiter), Arc::clone(&cache))
            .with_timeout(source_timeout);
        let mut disabled = Vec::new();
        for venue in &config.venues {
            let source: Arc<dyn QuoteSource> = match venue {
                VenueConfig::Jupiter(_) => jupiter.clone(),
                VenueConfig::Raydium(c) => Arc::new(RaydiumClient::new(c, source_timeout)?),
                VenueConfig::Orca(c) => Arc::new(OrcaClient::new(c, source_timeout)?),
            };
            if !matches!(venue, VenueConfig::Jupiter(_)) {
                register_venue_probe(&health, Arc::clone(&source), ServiceOptions::optional());
                aggregator = aggregator.with_source(source);
            }
            if !venue.enabled() {
                disabled.push(venue.venue());
            }
        }
        let aggregator = Arc::new(aggregator.with_health(Arc::clone(&health)));
        for venue in disabled {
            aggregator.set_source_enabled(venue, false);
        }

        let oracle = Arc::new(build_oracle(config)?);
        match price_probe(config, health.config().probe_timeout)? {
            Some(probe) => health.register_service("price-oracle", Arc::new(probe), ServiceOptions::optional()),
            None => warn!("No usable price source; price oracle not monitored"),
        }

        let rpc_probe = JsonRpcProbe::new(config.health.rpc_url.clone(), health.config().probe_timeout)?;
        let rpc_options = if config.health.rpc_critical {
            ServiceOptions::critical()
        } else {
            ServiceOptions::optional()
        };
        health.register_service("solana-rpc", Arc::new(rpc_probe), rpc_options);

        let pool = Arc::new(InternalLiquidityPool::new(config.pool.clone()));
        let router = QuoteRouter::new(
            Arc::clone(&aggregator),
            Arc::clone(&oracle),
            Arc::clone(&pool),
            SplitRouteCalculator::new(config.split_route.clone()),
            DynamicSlippageCalculator::new(config.slippage.clone()),
        )
        .with_plan_ttl(chrono::Duration::milliseconds(config.router.plan_ttl_ms as i64));

        let bundles = BundleBuilder::from_config(config.jito.clone())?;

        info!(
            "Engine ready: sources {:?}, price sources {:?}, {} block engines",
            aggregator.source_stats().iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            oracle.source_names(),
            bundles.endpoint_urls().len()
        );

        let mut engine = Self::new(health, aggregator, oracle, pool, router, bundles);
        engine.default_volatility_bps = config.router.default_volatility_bps;
        Ok(engine)
    }

    pub fn cache(&self) -> &Arc<QuoteCache> {
        &self.cache
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    pub fn aggregator(&self) -> &Arc<MultiSourceAggregator> {
        &self.aggregator
    }

    pub fn oracle(&self) -> &Arc<PriceOracle> {
        &self.oracle
    }

    pub fn pool(&self) -> &Arc<InternalLiquidityPool> {
        &self.pool
    }

    pub fn router(&self) -> &QuoteRouter {
        &self.router
    }

    /// Route a swap; the configured volatility applies when the request has none
    pub async fn quote(&self, request: &SwapRequest) -> Result<RoutedQuote, RoutingError> {
        if request.volatility_bps == 0 && self.default_volatility_bps > 0 {
            let request = request
                .clone()
                .with_market(self.default_volatility_bps, request.pool_tvl_usd);
            return self.router.quote(&request).await;
        }
        self.router.quote(request).await
    }

    pub async fn check_health(&self) -> AggregateHealth {
        self.health.check_all().await
    }

    /// Periodic health checks until the handle is aborted
    pub fn start_health_monitor(&self) -> JoinHandle<()> {
        Arc::clone(&self.health).spawn_periodic()
    }

    /// Re-quote warm and hot pairs ahead of demand until the handle is aborted
    pub fn start_predictive_refresh(&self) -> JoinHandle<()> {
        let aggregator = Arc::clone(&self.aggregator);
        Arc::clone(&self.cache).spawn_predictive_refresh(move |request| {
            let aggregator = Arc::clone(&aggregator);
            async move {
                if let Err(e) = aggregator.refresh(&request).await {
                    debug!("Predictive refresh of {} -> {} failed: {}", request.input_mint, request.output_mint, e);
                }
            }
        })
    }

    /// Fresh, empty bundle sharing this engine's block-engine clients
    pub fn new_bundle(&self) -> BundleBuilder {
        let mut bundle = self.bundles.clone();
        bundle.clear();
        bundle
    }

    pub async fn bundle_status(&self, bundle_id: &str) -> Result<BundleStatus, JitoError> {
        self.bundles.get_bundle_status(bundle_id).await
    }
}

/// A venue is healthy when it can quote a small SOL -> USDC trade
fn register_venue_probe(health: &HealthMonitor, source: Arc<dyn QuoteSource>, options: ServiceOptions) {
    let name = source.venue().name();
    let probe = move || {
        let source = Arc::clone(&source);
        async move {
            let started = Instant::now();
            let request = QuoteRequest::new(SOL_MINT, USDC_MINT, PROBE_AMOUNT_LAMPORTS);
            match source.fetch_quote(&request).await {
                Ok(_) => ProbeResult::ok(started.elapsed().as_millis() as u64),
                Err(e) => ProbeResult::failed(e.to_string()),
            }
        }
    };
    health.register_service(name, Arc::new(probe), options);
}

/// SOL price lookup against the first usable configured price source
fn price_probe(config: &Config, timeout: Duration) -> Result<Option<HttpProbe>, EngineError> {
    for name in &config.oracle.sources {
        let probe = match name.as_str() {
            "jupiter" => HttpProbe::new(format!("{}?ids={}", JUPITER_PRICE_API, SOL_MINT), timeout)?,
            "birdeye" => match &config.oracle.birdeye_api_key {
                Some(key) => HttpProbe::new(format!("{}?address={}", BIRDEYE_PRICE_API, SOL_MINT), timeout)?
                    .with_header("X-API-KEY", key)
                    .with_header("x-chain", "solana"),
                None => continue,
            },
            "dexscreener" => HttpProbe::new(format!("{}/{}", DEXSCREENER_TOKENS_API, SOL_MINT), timeout)?,
            _ => continue,
        };
        return Ok(Some(probe));
    }
    Ok(None)
}

fn build_oracle(config: &Config) -> Result<PriceOracle, EngineError> {
    let oracle_config = OracleConfig::from(&config.oracle);
    let timeout = oracle_config.source_timeout;
    let mut oracle = PriceOracle::new(oracle_config);

    for name in &config.oracle.sources {
        let source: Arc<dyn PriceSource> = match name.as_str() {
            "jupiter" => Arc::new(JupiterPriceClient::new(timeout)?),
            "birdeye" => match &config.oracle.birdeye_api_key {
                Some(key) => Arc::new(BirdeyePriceClient::new(key.clone(), timeout)?),
                None => {
                    info!("Birdeye price source skipped: no API key");
                    continue;
                }
            },
            "dexscreener" => Arc::new(DexScreenerClient::new(timeout)?),
            other => {
                warn!("Unknown price source '{}' ignored", other);
                continue;
            }
        };
        oracle = oracle.with_source(source);
    }
    Ok(oracle)
}
