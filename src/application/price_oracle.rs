//! Price Oracle
//!
//! USD prices from an ordered chain of sources. The first usable non-zero
//! value wins and is cached per mint. When every source fails, a cached
//! price still inside the stale grace window is served instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use tokio::time::Instant;

use crate::domain::{tokens, RoutingError};
use crate::ports::{PriceError, PriceSource};

/// Default freshness of a cached price
pub const DEFAULT_PRICE_TTL: Duration = Duration::from_secs(5);

/// Cached prices are served as stale up to this multiple of the TTL
pub const DEFAULT_STALE_GRACE_FACTOR: u32 = 4;

/// Default deadline for one source attempt
pub const DEFAULT_PRICE_SOURCE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleConfig {
    pub cache_ttl: Duration,
    pub stale_grace_factor: u32,
    pub source_timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_PRICE_TTL,
            stale_grace_factor: DEFAULT_STALE_GRACE_FACTOR,
            source_timeout: DEFAULT_PRICE_SOURCE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub mint: String,
    pub price_usd: f64,
    /// Source that produced the value
    pub source: String,
    /// Served from cache past its TTL because every source failed
    pub stale: bool,
}

#[derive(Debug, Clone)]
struct CachedPrice {
    price_usd: f64,
    source: String,
    fetched_at: Instant,
}

pub struct PriceOracle {
    sources: Vec<Arc<dyn PriceSource>>,
    cache: DashMap<String, CachedPrice>,
    config: OracleConfig,
}

impl std::fmt::Debug for PriceOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceOracle")
            .field("sources", &self.sources.iter().map(|s| s.name().to_string()).collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for PriceOracle {
    fn default() -> Self {
        Self::new(OracleConfig::default())
    }
}

impl PriceOracle {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            sources: Vec::new(),
            cache: DashMap::new(),
            config,
        }
    }

    /// Builder method to append a source; sources are tried in insertion order
    pub fn with_source(mut self, source: Arc<dyn PriceSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// USD price of one whole token
    pub async fn get_price(&self, mint: &str) -> Result<PricePoint, RoutingError> {
        if tokens::is_stablecoin(mint) {
            return Ok(PricePoint {
                mint: mint.to_string(),
                price_usd: 1.0,
                source: "stablecoin".into(),
                stale: false,
            });
        }

        if let Some(cached) = self.cached(mint, self.config.cache_ttl) {
            return Ok(self.point(mint, cached, false));
        }

        let mut last_error = String::from("no price sources configured");
        for source in &self.sources {
            match self.try_source(source.as_ref(), mint).await {
                Ok(price_usd) => {
                    self.cache.insert(
                        mint.to_string(),
                        CachedPrice {
                            price_usd,
                            source: source.name().to_string(),
                            fetched_at: Instant::now(),
                        },
                    );
                    return Ok(PricePoint {
                        mint: mint.to_string(),
                        price_usd,
                        source: source.name().to_string(),
                        stale: false,
                    });
                }
                Err(e) => {
                    tracing::warn!("Price source {} failed for {}: {}", source.name(), mint, e);
                    last_error = e.to_string();
                }
            }
        }

        let grace = self.config.cache_ttl * self.config.stale_grace_factor;
        if let Some(cached) = self.cached(mint, grace) {
            tracing::warn!("Serving stale price for {} from {}", mint, cached.source);
            return Ok(self.point(mint, cached, true));
        }

        Err(RoutingError::source_unavailable("price-oracle", format!("{}: {}", mint, last_error)))
    }

    /// Price as a bare number
    pub async fn get_usd_price(&self, mint: &str) -> Result<f64, RoutingError> {
        self.get_price(mint).await.map(|p| p.price_usd)
    }

    /// Prices for many mints concurrently; mints with no price are omitted
    pub async fn get_prices(&self, mints: &[&str]) -> HashMap<String, f64> {
        let results = join_all(mints.iter().map(|mint| self.get_price(mint))).await;
        results
            .into_iter()
            .filter_map(|result| result.ok())
            .map(|point| (point.mint, point.price_usd))
            .collect()
    }

    /// USD value of `amount` base units
    pub async fn usd_value(&self, mint: &str, amount: u64, decimals: u8) -> Result<f64, RoutingError> {
        let price = self.get_usd_price(mint).await?;
        Ok(amount as f64 / 10f64.powi(decimals as i32) * price)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    async fn try_source(&self, source: &dyn PriceSource, mint: &str) -> Result<f64, PriceError> {
        let deadline = self.config.source_timeout;
        let price = tokio::time::timeout(deadline, source.fetch_usd_price(mint))
            .await
            .map_err(|_| PriceError::Timeout(deadline.as_millis() as u64))??;
        if price.is_finite() && price > 0.0 {
            Ok(price)
        } else {
            Err(PriceError::NoPriceData(mint.to_string()))
        }
    }

    fn cached(&self, mint: &str, max_age: Duration) -> Option<CachedPrice> {
        self.cache
            .get(mint)
            .filter(|entry| entry.fetched_at.elapsed() < max_age)
            .map(|entry| entry.clone())
    }

    fn point(&self, mint: &str, cached: CachedPrice, stale: bool) -> PricePoint {
        PricePoint {
            mint: mint.to_string(),
            price_usd: cached.price_usd,
            source: cached.source,
            stale,
        }
    }
}
