//! Quote Cache
//!
//! Short-TTL store of venue quotes keyed by pair and amount tier. Each entry
//! holds a whole fan-out round (every venue's answer, best first) together
//! with the input amount it was quoted for.
//!
//! Expiry is lazy: an entry older than its TTL is a miss on read and is
//! dropped then. There is no background sweeper; `purge_expired` exists for
//! callers that want to bound memory between reads.
//!
//! Two concurrent misses for the same key both go upstream. The second
//! write simply overwrites the first.
//!
//! Misses on amount-aware lookups are counted per pair. Pairs that keep
//! missing become hot and are re-quoted by `spawn_predictive_refresh`
//! alongside a fixed set of warm pairs.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::application::aggregator::SourceQuote;
use crate::domain::tokens::{self, JUP_MINT, SOL_MINT, USDC_MINT, USDT_MINT};
use crate::domain::{AmountTier, Quote, QuoteRequest, Venue};

/// Default quote lifetime
pub const DEFAULT_TTL: Duration = Duration::from_millis(2_000);

/// Default entry bound before the oldest entry is evicted
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Misses after which a pair counts as hot
pub const DEFAULT_PREDICTION_THRESHOLD: u64 = 3;

/// Default period of the predictive refresh
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(1_500);

/// Most traded pairs, always kept warm by the predictive refresh
pub const WARM_PAIRS: &[(&str, &str)] = &[
    (SOL_MINT, USDC_MINT),
    (USDC_MINT, SOL_MINT),
    (SOL_MINT, USDT_MINT),
    (SOL_MINT, JUP_MINT),
];

/// Typical trade sizes for warm pairs, in tenths of a whole input token
const WARM_AMOUNTS_TENTHS: &[u64] = &[1, 10, 100, 1_000];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub input_mint: String,
    pub output_mint: String,
    pub tier: AmountTier,
}

impl CacheKey {
    pub fn new(input_mint: &str, output_mint: &str, tier: AmountTier) -> Self {
        Self {
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            tier,
        }
    }
}

/// Every venue's answer from one fan-out, best first
#[derive(Debug, Clone)]
pub struct CachedRound {
    /// Input amount the round was quoted for
    pub requested: u64,
    pub quotes: Vec<SourceQuote>,
}

impl CachedRound {
    /// Round holding a single quote, sized by its own input
    pub fn single(quote: Arc<Quote>) -> Self {
        let venue = quote.primary_venue().unwrap_or(Venue::Jupiter);
        Self {
            requested: quote.in_amount,
            quotes: vec![SourceQuote {
                venue,
                quote,
                latency_ms: 0,
                priority: venue.default_priority(),
            }],
        }
    }

    pub fn best(&self) -> Option<&SourceQuote> {
        self.quotes.first()
    }

    /// Quotes re-priced for `amount`; None when `amount` is larger than the
    /// round was quoted for.
    pub fn scaled_to(&self, amount: u64) -> Option<Vec<SourceQuote>> {
        if amount > self.requested {
            return None;
        }
        let quotes = self
            .quotes
            .iter()
            .map(|q| SourceQuote {
                venue: q.venue,
                quote: if amount == self.requested {
                    Arc::clone(&q.quote)
                } else {
                    Arc::new(q.quote.scaled_to(self.requested, amount))
                },
                latency_ms: 0,
                priority: q.priority,
            })
            .collect();
        Some(quotes)
    }
}

/// Cached round with timestamp. Replaced, never mutated.
#[derive(Debug, Clone)]
struct CacheEntry {
    round: Arc<CachedRound>,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_valid(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }

    fn time_remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.created_at.elapsed())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PairDemand {
    misses: u64,
    last_amount: u64,
}

/// A pair that keeps missing the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotPair {
    pub input_mint: String,
    pub output_mint: String,
    pub misses: u64,
    /// Most recent amount asked for, refreshed by the predictive loop
    pub last_amount: u64,
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    /// hits / (hits + misses), 0 before any lookup
    pub hit_rate: f64,
    /// Most missed first
    pub hot_pairs: Vec<HotPair>,
}

#[derive(Debug)]
pub struct QuoteCache {
    entries: DashMap<CacheKey, CacheEntry>,
    demand: DashMap<(String, String), PairDemand>,
    ttl: Duration,
    max_entries: usize,
    prediction_threshold: u64,
    refresh_interval: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl QuoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_config(ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_config(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            demand: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
            prediction_threshold: DEFAULT_PREDICTION_THRESHOLD,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Builder method for hot-pair detection and the refresh period
    pub fn with_prediction(mut self, threshold: u64, refresh_interval: Duration) -> Self {
        self.prediction_threshold = threshold.max(1);
        self.refresh_interval = refresh_interval;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fresh_round(&self, key: &CacheKey) -> Option<Arc<CachedRound>> {
        let fresh = self
            .entries
            .get(key)
            .filter(|entry| entry.is_valid())
            .map(|entry| Arc::clone(&entry.round));
        if fresh.is_none() {
            // Only drop the entry if it is still the expired one
            self.entries.remove_if(key, |_, entry| !entry.is_valid());
        }
        fresh
    }

    fn record_hit(&self, key: &CacheKey) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Quote cache hit {}->{} tier {}", key.input_mint, key.output_mint, key.tier.0);
    }

    fn record_miss(&self, key: &CacheKey) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Quote cache miss {}->{} tier {}", key.input_mint, key.output_mint, key.tier.0);
    }

    /// Best quote for the key if fresh, or None (counted as a miss)
    pub fn get(&self, input_mint: &str, output_mint: &str, tier: AmountTier) -> Option<Arc<Quote>> {
        let key = CacheKey::new(input_mint, output_mint, tier);
        match self.fresh_round(&key).and_then(|round| round.best().map(|q| Arc::clone(&q.quote))) {
            Some(quote) => {
                self.record_hit(&key);
                Some(quote)
            }
            None => {
                self.record_miss(&key);
                None
            }
        }
    }

    /// Fresh round in `amount`'s tier that was quoted for at least `amount`.
    ///
    /// A smaller round is a miss: scaling a quote up would overstate output.
    /// Misses feed the hot-pair statistics.
    pub fn get_covering(&self, input_mint: &str, output_mint: &str, amount: u64) -> Option<Arc<CachedRound>> {
        let key = CacheKey::new(input_mint, output_mint, AmountTier::from_amount(amount));
        match self.fresh_round(&key).filter(|round| round.requested >= amount) {
            Some(round) => {
                self.record_hit(&key);
                Some(round)
            }
            None => {
                self.record_miss(&key);
                let mut demand = self
                    .demand
                    .entry((input_mint.to_string(), output_mint.to_string()))
                    .or_default();
                demand.misses += 1;
                demand.last_amount = amount;
                None
            }
        }
    }

    /// Store a single quote, replacing any previous entry and restarting its TTL
    pub fn set(&self, input_mint: &str, output_mint: &str, tier: AmountTier, quote: Arc<Quote>) {
        self.set_round(input_mint, output_mint, tier, CachedRound::single(quote));
    }

    /// Store a whole fan-out round, replacing any previous entry
    pub fn set_round(&self, input_mint: &str, output_mint: &str, tier: AmountTier, round: CachedRound) {
        let key = CacheKey::new(input_mint, output_mint, tier);
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                round: Arc::new(round),
                created_at: Instant::now(),
                ttl: self.ttl,
            },
        );
    }

    /// Remaining lifetime of an entry, if present and fresh
    pub fn time_remaining(&self, input_mint: &str, output_mint: &str, tier: AmountTier) -> Option<Duration> {
        let key = CacheKey::new(input_mint, output_mint, tier);
        self.entries
            .get(&key)
            .filter(|entry| entry.is_valid())
            .map(|entry| entry.time_remaining())
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().created_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_valid());
        before.saturating_sub(self.entries.len())
    }

    /// Drop every entry and the pair statistics
    pub fn clear(&self) {
        self.entries.clear();
        self.demand.clear();
    }

    /// Pairs at or above the prediction threshold, most missed first
    pub fn hot_pairs(&self) -> Vec<HotPair> {
        let mut hot: Vec<HotPair> = self
            .demand
            .iter()
            .filter(|entry| entry.value().misses >= self.prediction_threshold)
            .map(|entry| HotPair {
                input_mint: entry.key().0.clone(),
                output_mint: entry.key().1.clone(),
                misses: entry.value().misses,
                last_amount: entry.value().last_amount,
            })
            .collect();
        hot.sort_by(|a, b| b.misses.cmp(&a.misses).then_with(|| a.input_mint.cmp(&b.input_mint)));
        hot
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            size: self.entries.len(),
            hits,
            misses,
            hit_rate: if lookups == 0 { 0.0 } else { hits as f64 / lookups as f64 },
            hot_pairs: self.hot_pairs(),
        }
    }

    /// Requests re-quoted on every refresh tick: warm pairs at typical sizes,
    /// then hot pairs at their last requested amount.
    pub fn refresh_targets(&self) -> Vec<QuoteRequest> {
        let mut targets: Vec<QuoteRequest> = Vec::new();
        for (input_mint, output_mint) in WARM_PAIRS {
            let (Some(input), Some(output)) = (tokens::by_mint(input_mint), tokens::by_mint(output_mint)) else {
                continue;
            };
            let Some(unit) = 10u64.checked_pow(input.decimals as u32) else {
                continue;
            };
            for tenths in WARM_AMOUNTS_TENTHS {
                targets.push(
                    QuoteRequest::new(*input_mint, *output_mint, tenths * unit / 10)
                        .with_decimals(input.decimals, output.decimals),
                );
            }
        }

        for pair in self.hot_pairs() {
            let duplicate = targets.iter().any(|t| {
                t.input_mint == pair.input_mint && t.output_mint == pair.output_mint && t.amount == pair.last_amount
            });
            if duplicate || pair.last_amount == 0 {
                continue;
            }
            let mut request = QuoteRequest::new(pair.input_mint.clone(), pair.output_mint.clone(), pair.last_amount);
            if let (Some(input), Some(output)) = (tokens::by_mint(&pair.input_mint), tokens::by_mint(&pair.output_mint)) {
                request = request.with_decimals(input.decimals, output.decimals);
            }
            targets.push(request);
        }
        targets
    }

    /// Re-quote `refresh_targets` through `fetcher` on the refresh interval
    /// until the handle is aborted. The fetcher is expected to write its
    /// result back into this cache; its errors are its own to log.
    pub fn spawn_predictive_refresh<F, Fut>(self: Arc<Self>, fetcher: F) -> JoinHandle<()>
    where
        F: Fn(QuoteRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = self.refresh_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let targets = self.refresh_targets();
                tracing::debug!("Predictive refresh of {} quotes", targets.len());
                join_all(targets.into_iter().map(&fetcher)).await;
            }
        })
    }
}
