//! Multi-Source Quote Aggregator
//!
//! Fans a quote request out to every enabled venue concurrently. Each branch
//! runs under its own deadline; failed or slow sources are dropped from the
//! round and never retried synchronously.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::time::Instant;

use crate::application::health_monitor::HealthMonitor;
use crate::application::quote_cache::{CachedRound, QuoteCache};
use crate::domain::{Quote, QuoteRequest, RoutingError, Venue};
use crate::ports::QuoteSource;

/// Default deadline for one venue call
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_millis(8_000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStat {
    pub name: String,
    pub venue: Venue,
    pub enabled: bool,
    pub priority: u8,
}

/// One venue's answer for a round
#[derive(Debug, Clone)]
pub struct SourceQuote {
    pub venue: Venue,
    pub quote: Arc<Quote>,
    pub latency_ms: u64,
    pub priority: u8,
}

/// Best quote of a round with the runners-up
#[derive(Debug, Clone)]
pub struct BestQuote {
    pub best: SourceQuote,
    /// Other successful venues, best first
    pub alternatives: Vec<SourceQuote>,
    pub total_latency_ms: u64,
    pub from_cache: bool,
}

impl BestQuote {
    /// Best and alternatives, best first
    pub fn all(&self) -> impl Iterator<Item = &SourceQuote> {
        std::iter::once(&self.best).chain(self.alternatives.iter())
    }
}

pub struct MultiSourceAggregator {
    sources: Vec<Arc<dyn QuoteSource>>,
    enabled: DashMap<Venue, bool>,
    health: Option<Arc<HealthMonitor>>,
    cache: Arc<QuoteCache>,
    source_timeout: Duration,
}

impl std::fmt::Debug for MultiSourceAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiSourceAggregator")
            .field("sources", &self.sources.iter().map(|s| s.venue()).collect::<Vec<_>>())
            .field("source_timeout", &self.source_timeout)
            .finish()
    }
}

impl MultiSourceAggregator {
    /// Jupiter is the primary source and is always registered
    pub fn new(jupiter: Arc<dyn QuoteSource>, cache: Arc<QuoteCache>) -> Self {
        let aggregator = Self {
            sources: Vec::new(),
            enabled: DashMap::new(),
            health: None,
            cache,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
        };
        aggregator.with_source(jupiter)
    }

    /// Builder method to add a venue. A second source for the same venue replaces the first.
    pub fn with_source(mut self, source: Arc<dyn QuoteSource>) -> Self {
        let venue = source.venue();
        self.sources.retain(|s| s.venue() != venue);
        self.sources.push(source);
        self.sources.sort_by_key(|s| s.priority());
        self.enabled.entry(venue).or_insert(true);
        self
    }

    /// Builder method to skip sources the health monitor reports as down
    pub fn with_health(mut self, health: Arc<HealthMonitor>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_timeout(mut self, source_timeout: Duration) -> Self {
        self.source_timeout = source_timeout;
        self
    }

    pub fn cache(&self) -> &Arc<QuoteCache> {
        &self.cache
    }

    pub fn source_stats(&self) -> Vec<SourceStat> {
        self.sources
            .iter()
            .map(|s| SourceStat {
                name: s.venue().name().to_string(),
                venue: s.venue(),
                enabled: self.is_enabled(s.venue()),
                priority: s.priority(),
            })
            .collect()
    }

    /// Takes effect from the next fan-out; in-flight calls are not cancelled.
    /// Returns false for a venue with no registered source.
    pub fn set_source_enabled(&self, venue: Venue, enabled: bool) -> bool {
        match self.enabled.get_mut(&venue) {
            Some(mut flag) => {
                *flag = enabled;
                tracing::info!("Source {} {}", venue, if enabled { "enabled" } else { "disabled" });
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, venue: Venue) -> bool {
        self.enabled.get(&venue).map(|flag| *flag).unwrap_or(false)
    }

    fn active_sources(&self) -> Vec<Arc<dyn QuoteSource>> {
        let health = self.health.as_ref().and_then(|h| h.last_health());
        self.sources
            .iter()
            .filter(|s| self.is_enabled(s.venue()))
            .filter(|s| match &health {
                Some(snapshot) if snapshot.is_down(s.venue().name()) => {
                    tracing::debug!("Skipping {}: health down", s.venue());
                    false
                }
                _ => true,
            })
            .cloned()
            .collect()
    }

    fn validate(request: &QuoteRequest) -> Result<(), RoutingError> {
        if request.amount == 0 {
            return Err(RoutingError::InvalidRequest("amount must be > 0".into()));
        }
        if request.input_mint == request.output_mint {
            return Err(RoutingError::InvalidRequest("input and output mint are the same".into()));
        }
        Ok(())
    }

    async fn fetch_one(
        source: Arc<dyn QuoteSource>,
        request: &QuoteRequest,
        deadline: Duration,
    ) -> Result<SourceQuote, RoutingError> {
        let venue = source.venue();
        let started = Instant::now();
        match tokio::time::timeout(deadline, source.fetch_quote(request)).await {
            Ok(Ok(quote)) if !quote.is_empty() => Ok(SourceQuote {
                venue,
                quote: Arc::new(quote),
                latency_ms: started.elapsed().as_millis() as u64,
                priority: source.priority(),
            }),
            Ok(Ok(_)) => Err(RoutingError::source_unavailable(venue.name(), "empty quote")),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RoutingError::source_unavailable(
                venue.name(),
                format!("timed out after {}ms", deadline.as_millis()),
            )),
        }
    }

    /// Quotes from every responding source, best output first
    pub async fn get_quotes(&self, request: &QuoteRequest) -> Vec<SourceQuote> {
        let sources = self.active_sources();
        let deadline = self.source_timeout;
        let results = join_all(
            sources
                .into_iter()
                .map(|source| Self::fetch_one(source, request, deadline)),
        )
        .await;

        let mut quotes: Vec<SourceQuote> = results
            .into_iter()
            .filter_map(|result| match result {
                Ok(quote) => Some(quote),
                Err(e) => {
                    tracing::warn!("Dropping source for this round: {}", e);
                    None
                }
            })
            .collect();

        quotes.sort_by(|a, b| {
            b.quote
                .out_amount
                .cmp(&a.quote.out_amount)
                .then(a.priority.cmp(&b.priority))
        });
        quotes
    }

    /// Cached round if fresh and large enough, otherwise the best of a full
    /// fan-out (then cached with its alternatives)
    pub async fn get_best_quote(&self, request: &QuoteRequest) -> Result<BestQuote, RoutingError> {
        Self::validate(request)?;

        let cached = self
            .cache
            .get_covering(&request.input_mint, &request.output_mint, request.amount)
            .and_then(|round| round.scaled_to(request.amount));
        if let Some(mut quotes) = cached.filter(|quotes| !quotes.is_empty()) {
            let best = quotes.remove(0);
            return Ok(BestQuote {
                best,
                alternatives: quotes,
                total_latency_ms: 0,
                from_cache: true,
            });
        }

        let started = Instant::now();
        let mut quotes = self.fan_out(request).await?;
        let best = quotes.remove(0);
        tracing::info!(
            "Best quote {} -> {}: {} via {} ({} alternatives)",
            request.input_mint,
            request.output_mint,
            best.quote.out_amount,
            best.venue,
            quotes.len()
        );

        Ok(BestQuote {
            best,
            alternatives: quotes,
            total_latency_ms: started.elapsed().as_millis() as u64,
            from_cache: false,
        })
    }

    /// Re-quote `request` without reading the cache and store the round
    pub async fn refresh(&self, request: &QuoteRequest) -> Result<(), RoutingError> {
        Self::validate(request)?;
        self.fan_out(request).await.map(|_| ())
    }

    /// Full fan-out, cached only when the best venue fills the whole amount
    async fn fan_out(&self, request: &QuoteRequest) -> Result<Vec<SourceQuote>, RoutingError> {
        let attempted = self.active_sources().len();
        let quotes = self.get_quotes(request).await;
        let Some(best) = quotes.first() else {
            return Err(RoutingError::AllSourcesUnavailable { attempted });
        };

        if best.quote.in_amount >= request.amount {
            self.cache.set_round(
                &request.input_mint,
                &request.output_mint,
                request.tier(),
                CachedRound {
                    requested: request.amount,
                    quotes: quotes.clone(),
                },
            );
        }
        Ok(quotes)
    }

    /// First valid answer wins; the other branches are dropped
    pub async fn get_fastest_quote(&self, request: &QuoteRequest) -> Result<SourceQuote, RoutingError> {
        Self::validate(request)?;
        let sources = self.active_sources();
        let attempted = sources.len();
        let deadline = self.source_timeout;

        let mut pending: FuturesUnordered<_> = sources
            .into_iter()
            .map(|source| Self::fetch_one(source, request, deadline))
            .collect();

        while let Some(result) = pending.next().await {
            match result {
                Ok(quote) => return Ok(quote),
                Err(e) => tracing::warn!("Dropping source for this round: {}", e),
            }
        }
        Err(RoutingError::AllSourcesUnavailable { attempted })
    }
}
