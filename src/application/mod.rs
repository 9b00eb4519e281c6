//! Application Layer - Routing services
//!
//! Stateful components built on the domain types and ports:
//! - `quote_cache`: short-TTL venue quote store with predictive refresh
//! - `health_monitor`: concurrent probes and aggregate status
//! - `aggregator`: parallel venue fan-out with runtime enable/disable
//! - `price_oracle`: USD prices with a source fallback chain
//! - `router`: swap request to plan
//! - `engine`: wiring from configuration

pub mod aggregator;
pub mod engine;
pub mod health_monitor;
pub mod price_oracle;
pub mod quote_cache;
pub mod router;

pub use aggregator::{BestQuote, MultiSourceAggregator, SourceQuote, SourceStat};
pub use engine::{EngineError, SwapEngine};
pub use health_monitor::{
    AggregateHealth, HealthConfig, HealthListener, HealthMonitor, HealthStatus, ListenerId,
    ServiceHealth, ServiceOptions,
};
pub use price_oracle::{OracleConfig, PriceOracle, PricePoint};
pub use quote_cache::{CacheStats, CachedRound, HotPair, QuoteCache};
pub use router::{QuoteRouter, RoutedQuote, SwapRequest, VenueBreakdown};
