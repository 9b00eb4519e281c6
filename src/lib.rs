//! SwapBack Router - quote routing and atomic execution core for a Solana DEX aggregator
//!
//! Fans swap quotes out to several venues, picks or splits the route, sizes
//! slippage from trade size and volatility, checks an internal liquidity pool
//! for a better fill, and submits signed transactions as Jito bundles with
//! endpoint failover.
//!
//! # Modules
//!
//! - `domain`: Core types and algorithms (Quote, SplitRouteCalculator, DynamicSlippageCalculator, InternalLiquidityPool)
//! - `ports`: Trait abstractions (QuoteSource, PriceSource, HealthCheck)
//! - `adapters`: External implementations (Jupiter, Raydium, Orca, price APIs, Jito, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Quote cache, health monitor, aggregator, price oracle, router, engine

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{
    AggregateHealth, HealthMonitor, MultiSourceAggregator, PriceOracle, QuoteCache, QuoteRouter,
    RoutedQuote, SwapEngine, SwapRequest,
};
pub use config::{load_config, Config};
pub use domain::{RoutingError, Venue};
