//! Domain Layer - Core routing logic
//!
//! Pure types and algorithms with no I/O. All network interaction happens
//! through the ports layer.
//!
//! - `quote`: venue-neutral quotes and amount tiers
//! - `venue`: closed venue set and per-venue configuration
//! - `split_route`: multi-venue allocation
//! - `slippage`: integer-bps dynamic slippage
//! - `liquidity_pool`: protocol-owned internal liquidity
//! - `plan`: swap plans handed to execution
//! - `error`: routing error taxonomy

pub mod error;
pub mod liquidity_pool;
pub mod plan;
pub mod quote;
pub mod slippage;
pub mod split_route;
pub mod tokens;
pub mod venue;

pub use error::{RoutingError, UserAction};
pub use liquidity_pool::{
    InternalFill, InternalLiquidityPool, LiquidityPosition, PoolConfig, PoolError, PoolStat,
    PositionReward, SwapOpportunity,
};
pub use plan::SwapPlan;
pub use quote::{AmountTier, Quote, QuoteRequest, RouteLeg};
pub use slippage::{DynamicSlippageCalculator, SlippageBreakdown, SlippageConfig};
pub use split_route::{
    RouteSplit, SplitOptions, SplitOutcome, SplitRouteCalculator, SplitRouteConfig, VenueCurve,
};
pub use venue::{Venue, VenueConfig};
