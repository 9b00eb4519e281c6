//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Jupiter: primary quote source
//! - Venues: Raydium and Orca quote sources
//! - Market Data: USD price feeds
//! - Jito: atomic bundle submission with endpoint failover
//! - Probes: HTTP and Solana RPC health checks
//! - CLI: Command-line interface

pub mod cli;
pub mod jito;
pub mod jupiter;
pub mod market_data;
pub mod probes;
pub mod venues;

pub use cli::CliApp;
pub use jito::{BundleBuilder, JitoBundleClient};
pub use jupiter::JupiterClient;
pub use market_data::{BirdeyePriceClient, DexScreenerClient, JupiterPriceClient};
pub use probes::{HttpProbe, JsonRpcProbe};
pub use venues::{OrcaClient, RaydiumClient};
