//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Venue quote APIs
//! - USD price feeds
//! - Health probes

pub mod health_check;
pub mod mocks;
pub mod price_source;
pub mod quote_source;

// Re-export main traits and types
pub use health_check::{HealthCheck, ProbeResult};
pub use price_source::{PriceError, PriceSource};
pub use quote_source::QuoteSource;
