//! Jupiter Adapter
//!
//! Primary quote source: the Jupiter aggregator's quote endpoint.

mod client;
mod quote;

pub use client::{JupiterClient, JupiterConfig};
pub use quote::{JupiterQuoteParams, JupiterQuoteResponse, RoutePlanStep, SwapInfo};
