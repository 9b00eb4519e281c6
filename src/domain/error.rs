//! Routing Errors
//!
//! Error taxonomy shared by the quote, routing and execution paths.
//! Per-source and per-endpoint failures stay isolated; only exhaustion of
//! every alternative reaches the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a caller-facing layer should react to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    /// Offer the user a retry prompt
    Retry,
    /// Stop the flow, nothing can be done with the current inputs
    HardStop,
    /// Fall back without surfacing anything
    SilentFallback,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    /// A single venue or price source failed or timed out
    #[error("Source unavailable: {name} ({reason})")]
    SourceUnavailable { name: String, reason: String },

    /// Every enabled source failed for this round
    #[error("All {attempted} quote sources unavailable")]
    AllSourcesUnavailable { attempted: usize },

    /// No combination of venues fills the requested amount
    #[error("No route found: requested {requested}, fillable {fillable}")]
    NoRouteFound { requested: u64, fillable: u64 },

    /// Cached quote or plan expired, caller must re-quote
    #[error("Stale quote: expired {expired_ms}ms ago")]
    StaleQuote { expired_ms: u64 },

    /// Internal pool cannot cover the trade
    #[error("Insufficient internal liquidity for {mint}: need {required}, available {available}")]
    InsufficientInternalLiquidity {
        mint: String,
        required: String,
        available: String,
    },

    /// Every execution endpoint failed across all retry rounds
    #[error("All endpoints failed after {rounds} rounds: {last_error}")]
    AllEndpointsFailed { rounds: u32, last_error: String },

    /// Bundle confirmation not observed in time (the bundle may still land)
    #[error("Timed out after {waited_ms}ms waiting for bundle {bundle_id}")]
    Timeout { bundle_id: String, waited_ms: u64 },

    /// Request rejected before any work was done
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RoutingError {
    pub fn source_unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        RoutingError::SourceUnavailable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Caller-facing reaction for this error
    pub fn user_action(&self) -> UserAction {
        match self {
            RoutingError::SourceUnavailable { .. }
            | RoutingError::AllSourcesUnavailable { .. }
            | RoutingError::StaleQuote { .. }
            | RoutingError::Timeout { .. } => UserAction::Retry,
            RoutingError::InsufficientInternalLiquidity { .. } => UserAction::SilentFallback,
            RoutingError::NoRouteFound { .. }
            | RoutingError::AllEndpointsFailed { .. }
            | RoutingError::InvalidRequest(_) => UserAction::HardStop,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        self.user_action() == UserAction::Retry
    }
}
