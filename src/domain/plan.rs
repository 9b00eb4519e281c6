//! Swap Plans
//!
//! The routing decision handed from quoting to execution.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::RoutingError;
use super::split_route::RouteSplit;
use super::venue::Venue;

/// Ordered venue allocation plus alternatives to try if it cannot execute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapPlan {
    pub venues: Vec<RouteSplit>,
    pub fallback_plans: Vec<SwapPlan>,
    pub expires_at: DateTime<Utc>,
}

impl SwapPlan {
    /// Build a plan valid for `ttl` from `now`.
    ///
    /// A zero or negative ttl is bumped to one millisecond so the plan is
    /// never born expired.
    pub fn new(venues: Vec<RouteSplit>, now: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl = ttl.max(Duration::milliseconds(1));
        Self {
            venues,
            fallback_plans: Vec::new(),
            expires_at: now + ttl,
        }
    }

    /// Whole trade through one venue
    pub fn single(split: RouteSplit, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self::new(vec![split], now, ttl)
    }

    pub fn with_fallbacks(mut self, fallback_plans: Vec<SwapPlan>) -> Self {
        self.fallback_plans = fallback_plans;
        self
    }

    pub fn is_split(&self) -> bool {
        self.venues.len() > 1
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Reject a plan that outlived its quote
    pub fn ensure_fresh(&self, now: DateTime<Utc>) -> Result<(), RoutingError> {
        if self.is_expired(now) {
            let expired_ms = (now - self.expires_at).num_milliseconds().max(0) as u64;
            return Err(RoutingError::StaleQuote { expired_ms });
        }
        Ok(())
    }

    pub fn total_weight_bps(&self) -> u32 {
        self.venues.iter().map(|s| s.weight_bps as u32).sum()
    }

    pub fn uses(&self, venue: Venue) -> bool {
        self.venues.iter().any(|s| s.venue == venue)
    }
}
