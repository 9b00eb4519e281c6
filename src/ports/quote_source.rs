//! Quote Source Port
//!
//! Interface every venue adapter implements so the aggregator can fan out
//! without knowing which API sits behind it.

use async_trait::async_trait;

use crate::domain::{Quote, QuoteRequest, RoutingError, Venue};

#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Venue this source quotes for
    fn venue(&self) -> Venue;

    /// Fan-out priority, lower wins ties on output
    fn priority(&self) -> u8 {
        self.venue().default_priority()
    }

    /// Fetch one quote. Failures map to `RoutingError::SourceUnavailable`.
    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote, RoutingError>;
}
