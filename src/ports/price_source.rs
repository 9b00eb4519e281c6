//! Price Source Port
//!
//! USD price feeds chained by the price oracle.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("No price data for mint: {0}")]
    NoPriceData(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Price source timed out after {0}ms")]
    Timeout(u64),
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Source name for logs
    fn name(&self) -> &str;

    /// USD price of one whole token
    async fn fetch_usd_price(&self, mint: &str) -> Result<f64, PriceError>;
}
