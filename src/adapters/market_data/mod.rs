//! Market Data Adapters
//!
//! USD price feeds chained by the price oracle, in default priority order:
//! Jupiter, Birdeye (API key), DexScreener.

mod birdeye;
mod dexscreener;
mod jupiter_price;

pub use birdeye::{BirdeyePriceClient, BIRDEYE_PRICE_API};
pub use dexscreener::{DexScreenerClient, DEXSCREENER_TOKENS_API};
pub use jupiter_price::{JupiterPriceClient, JUPITER_PRICE_API};
