//! Quote Types
//!
//! Venue-neutral quote representation. A `Quote` is immutable once produced
//! and shared behind an `Arc` between the cache, the aggregator and plans.

use serde::{Deserialize, Serialize};

use super::venue::Venue;

/// Sub-buckets per power of two used by `AmountTier`
const TIER_SUB_BITS: u32 = 3;

/// A request for a quote on a single pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Input token mint
    pub input_mint: String,
    /// Output token mint
    pub output_mint: String,
    /// Amount in input base units
    pub amount: u64,
    /// Input token decimals (needed by price-based venues)
    pub input_decimals: u8,
    /// Output token decimals
    pub output_decimals: u8,
    /// Slippage tolerance passed through to venues
    pub slippage_bps: u16,
}

impl QuoteRequest {
    pub fn new(input_mint: impl Into<String>, output_mint: impl Into<String>, amount: u64) -> Self {
        Self {
            input_mint: input_mint.into(),
            output_mint: output_mint.into(),
            amount,
            input_decimals: 9,
            output_decimals: 6,
            slippage_bps: 50,
        }
    }

    pub fn with_decimals(mut self, input_decimals: u8, output_decimals: u8) -> Self {
        self.input_decimals = input_decimals;
        self.output_decimals = output_decimals;
        self
    }

    pub fn with_slippage(mut self, slippage_bps: u16) -> Self {
        self.slippage_bps = slippage_bps;
        self
    }

    /// Amount expressed in whole input tokens
    pub fn amount_ui(&self) -> f64 {
        self.amount as f64 / 10f64.powi(self.input_decimals as i32)
    }

    pub fn tier(&self) -> AmountTier {
        AmountTier::from_amount(self.amount)
    }
}

/// One hop of a quoted route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub venue: Venue,
    /// Venue-specific label (AMM name for Jupiter hops)
    pub label: String,
    pub in_amount: u64,
    pub out_amount: u64,
}

/// A venue's answer to a `QuoteRequest`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: u64,
    pub out_amount: u64,
    /// Minimum output after the venue's slippage setting
    pub other_amount_threshold: u64,
    /// Price impact as a percentage (0.1 = 0.1%)
    pub price_impact_pct: f64,
    pub route_plan: Vec<RouteLeg>,
    pub context_slot: Option<u64>,
    pub time_taken_ms: u64,
}

impl Quote {
    /// Output per unit of input in base units
    pub fn rate(&self) -> f64 {
        if self.in_amount == 0 {
            return 0.0;
        }
        self.out_amount as f64 / self.in_amount as f64
    }

    /// Venue of the first leg, if any
    pub fn primary_venue(&self) -> Option<Venue> {
        self.route_plan.first().map(|leg| leg.venue)
    }

    /// A quote that cannot be executed
    pub fn is_empty(&self) -> bool {
        self.in_amount == 0 || self.out_amount == 0
    }

    /// The same route re-priced pro rata for `amount` out of the `requested`
    /// input it was quoted for. Callers only scale down (`amount <= requested`).
    pub fn scaled_to(&self, requested: u64, amount: u64) -> Quote {
        if requested == 0 || amount == requested {
            return self.clone();
        }
        let scale = |value: u64| (value as u128 * amount as u128 / requested as u128) as u64;
        Quote {
            in_amount: scale(self.in_amount),
            out_amount: scale(self.out_amount),
            other_amount_threshold: scale(self.other_amount_threshold),
            route_plan: self
                .route_plan
                .iter()
                .map(|leg| RouteLeg {
                    in_amount: scale(leg.in_amount),
                    out_amount: scale(leg.out_amount),
                    ..leg.clone()
                })
                .collect(),
            ..self.clone()
        }
    }
}

/// Log-scale amount bucket so near-identical trade sizes share a cache key.
///
/// Amounts below 16 keep their own tier; above that each power of two is
/// split into 8 buckets (6-12% wide).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AmountTier(pub u32);

impl AmountTier {
    pub fn from_amount(amount: u64) -> Self {
        let small = 1u64 << (TIER_SUB_BITS + 1);
        if amount < small {
            return AmountTier(amount as u32);
        }
        let bits = 64 - amount.leading_zeros();
        let shift = bits - (TIER_SUB_BITS + 1);
        let top = (amount >> shift) as u32;
        AmountTier((shift << TIER_SUB_BITS) + top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quote(out_amount: u64) -> Quote {
        Quote {
            input_mint: "SOL".into(),
            output_mint: "USDC".into(),
            in_amount: 1_000_000_000,
            out_amount,
            other_amount_threshold: out_amount,
            price_impact_pct: 0.1,
            route_plan: vec![RouteLeg {
                venue: Venue::Jupiter,
                label: "Whirlpool".into(),
                in_amount: 1_000_000_000,
                out_amount,
            }],
            context_slot: Some(1),
            time_taken_ms: 12,
        }
    }

    #[test]
    fn test_tier_coalesces_close_amounts() {
        assert_eq!(
            AmountTier::from_amount(1_000_000_000),
            AmountTier::from_amount(1_002_000_000)
        );
        assert_ne!(
            AmountTier::from_amount(1_000_000_000),
            AmountTier::from_amount(2_000_000_000)
        );
    }

    #[test]
    fn test_tier_monotonic() {
        let mut last = AmountTier::from_amount(0);
        for amount in (0..5_000u64).chain([1 << 20, 1 << 40, u64::MAX]) {
            let tier = AmountTier::from_amount(amount);
            assert!(tier >= last, "tier decreased at {}", amount);
            last = tier;
        }
    }

    #[test]
    fn test_tier_small_amounts_distinct() {
        assert_eq!(AmountTier::from_amount(0), AmountTier(0));
        assert_eq!(AmountTier::from_amount(15), AmountTier(15));
        assert_eq!(AmountTier::from_amount(16), AmountTier(16));
        assert_eq!(AmountTier::from_amount(17), AmountTier(16));
    }

    #[test]
    fn test_scaled_to_smaller_amount() {
        let quote = sample_quote(180_000_000);
        let scaled = quote.scaled_to(1_000_000_000, 980_000_000);
        assert_eq!(scaled.in_amount, 980_000_000);
        assert_eq!(scaled.out_amount, 176_400_000);
        assert_eq!(scaled.other_amount_threshold, 176_400_000);
        assert_eq!(scaled.route_plan[0].out_amount, 176_400_000);
        assert_eq!(scaled.route_plan[0].label, "Whirlpool");

        assert_eq!(quote.scaled_to(1_000_000_000, 1_000_000_000), quote);
    }

    #[test]
    fn test_quote_rate() {
        let quote = sample_quote(180_000_000);
        assert!((quote.rate() - 0.18).abs() < 1e-12);
        assert_eq!(quote.primary_venue(), Some(Venue::Jupiter));
        assert!(!quote.is_empty());
    }
}
