//! Dynamic Slippage
//!
//! Sizes slippage protection from trade size relative to pool depth and
//! recent volatility. Integer basis-point arithmetic only, so every process
//! computes the same tolerance for the same inputs.

use serde::{Deserialize, Serialize};

/// Default floor for slippage tolerance (1%)
pub const DEFAULT_BASE_SLIPPAGE_BPS: u32 = 100;

/// Default ceiling for slippage tolerance (5%)
pub const DEFAULT_MAX_SLIPPAGE_BPS: u32 = 500;

/// Trade/TVL ratio above which the size component kicks in (0.5%)
pub const DEFAULT_SIZE_THRESHOLD_BPS: u32 = 50;

/// Volatility multiplier in percent (150 = 1.5x)
pub const DEFAULT_VOLATILITY_MULTIPLIER_PCT: u32 = 150;

/// Divisor applied after the volatility multiplier
pub const DEFAULT_VOLATILITY_DIVISOR: u32 = 10;

/// Added when pool depth is unknown
pub const DEFAULT_UNKNOWN_TVL_MARGIN_BPS: u32 = 50;

/// Slippage calculator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlippageConfig {
    /// Disable to always return the base tolerance
    pub enabled: bool,
    pub base_slippage_bps: u32,
    pub max_slippage_bps: u32,
    pub size_threshold_bps: u32,
    pub volatility_multiplier_pct: u32,
    pub volatility_divisor: u32,
    pub unknown_tvl_margin_bps: u32,
}

impl Default for SlippageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_slippage_bps: DEFAULT_BASE_SLIPPAGE_BPS,
            max_slippage_bps: DEFAULT_MAX_SLIPPAGE_BPS,
            size_threshold_bps: DEFAULT_SIZE_THRESHOLD_BPS,
            volatility_multiplier_pct: DEFAULT_VOLATILITY_MULTIPLIER_PCT,
            volatility_divisor: DEFAULT_VOLATILITY_DIVISOR,
            unknown_tvl_margin_bps: DEFAULT_UNKNOWN_TVL_MARGIN_BPS,
        }
    }
}

/// Components that made up a slippage figure, for logging and display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageBreakdown {
    /// Final clamped tolerance
    pub slippage_bps: u32,
    pub base_component: u32,
    pub size_component: u32,
    pub volatility_component: u32,
    pub tvl_component: u32,
}

#[derive(Debug, Clone, Default)]
pub struct DynamicSlippageCalculator {
    config: SlippageConfig,
}

impl DynamicSlippageCalculator {
    pub fn new(config: SlippageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SlippageConfig {
        &self.config
    }

    /// Slippage tolerance in bps for a trade of `trade_size_usd` against a pool
    /// of `pool_tvl_usd` (0 when unknown) with recent volatility `volatility_bps`.
    pub fn calculate(&self, trade_size_usd: u64, pool_tvl_usd: u64, volatility_bps: u32) -> u32 {
        self.breakdown(trade_size_usd, pool_tvl_usd, volatility_bps).slippage_bps
    }

    pub fn breakdown(
        &self,
        trade_size_usd: u64,
        pool_tvl_usd: u64,
        volatility_bps: u32,
    ) -> SlippageBreakdown {
        let c = &self.config;
        let base = c.base_slippage_bps;

        if !c.enabled {
            return SlippageBreakdown {
                slippage_bps: base,
                base_component: base,
                size_component: 0,
                volatility_component: 0,
                tvl_component: 0,
            };
        }

        let (size_component, tvl_component) = if pool_tvl_usd == 0 {
            (0, c.unknown_tvl_margin_bps)
        } else {
            let ratio_bps = (trade_size_usd as u128 * 10_000) / pool_tvl_usd as u128;
            let ratio_bps = u32::try_from(ratio_bps).unwrap_or(u32::MAX);
            (ratio_bps.saturating_sub(c.size_threshold_bps), 0)
        };

        let divisor = (c.volatility_divisor as u64).max(1) * 100;
        let volatility_component =
            (volatility_bps as u64 * c.volatility_multiplier_pct as u64 / divisor) as u32;

        let raw = base
            .saturating_add(size_component)
            .saturating_add(volatility_component)
            .saturating_add(tvl_component);

        SlippageBreakdown {
            slippage_bps: raw.clamp(base, c.max_slippage_bps.max(base)),
            base_component: base,
            size_component,
            volatility_component,
            tvl_component,
        }
    }
}
