//! Venues
//!
//! Closed set of liquidity venues the router can quote against, and the
//! per-venue configuration record each variant carries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A liquidity source able to fill a swap leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    /// Jupiter aggregator (itself routes across many AMMs)
    Jupiter,
    /// Raydium AMM
    Raydium,
    /// Orca Whirlpools
    Orca,
    /// Protocol-owned internal liquidity pool
    Internal,
}

impl Venue {
    /// Venues reachable through an external quote adapter
    pub const EXTERNAL: [Venue; 3] = [Venue::Jupiter, Venue::Raydium, Venue::Orca];

    /// Stable lowercase name used in logs, health service names and the CLI
    pub fn name(&self) -> &'static str {
        match self {
            Venue::Jupiter => "jupiter",
            Venue::Raydium => "raydium",
            Venue::Orca => "orca",
            Venue::Internal => "internal",
        }
    }

    /// Default fan-out priority (lower is preferred on ties)
    pub fn default_priority(&self) -> u8 {
        match self {
            Venue::Internal => 0,
            Venue::Jupiter => 1,
            Venue::Raydium => 2,
            Venue::Orca => 3,
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Venue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jupiter" | "jup" => Ok(Venue::Jupiter),
            "raydium" => Ok(Venue::Raydium),
            "orca" | "whirlpool" => Ok(Venue::Orca),
            "internal" => Ok(Venue::Internal),
            other => Err(format!("Unknown venue: {}", other)),
        }
    }
}

/// Jupiter quote API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JupiterVenueConfig {
    #[serde(default = "default_jupiter_url")]
    pub api_url: String,
    /// Optional API key for higher rate limits
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Raydium price API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaydiumVenueConfig {
    #[serde(default = "default_raydium_url")]
    pub api_url: String,
    /// Pool fee applied to the price-based estimate
    #[serde(default = "default_raydium_fee")]
    pub fee_bps: u16,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Orca quote API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrcaVenueConfig {
    #[serde(default = "default_orca_url")]
    pub api_url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Venue configuration, one record shape per venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VenueConfig {
    Jupiter(JupiterVenueConfig),
    Raydium(RaydiumVenueConfig),
    Orca(OrcaVenueConfig),
}

impl VenueConfig {
    pub fn venue(&self) -> Venue {
        match self {
            VenueConfig::Jupiter(_) => Venue::Jupiter,
            VenueConfig::Raydium(_) => Venue::Raydium,
            VenueConfig::Orca(_) => Venue::Orca,
        }
    }

    /// Initial state of the runtime enable flag
    pub fn enabled(&self) -> bool {
        match self {
            VenueConfig::Jupiter(c) => c.enabled,
            VenueConfig::Raydium(c) => c.enabled,
            VenueConfig::Orca(c) => c.enabled,
        }
    }

    pub fn api_url(&self) -> &str {
        match self {
            VenueConfig::Jupiter(c) => &c.api_url,
            VenueConfig::Raydium(c) => &c.api_url,
            VenueConfig::Orca(c) => &c.api_url,
        }
    }

    /// Default record for every external venue
    pub fn defaults() -> Vec<VenueConfig> {
        vec![
            VenueConfig::Jupiter(JupiterVenueConfig {
                api_url: default_jupiter_url(),
                api_key: None,
                enabled: true,
            }),
            VenueConfig::Raydium(RaydiumVenueConfig {
                api_url: default_raydium_url(),
                fee_bps: default_raydium_fee(),
                enabled: true,
            }),
            VenueConfig::Orca(OrcaVenueConfig {
                api_url: default_orca_url(),
                enabled: true,
            }),
        ]
    }
}

fn default_true() -> bool {
    true
}

fn default_jupiter_url() -> String {
    "https://api.jup.ag/swap/v1".to_string()
}

fn default_raydium_url() -> String {
    "https://api.raydium.io/v2".to_string()
}

fn default_raydium_fee() -> u16 {
    25
}

fn default_orca_url() -> String {
    "https://api.orca.so/v2".to_string()
}
