//! Configuration Loader
//!
//! Loads and validates the router configuration from TOML. Every section has
//! defaults, so an empty file is a valid configuration.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::adapters::jito::{BundleConfig, MAX_BUNDLE_TRANSACTIONS};
use crate::application::health_monitor::HealthConfig;
use crate::application::price_oracle::OracleConfig;
use crate::domain::venue::JupiterVenueConfig;
use crate::domain::{PoolConfig, SlippageConfig, SplitRouteConfig, Venue, VenueConfig};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheSection,
    pub health: HealthSection,
    pub aggregator: AggregatorSection,
    /// One `[[venues]]` table per external venue, tagged by `kind`
    pub venues: Vec<VenueConfig>,
    pub split_route: SplitRouteConfig,
    pub slippage: SlippageConfig,
    pub pool: PoolConfig,
    pub oracle: OracleSection,
    pub jito: BundleConfig,
    pub router: RouterSection,
    pub logging: LoggingSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheSection::default(),
            health: HealthSection::default(),
            aggregator: AggregatorSection::default(),
            venues: VenueConfig::defaults(),
            split_route: SplitRouteConfig::default(),
            slippage: SlippageConfig::default(),
            pool: PoolConfig::default(),
            oracle: OracleSection::default(),
            jito: BundleConfig::default(),
            router: RouterSection::default(),
            logging: LoggingSection::default(),
        }
    }
}

/// Quote cache section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub ttl_ms: u64,
    /// Oldest entry is evicted beyond this
    pub max_entries: usize,
    /// Misses after which a pair is refreshed ahead of demand
    pub prediction_threshold: u64,
    /// Period of the predictive refresh
    pub refresh_interval_ms: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_ms: 2_000,
            max_entries: 100,
            prediction_threshold: 3,
            refresh_interval_ms: 1_500,
        }
    }
}

/// Health monitor section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthSection {
    pub check_interval_ms: u64,
    pub probe_timeout_ms: u64,
    /// An ok probe slower than this is degraded
    pub latency_threshold_ms: u64,
    /// Solana RPC probed with getHealth
    pub rpc_url: String,
    /// Whether the RPC node counts as critical
    pub rpc_critical: bool,
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            check_interval_ms: 10_000,
            probe_timeout_ms: 5_000,
            latency_threshold_ms: 2_000,
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            rpc_critical: true,
        }
    }
}

impl From<&HealthSection> for HealthConfig {
    fn from(section: &HealthSection) -> Self {
        HealthConfig {
            check_interval: Duration::from_millis(section.check_interval_ms),
            probe_timeout: Duration::from_millis(section.probe_timeout_ms),
            latency_threshold: Duration::from_millis(section.latency_threshold_ms),
        }
    }
}

/// Aggregator section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorSection {
    /// Per-source deadline for one fan-out
    pub source_timeout_ms: u64,
}

impl Default for AggregatorSection {
    fn default() -> Self {
        Self {
            source_timeout_ms: 8_000,
        }
    }
}

/// Price oracle section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    pub cache_ttl_ms: u64,
    /// Cached prices up to `cache_ttl * stale_grace_factor` old serve as fallback
    pub stale_grace_factor: u32,
    pub source_timeout_ms: u64,
    /// Sources in fallback order: "jupiter", "birdeye", "dexscreener"
    pub sources: Vec<String>,
    /// Birdeye is skipped without a key
    pub birdeye_api_key: Option<String>,
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 5_000,
            stale_grace_factor: 4,
            source_timeout_ms: 3_000,
            sources: vec!["jupiter".into(), "birdeye".into(), "dexscreener".into()],
            birdeye_api_key: None,
        }
    }
}

impl From<&OracleSection> for OracleConfig {
    fn from(section: &OracleSection) -> Self {
        OracleConfig {
            cache_ttl: Duration::from_millis(section.cache_ttl_ms),
            stale_grace_factor: section.stale_grace_factor,
            source_timeout: Duration::from_millis(section.source_timeout_ms),
        }
    }
}

/// Router section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterSection {
    /// How long a returned plan stays executable
    pub plan_ttl_ms: u64,
    /// Volatility assumed when the caller gives none
    pub default_volatility_bps: u32,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            plan_ttl_ms: 30_000,
            default_volatility_bps: 0,
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file, apply environment overrides, validate
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn invalid(message: String) -> ConfigError {
    ConfigError::ValidationError(message)
}

impl Config {
    /// Defaults plus environment overrides, for running without a file
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Secrets and endpoints from the environment win over file values
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("JUPITER_API_KEY") {
            match self.venues.iter_mut().find_map(|v| match v {
                VenueConfig::Jupiter(c) => Some(c),
                _ => None,
            }) {
                Some(jupiter) => jupiter.api_key = Some(key),
                None => tracing::debug!("JUPITER_API_KEY set but no jupiter venue configured"),
            }
        }
        if let Some(key) = lookup("BIRDEYE_API_KEY") {
            self.oracle.birdeye_api_key = Some(key);
        }
        if let Some(token) = lookup("JITO_API_TOKEN") {
            self.jito.api_token = Some(token);
        }
        if let Some(url) = lookup("SOLANA_RPC_URL") {
            self.health.rpc_url = url;
        }
    }

    /// Jupiter settings; Jupiter is always a source even if not listed
    pub fn jupiter(&self) -> JupiterVenueConfig {
        self.venues
            .iter()
            .find_map(|v| match v {
                VenueConfig::Jupiter(c) => Some(c.clone()),
                _ => None,
            })
            .unwrap_or_else(|| match VenueConfig::defaults().into_iter().next() {
                Some(VenueConfig::Jupiter(c)) => c,
                _ => JupiterVenueConfig {
                    api_url: "https://api.jup.ag/swap/v1".to_string(),
                    api_key: None,
                    enabled: true,
                },
            })
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.ttl_ms == 0 {
            return Err(invalid("cache.ttl_ms must be > 0".to_string()));
        }
        if self.cache.max_entries == 0 {
            return Err(invalid("cache.max_entries must be > 0".to_string()));
        }
        if self.cache.prediction_threshold == 0 || self.cache.refresh_interval_ms == 0 {
            return Err(invalid("cache prediction settings must be > 0".to_string()));
        }

        if self.health.probe_timeout_ms == 0 || self.health.check_interval_ms == 0 {
            return Err(invalid("health intervals must be > 0".to_string()));
        }

        if self.aggregator.source_timeout_ms == 0 {
            return Err(invalid("aggregator.source_timeout_ms must be > 0".to_string()));
        }

        let mut seen = Vec::new();
        for venue in &self.venues {
            let v: Venue = venue.venue();
            if seen.contains(&v) {
                return Err(invalid(format!("venue {} configured twice", v)));
            }
            if venue.api_url().is_empty() {
                return Err(invalid(format!("venue {} api_url cannot be empty", v)));
            }
            seen.push(v);
        }

        if self.split_route.max_splits == 0 {
            return Err(invalid("split_route.max_splits must be > 0".to_string()));
        }
        if self.split_route.min_split_percent > 100 {
            return Err(invalid(format!(
                "split_route.min_split_percent must be 0-100, got {}",
                self.split_route.min_split_percent
            )));
        }
        if self.split_route.resolution_bps == 0 || self.split_route.resolution_bps > 10_000 {
            return Err(invalid(format!(
                "split_route.resolution_bps must be 1-10000, got {}",
                self.split_route.resolution_bps
            )));
        }

        if self.slippage.base_slippage_bps > self.slippage.max_slippage_bps {
            return Err(invalid(format!(
                "slippage.base_slippage_bps ({}) exceeds max_slippage_bps ({})",
                self.slippage.base_slippage_bps, self.slippage.max_slippage_bps
            )));
        }
        if self.slippage.volatility_divisor == 0 {
            return Err(invalid("slippage.volatility_divisor must be > 0".to_string()));
        }

        if self.pool.max_utilization_bps == 0 || self.pool.max_utilization_bps > 10_000 {
            return Err(invalid(format!(
                "pool.max_utilization_bps must be 1-10000, got {}",
                self.pool.max_utilization_bps
            )));
        }
        if self.pool.rebate_share_bps > 10_000 {
            return Err(invalid(format!(
                "pool.rebate_share_bps must be 0-10000, got {}",
                self.pool.rebate_share_bps
            )));
        }

        if self.oracle.cache_ttl_ms == 0 {
            return Err(invalid("oracle.cache_ttl_ms must be > 0".to_string()));
        }

        if self.jito.endpoints.is_empty() {
            return Err(invalid("jito.endpoints cannot be empty".to_string()));
        }
        if self.jito.max_transactions == 0 || self.jito.max_transactions > MAX_BUNDLE_TRANSACTIONS {
            return Err(invalid(format!(
                "jito.max_transactions must be 1-{}, got {}",
                MAX_BUNDLE_TRANSACTIONS, self.jito.max_transactions
            )));
        }
        if self.jito.max_retries == 0 {
            return Err(invalid("jito.max_retries must be > 0".to_string()));
        }
        if self.jito.poll_interval_ms == 0 {
            return Err(invalid("jito.poll_interval_ms must be > 0".to_string()));
        }

        if self.router.plan_ttl_ms == 0 {
            return Err(invalid("router.plan_ttl_ms must be > 0".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_is_valid() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.cache.ttl_ms, 2_000);
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.aggregator.source_timeout_ms, 8_000);
        assert_eq!(config.venues.len(), 3);
        assert_eq!(config.split_route.max_splits, 4);
        assert_eq!(config.slippage.base_slippage_bps, 100);
        assert_eq!(config.pool.max_utilization_bps, 9_000);
        assert_eq!(config.jito.max_transactions, 5);
        assert_eq!(config.router.plan_ttl_ms, 30_000);
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
[cache]
ttl_ms = 1500

[health]
latency_threshold_ms = 1000

[[venues]]
kind = "jupiter"
api_url = "https://quote.example"

[[venues]]
kind = "orca"
enabled = false

[split_route]
max_splits = 3
min_split_percent = 10

[slippage]
base_slippage_bps = 50
max_slippage_bps = 300

[jito]
endpoints = ["https://ny.mainnet.block-engine.jito.wtf"]
tip_lamports = 25000

[logging]
level = "debug"
"#,
        );

        let config = load_config(file.path()).unwrap();

        assert_eq!(config.cache.ttl_ms, 1_500);
        assert_eq!(HealthConfig::from(&config.health).latency_threshold, Duration::from_secs(1));
        assert_eq!(config.venues.len(), 2);
        assert!(!config.venues[1].enabled());
        assert_eq!(config.jupiter().api_url, "https://quote.example");
        assert_eq!(config.split_route.max_splits, 3);
        assert_eq!(config.slippage.max_slippage_bps, 300);
        assert_eq!(config.jito.endpoints.len(), 1);
        assert_eq!(config.jito.tip_lamports, 25_000);
        assert_eq!(config.jito.max_retries, 3);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_invalid_toml() {
        let file = write_config("[cache\nttl_ms = 1");
        assert!(matches!(load_config(file.path()).unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let file = write_config("[cache]\nttl_ms = 0\n");
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_slippage_bounds_rejected() {
        let mut config = Config::default();
        config.slippage.base_slippage_bps = 600;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_split_constraints() {
        let mut config = Config::default();
        config.split_route.max_splits = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.split_route.min_split_percent = 40;
        config.split_route.max_splits = 4;
        assert!(config.validate().is_ok());

        config.split_route.min_split_percent = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_utilization_bounds() {
        let mut config = Config::default();
        config.pool.max_utilization_bps = 0;
        assert!(config.validate().is_err());
        config.pool.max_utilization_bps = 10_001;
        assert!(config.validate().is_err());
        config.pool.max_utilization_bps = 10_000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_jito_endpoints_rejected() {
        let mut config = Config::default();
        config.jito.endpoints.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bundle_size_bounds() {
        let mut config = Config::default();
        config.jito.max_transactions = MAX_BUNDLE_TRANSACTIONS + 1;
        assert!(matches!(config.validate().unwrap_err(), ConfigError::ValidationError(_)));

        config.jito.max_transactions = 0;
        assert!(config.validate().is_err());

        config.jito.max_transactions = MAX_BUNDLE_TRANSACTIONS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_prediction_settings() {
        let file = write_config("[cache]\nprediction_threshold = 5\nrefresh_interval_ms = 3000\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.cache.prediction_threshold, 5);
        assert_eq!(config.cache.refresh_interval_ms, 3_000);
        assert_eq!(Config::default().cache.prediction_threshold, 3);

        let mut config = Config::default();
        config.cache.refresh_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_venue_rejected() {
        let file = write_config("[[venues]]\nkind = \"orca\"\n\n[[venues]]\nkind = \"orca\"\n");
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::ValidationError(msg) if msg.contains("orca")
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("JUPITER_API_KEY", "jup-key"),
            ("BIRDEYE_API_KEY", "bird-key"),
            ("JITO_API_TOKEN", "jito-token"),
            ("SOLANA_RPC_URL", "https://rpc.example"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.jupiter().api_key.as_deref(), Some("jup-key"));
        assert_eq!(config.oracle.birdeye_api_key.as_deref(), Some("bird-key"));
        assert_eq!(config.jito.api_token.as_deref(), Some("jito-token"));
        assert_eq!(config.health.rpc_url, "https://rpc.example");
    }

    #[test]
    fn test_jupiter_always_available() {
        let mut config = Config::default();
        config.venues.retain(|v| v.venue() != Venue::Jupiter);
        assert_eq!(config.jupiter().api_url, "https://api.jup.ag/swap/v1");
    }
}
