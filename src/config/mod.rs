//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, AggregatorSection, CacheSection, Config, ConfigError, HealthSection,
    LoggingSection, OracleSection, RouterSection,
};
