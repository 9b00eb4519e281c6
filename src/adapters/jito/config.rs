//! Jito Configuration
//!
//! Block engine endpoints, tip accounts and bundle submission settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Jito Block Engine endpoints
pub mod endpoints {
    /// Global mainnet block engine
    pub const MAINNET: &str = "https://mainnet.block-engine.jito.wtf";
    /// Mainnet block engine (Amsterdam)
    pub const MAINNET_AMSTERDAM: &str = "https://amsterdam.mainnet.block-engine.jito.wtf";
    /// Mainnet block engine (Frankfurt)
    pub const MAINNET_FRANKFURT: &str = "https://frankfurt.mainnet.block-engine.jito.wtf";
    /// Mainnet block engine (New York)
    pub const MAINNET_NY: &str = "https://ny.mainnet.block-engine.jito.wtf";
    /// Mainnet block engine (Tokyo)
    pub const MAINNET_TOKYO: &str = "https://tokyo.mainnet.block-engine.jito.wtf";

    /// Failover order used when no endpoints are configured
    pub const FAILOVER_ORDER: [&str; 5] = [
        MAINNET,
        MAINNET_AMSTERDAM,
        MAINNET_FRANKFURT,
        MAINNET_NY,
        MAINNET_TOKYO,
    ];

    /// Resolve a region alias to its block engine URL
    pub fn for_region(region: &str) -> Option<&'static str> {
        match region.to_lowercase().as_str() {
            "mainnet" | "global" => Some(MAINNET),
            "amsterdam" | "ams" => Some(MAINNET_AMSTERDAM),
            "frankfurt" | "fra" => Some(MAINNET_FRANKFURT),
            "newyork" | "ny" => Some(MAINNET_NY),
            "tokyo" | "tyo" => Some(MAINNET_TOKYO),
            _ => None,
        }
    }
}

/// Jito tip accounts for validator tips
pub mod tip_accounts {
    /// Official Jito tip accounts (validators rotate through these)
    pub const TIP_ACCOUNTS: &[&str] = &[
        "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5",
        "HFqU5x63VTqvQss8hp11i4bVmkdzGZBJLYQ6QwBvp8dx",
        "Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY",
        "ADaUMid9yfUytqMBgopwjb2DTLSokTSzL1zt6iGPaS49",
        "DfXygSm4jCyNCybVYYK6DwvWqjKee8pbDmJGcLWNDXjh",
        "ADuUkR4vqLUMWXxW9gh6D6L8pMSawimctcNZ5pGwDcEt",
        "DttWaMuVvTiduZRnguLF7jNxTgiMBZ1hyAumKUiL2KRL",
        "3AVi9Tg9Uo68tJfuvoKvqKNWKkC5wPdSSdeBnizKZ6jT",
    ];

    /// Pick a tip account uniformly at random
    pub fn random_tip_account() -> &'static str {
        use rand::Rng;
        let idx = rand::thread_rng().gen_range(0..TIP_ACCOUNTS.len());
        TIP_ACCOUNTS[idx]
    }
}

/// Single block engine connection settings
#[derive(Debug, Clone)]
pub struct JitoConfig {
    /// Block Engine endpoint URL
    pub block_engine_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Optional API token for authenticated requests
    pub api_token: Option<String>,
}

impl Default for JitoConfig {
    fn default() -> Self {
        Self {
            block_engine_url: endpoints::MAINNET.to_string(),
            timeout: Duration::from_secs(30),
            api_token: None,
        }
    }
}

impl JitoConfig {
    pub fn new(block_engine_url: impl Into<String>) -> Self {
        Self {
            block_engine_url: block_engine_url.into(),
            ..Default::default()
        }
    }

    /// Builder method to set API token
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Builder method to set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Bundle builder settings, read from the `[jito]` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Block engines in failover order
    pub endpoints: Vec<String>,
    /// Transactions per bundle (Jito accepts at most 5)
    pub max_transactions: usize,
    /// Validator tip per bundle
    pub tip_lamports: u64,
    /// Failover rounds over the endpoint list
    pub max_retries: u32,
    /// Per-call timeout
    pub request_timeout_ms: u64,
    /// Status polling interval while waiting for confirmation
    pub poll_interval_ms: u64,
    /// Default confirmation wait
    pub max_wait_ms: u64,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            endpoints: endpoints::FAILOVER_ORDER.iter().map(|e| e.to_string()).collect(),
            max_transactions: 5,
            tip_lamports: 10_000, // 0.00001 SOL
            max_retries: 3,
            request_timeout_ms: 30_000,
            poll_interval_ms: 2_000,
            max_wait_ms: 60_000,
            api_token: None,
        }
    }
}

impl BundleConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// Builder method to set the tip amount
    pub fn with_tip(mut self, lamports: u64) -> Self {
        self.tip_lamports = lamports;
        self
    }

    /// Builder method to replace the endpoint list
    pub fn with_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Connection settings for one endpoint of the list
    pub fn client_config(&self, url: &str) -> JitoConfig {
        JitoConfig {
            block_engine_url: url.to_string(),
            timeout: self.request_timeout(),
            api_token: self.api_token.clone(),
        }
    }
}
