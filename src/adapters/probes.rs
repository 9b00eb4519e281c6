//! Health probes for the monitor: plain HTTP endpoints and Solana RPC nodes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;

use crate::ports::{HealthCheck, ProbeResult};

fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// GET a URL; any 2xx is healthy
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    headers: Vec<(String, String)>,
    http: Client,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            url: url.into(),
            headers: Vec::new(),
            http: build_client(timeout)?,
        })
    }

    /// Builder method for APIs that need a key header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HealthCheck for HttpProbe {
    async fn check(&self) -> ProbeResult {
        let started = Instant::now();
        let request = self
            .headers
            .iter()
            .fold(self.http.get(&self.url), |request, (name, value)| {
                request.header(name.as_str(), value.as_str())
            });
        match request.send().await {
            Ok(response) if response.status().is_success() => {
                ProbeResult::ok(started.elapsed().as_millis() as u64)
            }
            Ok(response) => ProbeResult::failed(format!("HTTP {}", response.status())),
            Err(e) => ProbeResult::failed(e.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetHealthResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

impl GetHealthResponse {
    fn into_probe(self, latency_ms: u64) -> ProbeResult {
        match (self.result.as_deref(), self.error) {
            (Some("ok"), _) => ProbeResult::ok(latency_ms),
            (_, Some(error)) => ProbeResult::failed(error.message),
            (other, None) => ProbeResult::failed(format!("unexpected getHealth result {:?}", other)),
        }
    }
}

/// Solana JSON-RPC `getHealth`; result `"ok"` is healthy
#[derive(Debug, Clone)]
pub struct JsonRpcProbe {
    rpc_url: String,
    http: Client,
}

impl JsonRpcProbe {
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            rpc_url: rpc_url.into(),
            http: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl HealthCheck for JsonRpcProbe {
    async fn check(&self) -> ProbeResult {
        let started = Instant::now();
        let body = json!({"jsonrpc": "2.0", "id": 1, "method": "getHealth"});

        let response = match self.http.post(&self.rpc_url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => return ProbeResult::failed(e.to_string()),
        };
        // Unhealthy nodes answer 503 with a JSON-RPC error body
        match response.json::<GetHealthResponse>().await {
            Ok(parsed) => parsed.into_probe(started.elapsed().as_millis() as u64),
            Err(e) => ProbeResult::failed(format!("invalid getHealth response: {}", e)),
        }
    }
}
