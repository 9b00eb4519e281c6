//! Health Check Port
//!
//! Async probes registered with the health monitor.

use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a probe reports about itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub ok: bool,
    /// Self-reported latency; the monitor classifies on measured time instead
    pub latency_ms: u64,
    pub message: Option<String>,
}

impl ProbeResult {
    pub fn ok(latency_ms: u64) -> Self {
        Self { ok: true, latency_ms, message: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { ok: false, latency_ms: 0, message: Some(message.into()) }
    }
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> ProbeResult;
}

/// Any async closure is a probe
#[async_trait]
impl<F, Fut> HealthCheck for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ProbeResult> + Send + 'static,
{
    async fn check(&self) -> ProbeResult {
        (self)().await
    }
}
