//! Bundle Builder
//!
//! Collects signed transactions into one atomic bundle and submits it with
//! sequential endpoint failover. Endpoints are tried in order and the first
//! acceptance wins, so a bundle is never sent to two engines in one round.

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::{instruction::Instruction, pubkey::Pubkey, system_instruction};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use super::client::{BundleEndpoint, JitoBundleClient};
use super::config::{tip_accounts, BundleConfig};
use super::error::JitoError;
use super::types::{BundleResult, BundleState, BundleStats, BundleStatus, BundleTransaction};

#[derive(Clone)]
pub struct BundleBuilder {
    config: BundleConfig,
    endpoints: Vec<Arc<dyn BundleEndpoint>>,
    transactions: Vec<BundleTransaction>,
    state: BundleState,
}

impl std::fmt::Debug for BundleBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleBuilder")
            .field("endpoints", &self.endpoint_urls())
            .field("transactions", &self.transactions.len())
            .field("state", &self.state)
            .finish()
    }
}

impl BundleBuilder {
    pub fn new(config: BundleConfig, endpoints: Vec<Arc<dyn BundleEndpoint>>) -> Self {
        Self {
            config,
            endpoints,
            transactions: Vec::new(),
            state: BundleState::Building,
        }
    }

    /// One HTTP client per configured block engine, in failover order
    pub fn from_config(config: BundleConfig) -> Result<Self, JitoError> {
        let endpoints = config
            .endpoints
            .iter()
            .map(|url| {
                JitoBundleClient::new(config.client_config(url))
                    .map(|c| Arc::new(c) as Arc<dyn BundleEndpoint>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(config, endpoints))
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    pub fn endpoint_urls(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.url()).collect()
    }

    pub fn state(&self) -> &BundleState {
        &self.state
    }

    /// Transactions in submission order
    pub fn transactions(&self) -> &[BundleTransaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.transactions.len() >= self.config.max_transactions
    }

    /// Add a transaction, keeping ascending priority order (stable on ties)
    pub fn add_transaction(&mut self, transaction: BundleTransaction) -> Result<(), JitoError> {
        if self.state != BundleState::Building {
            return Err(JitoError::InvalidBundle("bundle already submitted".into()));
        }
        if self.is_full() {
            return Err(JitoError::BundleFull {
                max: self.config.max_transactions,
            });
        }

        self.transactions.push(transaction);
        self.transactions.sort_by_key(|t| t.priority);
        Ok(())
    }

    /// Add as many as fit, returning how many were accepted
    pub fn add_transactions<I>(&mut self, transactions: I) -> usize
    where
        I: IntoIterator<Item = BundleTransaction>,
    {
        let mut added = 0;
        for transaction in transactions {
            if self.add_transaction(transaction).is_ok() {
                added += 1;
            }
        }
        added
    }

    /// Tip transfer to a random tip account; must be signed into one of the
    /// bundled transactions
    pub fn tip_instruction(&self, payer: &Pubkey) -> Result<Instruction, JitoError> {
        if self.config.tip_lamports == 0 {
            return Err(JitoError::InvalidBundle("Tip amount cannot be zero".into()));
        }

        let tip_account = tip_accounts::random_tip_account()
            .parse::<Pubkey>()
            .map_err(|e| JitoError::InvalidTransaction(format!("Invalid tip account: {}", e)))?;

        Ok(system_instruction::transfer(payer, &tip_account, self.config.tip_lamports))
    }

    /// Submit already signed payloads.
    ///
    /// Up to `max_retries` rounds over the endpoint list; within a round the
    /// first endpoint to accept wins. Every call is bounded by the request
    /// timeout.
    pub async fn submit_bundle(&self, signed: &[String]) -> BundleResult {
        let started = Instant::now();
        let count = signed.len();

        if signed.is_empty() {
            return BundleResult::failed("no transactions to submit", 0, 0, 0);
        }
        if self.endpoints.is_empty() {
            return BundleResult::failed("no endpoints configured", 0, count, 0);
        }

        let mut last_error = String::from("no attempts made");
        for round in 1..=self.config.max_retries {
            for endpoint in &self.endpoints {
                let url = endpoint.url();
                match timeout(self.config.request_timeout(), endpoint.send_bundle(signed)).await {
                    Ok(Ok(bundle_id)) => {
                        let latency_ms = started.elapsed().as_millis() as u64;
                        info!(
                            "Bundle {} accepted by {} ({} txs, round {}, {}ms)",
                            bundle_id, url, count, round, latency_ms
                        );
                        return BundleResult::accepted(bundle_id, url.to_string(), latency_ms, count, round);
                    }
                    Ok(Err(e)) => {
                        warn!("Bundle submission to {} failed: {}", url, e);
                        last_error = e.to_string();
                    }
                    Err(_) => {
                        warn!("Bundle submission to {} timed out", url);
                        last_error = JitoError::Timeout.to_string();
                    }
                }
            }
            debug!("Bundle round {}/{} exhausted", round, self.config.max_retries);
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        warn!(
            "Bundle failed on all {} endpoints after {} rounds: {}",
            self.endpoints.len(),
            self.config.max_retries,
            last_error
        );
        BundleResult::failed(last_error, latency_ms, count, self.config.max_retries)
    }

    /// Submit the built transactions and advance the state machine
    pub async fn submit(&mut self) -> BundleResult {
        if self.state != BundleState::Building {
            return BundleResult::failed("bundle already submitted", 0, self.len(), 0);
        }

        self.state = BundleState::Submitting;
        let payloads: Vec<String> = self.transactions.iter().map(|t| t.payload.clone()).collect();
        let result = self.submit_bundle(&payloads).await;

        self.state = match (&result.bundle_id, result.success) {
            (Some(id), true) => BundleState::Pending { bundle_id: id.clone() },
            _ => BundleState::Failed {
                reason: result.error.clone().unwrap_or_default(),
            },
        };
        result
    }

    /// First endpoint to answer wins; no cross-endpoint aggregation
    pub async fn get_bundle_status(&self, bundle_id: &str) -> Result<BundleStatus, JitoError> {
        self.status_before(bundle_id, None).await
    }

    /// Status lookup where no endpoint call runs past `deadline`
    async fn status_before(&self, bundle_id: &str, deadline: Option<Instant>) -> Result<BundleStatus, JitoError> {
        let mut last_error = String::from("no endpoints configured");
        for endpoint in &self.endpoints {
            let mut limit = self.config.request_timeout();
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    last_error = JitoError::Timeout.to_string();
                    break;
                }
                limit = limit.min(remaining);
            }
            match timeout(limit, endpoint.get_bundle_status(bundle_id)).await {
                Ok(Ok(status)) => return Ok(status),
                Ok(Err(e)) => {
                    debug!("Status check on {} failed: {}", endpoint.url(), e);
                    last_error = e.to_string();
                }
                Err(_) => last_error = JitoError::Timeout.to_string(),
            }
        }
        Err(JitoError::StatusCheckFailed(last_error))
    }

    /// Poll until the bundle lands or fails.
    ///
    /// Returns `ConfirmationTimeout` when neither is observed within
    /// `max_wait`; a hung status call is cut off at the same deadline.
    /// Status check errors are treated as "still pending".
    pub async fn wait_for_confirmation(
        &self,
        bundle_id: &str,
        max_wait: Duration,
    ) -> Result<BundleStatus, JitoError> {
        let started = Instant::now();
        let deadline = started + max_wait;
        let poll_interval = self.config.poll_interval();

        while started.elapsed() < max_wait {
            match self.status_before(bundle_id, Some(deadline)).await {
                Ok(status) if status.is_final() => {
                    info!(
                        "Bundle {} {:?} after {}ms",
                        bundle_id,
                        status,
                        started.elapsed().as_millis()
                    );
                    return Ok(status);
                }
                Ok(_) => {}
                Err(e) => debug!("Bundle {} status unavailable: {}", bundle_id, e),
            }
            tokio::time::sleep(poll_interval.min(max_wait.saturating_sub(started.elapsed()))).await;
        }

        warn!("Bundle {} not confirmed within {:?}", bundle_id, max_wait);
        Err(JitoError::ConfirmationTimeout {
            bundle_id: bundle_id.to_string(),
            waited_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Wait for the submitted bundle using the configured `max_wait`
    pub async fn confirm(&mut self) -> Result<BundleStatus, JitoError> {
        let bundle_id = match &self.state {
            BundleState::Pending { bundle_id } => bundle_id.clone(),
            other => {
                return Err(JitoError::InvalidBundle(format!(
                    "no pending bundle to confirm (state {:?})",
                    other
                )))
            }
        };

        let outcome = self.wait_for_confirmation(&bundle_id, self.config.max_wait()).await;
        self.state = match &outcome {
            Ok(BundleStatus::Landed) => BundleState::Landed { bundle_id },
            Ok(_) => BundleState::Failed {
                reason: "bundle failed on chain".into(),
            },
            Err(_) => BundleState::TimedOut { bundle_id },
        };
        outcome
    }

    /// Drop all transactions and return to `Building`
    pub fn clear(&mut self) {
        self.transactions.clear();
        self.state = BundleState::Building;
    }

    pub fn stats(&self) -> BundleStats {
        BundleStats {
            transaction_count: self.transactions.len(),
            max_transactions: self.config.max_transactions,
            tip_lamports: self.config.tip_lamports,
            endpoint_count: self.endpoints.len(),
            state: self.state.clone(),
        }
    }
}
