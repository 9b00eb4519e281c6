//! Jito Bundle Client
//!
//! HTTP client for one Jito Block Engine: bundle submission and status
//! checks over JSON-RPC.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::config::JitoConfig;
use super::error::JitoError;
use super::types::{
    BundleRequest, BundleStatus, GetBundleStatusesRequest, GetBundleStatusesResponse,
    JsonRpcResponse,
};

/// Jito accepts at most this many transactions per bundle
pub const MAX_BUNDLE_TRANSACTIONS: usize = 5;

/// A block engine the bundle builder can fail over to
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BundleEndpoint: Send + Sync {
    fn url(&self) -> &str;

    /// Submit base64 signed transactions, returning the bundle id
    async fn send_bundle(&self, transactions: &[String]) -> Result<String, JitoError>;

    async fn get_bundle_status(&self, bundle_id: &str) -> Result<BundleStatus, JitoError>;
}

/// Jito Block Engine client for bundle submission
#[derive(Debug, Clone)]
pub struct JitoBundleClient {
    /// Client configuration
    config: JitoConfig,
    /// HTTP client
    http: Client,
}

impl JitoBundleClient {
    /// Create a client for one block engine
    pub fn new(config: JitoConfig) -> Result<Self, JitoError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| JitoError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    /// Get the configured block engine URL
    pub fn block_engine_url(&self) -> &str {
        &self.config.block_engine_url
    }

    fn bundles_url(&self) -> String {
        format!("{}/api/v1/bundles", self.config.block_engine_url.trim_end_matches('/'))
    }

    fn post<B: Serialize>(&self, body: &B) -> RequestBuilder {
        let req_builder = self
            .http
            .post(self.bundles_url())
            .header("Content-Type", "application/json")
            .json(body);

        // Add API token if configured
        match self.config.api_token {
            Some(ref token) => req_builder.header("Authorization", format!("Bearer {}", token)),
            None => req_builder,
        }
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        body: &B,
    ) -> Result<JsonRpcResponse<T>, JitoError> {
        let response = self.post(body).send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(JitoError::RateLimited);
        }

        let response_text = response.text().await?;
        if !status.is_success() {
            // Block engines put JSON-RPC errors in non-2xx bodies too
            if let Ok(rpc) = serde_json::from_str::<JsonRpcResponse<T>>(&response_text) {
                if rpc.error.is_some() {
                    return Ok(rpc);
                }
            }
            return Err(JitoError::HttpError(format!("{}: {}", status, response_text)));
        }

        Ok(serde_json::from_str(&response_text)?)
    }

    /// Validate bundle size before it leaves the process
    fn validate(transactions: &[String]) -> Result<(), JitoError> {
        if transactions.is_empty() {
            return Err(JitoError::InvalidBundle("Bundle cannot be empty".into()));
        }
        if transactions.len() > MAX_BUNDLE_TRANSACTIONS {
            return Err(JitoError::InvalidBundle(format!(
                "Bundle cannot contain more than {} transactions",
                MAX_BUNDLE_TRANSACTIONS
            )));
        }
        Ok(())
    }

    fn status_from(
        bundle_id: &str,
        rpc_response: JsonRpcResponse<GetBundleStatusesResponse>,
    ) -> Result<BundleStatus, JitoError> {
        if let Some(error) = rpc_response.error {
            return Err(JitoError::StatusCheckFailed(error.message));
        }

        let statuses = rpc_response
            .result
            .ok_or_else(|| JitoError::StatusCheckFailed("No status in response".into()))?;

        // Unknown to this engine yet
        let status = statuses
            .value
            .into_iter()
            .flatten()
            .find(|e| e.bundle_id == bundle_id)
            .map(|e| e.status())
            .unwrap_or(BundleStatus::Pending);

        Ok(status)
    }
}

#[async_trait]
impl BundleEndpoint for JitoBundleClient {
    fn url(&self) -> &str {
        self.block_engine_url()
    }

    async fn send_bundle(&self, transactions: &[String]) -> Result<String, JitoError> {
        Self::validate(transactions)?;

        let request = BundleRequest::new(transactions.to_vec());
        let rpc_response: JsonRpcResponse<String> = self.call(&request).await?;

        if let Some(error) = rpc_response.error {
            return Err(JitoError::ApiError {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response.result.ok_or_else(|| JitoError::ApiError {
            code: -1,
            message: "No bundle ID in response".into(),
        })
    }

    async fn get_bundle_status(&self, bundle_id: &str) -> Result<BundleStatus, JitoError> {
        let request = GetBundleStatusesRequest::new(vec![bundle_id.to_string()]);
        let rpc_response = self.call(&request).await?;
        Self::status_from(bundle_id, rpc_response)
    }
}
