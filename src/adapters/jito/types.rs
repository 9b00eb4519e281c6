//! Jito Bundle Types
//!
//! Bundle contents, submission results and the JSON-RPC shapes of the
//! Block Engine API.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use solana_sdk::transaction::VersionedTransaction;

use super::error::JitoError;

/// What a bundled transaction is for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    /// e.g. "swap", "tip", "slice"
    pub intent: String,
    #[serde(default)]
    pub amount: Option<u64>,
    /// Position of this slice in a split execution
    #[serde(default)]
    pub slice_index: Option<usize>,
}

/// One signed transaction waiting in a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleTransaction {
    pub id: String,
    /// Base64 of the bincode-serialized signed transaction
    pub payload: String,
    /// Lower submits first
    pub priority: u32,
    #[serde(default)]
    pub metadata: Option<BundleMetadata>,
}

impl BundleTransaction {
    /// Wrap an already encoded payload
    pub fn new(id: impl Into<String>, payload: impl Into<String>, priority: u32) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
            priority,
            metadata: None,
        }
    }

    /// Serialize a signed transaction into a bundle entry
    pub fn from_transaction(
        id: impl Into<String>,
        transaction: &VersionedTransaction,
        priority: u32,
    ) -> Result<Self, JitoError> {
        let bytes = bincode::serialize(transaction)
            .map_err(|e| JitoError::SerializationError(format!("Failed to serialize transaction: {}", e)))?;
        Ok(Self::new(id, STANDARD.encode(bytes), priority))
    }

    /// Builder method to attach metadata
    pub fn with_metadata(mut self, metadata: BundleMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Restore the signed transaction
    pub fn decode(&self) -> Result<VersionedTransaction, JitoError> {
        let bytes = STANDARD
            .decode(&self.payload)
            .map_err(|e| JitoError::InvalidTransaction(format!("Invalid base64: {}", e)))?;
        bincode::deserialize(&bytes)
            .map_err(|e| JitoError::InvalidTransaction(format!("Failed to deserialize transaction: {}", e)))
    }
}

/// Outcome of one submission attempt across the endpoint list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleResult {
    pub success: bool,
    pub bundle_id: Option<String>,
    /// Endpoint that accepted the bundle
    pub endpoint: Option<String>,
    /// Last error seen when every endpoint failed
    pub error: Option<String>,
    pub latency_ms: u64,
    pub transaction_count: usize,
    /// Failover rounds used
    pub rounds: u32,
}

impl BundleResult {
    pub fn accepted(
        bundle_id: String,
        endpoint: String,
        latency_ms: u64,
        transaction_count: usize,
        rounds: u32,
    ) -> Self {
        Self {
            success: true,
            bundle_id: Some(bundle_id),
            endpoint: Some(endpoint),
            error: None,
            latency_ms,
            transaction_count,
            rounds,
        }
    }

    pub fn failed(error: impl Into<String>, latency_ms: u64, transaction_count: usize, rounds: u32) -> Self {
        Self {
            success: false,
            bundle_id: None,
            endpoint: None,
            error: Some(error.into()),
            latency_ms,
            transaction_count,
            rounds,
        }
    }

    /// Bundle id on success, `AllEndpointsFailed` otherwise
    pub fn into_result(self) -> Result<String, JitoError> {
        match (self.success, self.bundle_id) {
            (true, Some(id)) => Ok(id),
            _ => Err(JitoError::AllEndpointsFailed {
                rounds: self.rounds,
                last_error: self.error.unwrap_or_else(|| "unknown error".into()),
            }),
        }
    }
}

/// Bundle status as reported by a block engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BundleStatus {
    /// Not yet confirmed (includes unknown to the engine)
    #[default]
    Pending,
    /// Bundle landed on chain
    Landed,
    /// Bundle failed to land
    Failed,
}

impl BundleStatus {
    /// Check if status is final
    pub fn is_final(&self) -> bool {
        matches!(self, BundleStatus::Landed | BundleStatus::Failed)
    }

    /// Check if status is successful
    pub fn is_success(&self) -> bool {
        matches!(self, BundleStatus::Landed)
    }
}

/// Lifecycle of the bundle held by a builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BundleState {
    /// Accepting transactions
    Building,
    Submitting,
    /// Accepted by an endpoint, waiting to land
    Pending { bundle_id: String },
    Landed { bundle_id: String },
    Failed { reason: String },
    /// Not observed in time; the bundle may still land
    TimedOut { bundle_id: String },
}

impl BundleState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BundleState::Landed { .. } | BundleState::Failed { .. } | BundleState::TimedOut { .. }
        )
    }
}

/// Snapshot of a builder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleStats {
    pub transaction_count: usize,
    pub max_transactions: usize,
    pub tip_lamports: u64,
    pub endpoint_count: usize,
    pub state: BundleState,
}

/// Encoding options for sendBundle
#[derive(Debug, Clone, Serialize)]
pub struct EncodingOptions {
    pub encoding: String,
}

/// Bundle submission request (JSON-RPC format)
#[derive(Debug, Clone, Serialize)]
pub struct BundleRequest {
    /// JSON-RPC version
    pub jsonrpc: String,
    /// Request ID
    pub id: u64,
    /// Method name
    pub method: String,
    /// Transactions followed by encoding options
    pub params: (Vec<String>, EncodingOptions),
}

impl BundleRequest {
    /// Create a new base64 bundle request
    pub fn new(transactions: Vec<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: 1,
            method: "sendBundle".to_string(),
            params: (
                transactions,
                EncodingOptions {
                    encoding: "base64".to_string(),
                },
            ),
        }
    }
}

/// JSON-RPC response wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse<T> {
    /// Result (if success)
    pub result: Option<T>,
    /// Error (if failure)
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Request to get bundle statuses
#[derive(Debug, Clone, Serialize)]
pub struct GetBundleStatusesRequest {
    /// JSON-RPC version
    pub jsonrpc: String,
    /// Request ID
    pub id: u64,
    /// Method name
    pub method: String,
    /// Bundle IDs to check
    pub params: Vec<Vec<String>>,
}

impl GetBundleStatusesRequest {
    /// Create a new status check request
    pub fn new(bundle_ids: Vec<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: 1,
            method: "getBundleStatuses".to_string(),
            params: vec![bundle_ids],
        }
    }
}

/// Response from getBundleStatuses
#[derive(Debug, Clone, Deserialize)]
pub struct GetBundleStatusesResponse {
    /// One entry per requested id, null when the engine does not know it
    pub value: Vec<Option<BundleStatusEntry>>,
}

/// Single bundle status entry
#[derive(Debug, Clone, Deserialize)]
pub struct BundleStatusEntry {
    pub bundle_id: String,
    #[serde(default)]
    pub confirmation_status: Option<String>,
    /// `{"Ok": null}` on success, an error object otherwise
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub slot: Option<u64>,
}

impl BundleStatusEntry {
    pub fn status(&self) -> BundleStatus {
        match self.confirmation_status.as_deref() {
            Some("confirmed") | Some("finalized") => return BundleStatus::Landed,
            _ => {}
        }
        match &self.err {
            None | Some(serde_json::Value::Null) => BundleStatus::Pending,
            Some(serde_json::Value::Object(map)) if map.contains_key("Ok") => BundleStatus::Pending,
            Some(_) => BundleStatus::Failed,
        }
    }
}
