//! Jito Error Types
//!
//! Error handling for Jito bundle operations.

use thiserror::Error;

use crate::domain::RoutingError;

/// Errors that can occur during Jito bundle operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JitoError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Block Engine API error
    #[error("Block Engine error: {message} (code: {code})")]
    ApiError { code: i32, message: String },

    /// Bundle already holds the maximum number of transactions
    #[error("Bundle full: at most {max} transactions")]
    BundleFull { max: usize },

    /// Invalid bundle (empty, already submitted, etc.)
    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),

    /// Invalid transaction format
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Request timeout
    #[error("Request timed out")]
    Timeout,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Network/connection error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Bundle status check failed
    #[error("Status check failed: {0}")]
    StatusCheckFailed(String),

    /// Every endpoint failed in every round
    #[error("All endpoints failed after {rounds} rounds: {last_error}")]
    AllEndpointsFailed { rounds: u32, last_error: String },

    /// Landing not observed in time; the bundle may still land
    #[error("Bundle {bundle_id} not confirmed after {waited_ms}ms")]
    ConfirmationTimeout { bundle_id: String, waited_ms: u64 },
}

impl JitoError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            JitoError::HttpError(_)
                | JitoError::Timeout
                | JitoError::NetworkError(_)
                | JitoError::RateLimited
                | JitoError::ConfirmationTimeout { .. }
        )
    }

    /// Check if error indicates bundle was invalid
    pub fn is_bundle_error(&self) -> bool {
        matches!(
            self,
            JitoError::BundleFull { .. }
                | JitoError::InvalidBundle(_)
                | JitoError::InvalidTransaction(_)
        )
    }
}

impl From<reqwest::Error> for JitoError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            JitoError::Timeout
        } else if err.is_connect() {
            JitoError::NetworkError(err.to_string())
        } else {
            JitoError::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for JitoError {
    fn from(err: serde_json::Error) -> Self {
        JitoError::SerializationError(err.to_string())
    }
}

impl From<JitoError> for RoutingError {
    fn from(err: JitoError) -> Self {
        match err {
            JitoError::AllEndpointsFailed { rounds, last_error } => {
                RoutingError::AllEndpointsFailed { rounds, last_error }
            }
            JitoError::ConfirmationTimeout { bundle_id, waited_ms } => {
                RoutingError::Timeout { bundle_id, waited_ms }
            }
            JitoError::BundleFull { .. }
            | JitoError::InvalidBundle(_)
            | JitoError::InvalidTransaction(_) => RoutingError::InvalidRequest(err.to_string()),
            other => RoutingError::source_unavailable("jito", other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserAction;

    #[test]
    fn test_retryable_errors() {
        assert!(JitoError::Timeout.is_retryable());
        assert!(JitoError::RateLimited.is_retryable());
        assert!(JitoError::NetworkError("test".into()).is_retryable());

        assert!(!JitoError::BundleFull { max: 5 }.is_retryable());
        assert!(!JitoError::InvalidBundle("test".into()).is_retryable());
        assert!(!JitoError::AllEndpointsFailed { rounds: 3, last_error: "x".into() }.is_retryable());
    }

    #[test]
    fn test_bundle_errors() {
        assert!(JitoError::BundleFull { max: 5 }.is_bundle_error());
        assert!(JitoError::InvalidBundle("test".into()).is_bundle_error());

        assert!(!JitoError::Timeout.is_bundle_error());
        assert!(!JitoError::RateLimited.is_bundle_error());
    }

    #[test]
    fn test_error_display() {
        let err = JitoError::ApiError {
            code: -32000,
            message: "Bundle simulation failed".to_string(),
        };
        assert!(err.to_string().contains("-32000"));
        assert!(err.to_string().contains("Bundle simulation failed"));
    }

    #[test]
    fn test_routing_error_mapping() {
        let exhausted: RoutingError =
            JitoError::AllEndpointsFailed { rounds: 3, last_error: "503".into() }.into();
        assert_eq!(exhausted.user_action(), UserAction::HardStop);
        assert!(exhausted.to_string().contains("503"));

        let timeout: RoutingError =
            JitoError::ConfirmationTimeout { bundle_id: "b1".into(), waited_ms: 60_000 }.into();
        assert_eq!(timeout, RoutingError::Timeout { bundle_id: "b1".into(), waited_ms: 60_000 });
        assert_eq!(timeout.user_action(), UserAction::Retry);

        let network: RoutingError = JitoError::NetworkError("reset".into()).into();
        assert!(matches!(network, RoutingError::SourceUnavailable { ref name, .. } if name == "jito"));
    }
}
