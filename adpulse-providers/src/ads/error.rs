//! Ads provider error types.

use adpulse_fetch::{FetchError, ProcessError, TransportFailure};
use thiserror::Error;

use super::failure::AdsFailure;

// ============================================================================
// Bootstrap Error
// ============================================================================

/// Failure to materialize the primary transport's configuration record.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A required setting is missing.
    #[error("bootstrap setting missing: {0}")]
    MissingSetting(&'static str),

    /// The record could not be written.
    #[error("bootstrap record write failed: {0}")]
    Io(#[from] std::io::Error),

    /// The record could not be serialized.
    #[error("bootstrap record serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<BootstrapError> for FetchError {
    fn from(err: BootstrapError) -> Self {
        TransportFailure::config_invalid(err.to_string()).into()
    }
}

// ============================================================================
// RPC Error
// ============================================================================

/// Error type for the native transport's JSON-RPC channel.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The bridge process could not be started or talked to.
    #[error("bridge process: {0}")]
    Process(#[from] ProcessError),

    /// A message could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The bridge answered with an error object.
    #[error("rpc error {code}: {message}")]
    Remote {
        /// Status code (gRPC numbering).
        code: i32,
        /// Error message.
        message: String,
        /// Structured provider failure, if attached.
        failure: Option<AdsFailure>,
    },

    /// The bridge answered without a result.
    #[error("empty rpc response")]
    EmptyResponse,

    /// A call was made before `initialize`.
    #[error("rpc client not initialized")]
    NotInitialized,
}

impl From<std::io::Error> for RpcError {
    fn from(err: std::io::Error) -> Self {
        Self::Process(ProcessError::Io(err))
    }
}

impl RpcError {
    /// Provider detail for a remote error: the rendered failure if one is
    /// attached, otherwise the bare message.
    fn remote_detail(message: &str, failure: Option<&AdsFailure>) -> String {
        match failure {
            Some(failure) if !failure.is_empty() => failure.render(),
            _ => message.to_string(),
        }
    }
}

impl From<RpcError> for FetchError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Process(e) => FetchError::Process(e),
            RpcError::Serialization(e) => FetchError::Json(e),
            RpcError::Remote {
                code,
                ref message,
                ref failure,
            } => {
                let detail = RpcError::remote_detail(message, failure.as_ref());
                match code {
                    // UNAUTHENTICATED, PERMISSION_DENIED
                    16 | 7 => TransportFailure::auth_rejected(detail).into(),
                    // INVALID_ARGUMENT, NOT_FOUND
                    3 | 5 => TransportFailure::query_rejected(detail).into(),
                    // DEADLINE_EXCEEDED, UNAVAILABLE
                    4 | 14 => TransportFailure::unreachable(detail).into(),
                    _ => FetchError::Unexpected(format!("rpc error {code}: {detail}")),
                }
            }
            RpcError::EmptyResponse | RpcError::NotInitialized => {
                FetchError::Unexpected(err.to_string())
            }
        }
    }
}
