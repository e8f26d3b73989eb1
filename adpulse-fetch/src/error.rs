//! Fetch error types.

use std::time::Duration;

use adpulse_core::FailureKind;
use thiserror::Error;

// ============================================================================
// Transport Failure
// ============================================================================

/// A failure an adapter has already classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct TransportFailure {
    /// What went wrong.
    pub kind: FailureKind,
    /// Provider or environment detail.
    pub detail: String,
}

impl TransportFailure {
    /// Creates a failure of the given kind.
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// The transport could not be reached, timed out or answered garbage.
    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::Unreachable, detail)
    }

    /// The transport is not usable in this environment.
    pub fn config_invalid(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::ConfigInvalid, detail)
    }

    /// The provider rejected the credential.
    pub fn auth_rejected(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::AuthRejected, detail)
    }

    /// The provider rejected the query.
    pub fn query_rejected(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::QueryRejected, detail)
    }
}

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for adapter and token exchange operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A classified transport failure.
    #[error("{0}")]
    Transport(#[from] TransportFailure),

    /// HTTP request failed before a status was received.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Native process error.
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// A response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The caller-supplied deadline expired.
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// Anything the adapters could not classify.
    #[error("{0}")]
    Unexpected(String),
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Plain-text HTTP refused by the transport settings.
    #[error("Insecure URL refused: {0}")]
    InsecureUrl(String),
}

// ============================================================================
// Process Error
// ============================================================================

/// Error type for native process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Command not found.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// The process could not be started.
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    /// The process closed its output before answering.
    #[error("Connection closed by {0}")]
    ConnectionClosed(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
