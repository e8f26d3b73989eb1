//! Store error types.

use adpulse_core::ReportError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No credential is stored for the session.
    #[error("Session not authenticated: {0}")]
    NotAuthenticated(String),

    /// The session backend failed.
    #[error("Session backend error: {0}")]
    Backend(String),

    /// A report or credential error surfaced through the store.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns true if the user has to sign in again.
    pub fn requires_reauthorization(&self) -> bool {
        match self {
            StoreError::NotAuthenticated(_) => true,
            StoreError::Report(e) => e.requires_reauthorization(),
            _ => false,
        }
    }
}
