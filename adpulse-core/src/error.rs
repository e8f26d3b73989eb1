//! Core error types for `AdPulse`.
//!
//! [`ReportError`] is the only error a caller of the report client sees.
//! Its [`ErrorKind`] tells the caller whether to prompt for
//! re-authorization or show a generic failure.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Scope Error
// ============================================================================

/// A required permission is missing from the credential.
///
/// Always detected locally; no network call has been made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// The credential carries no granted scopes at all.
    #[error("credential carries no granted scopes")]
    NoScopes,

    /// One or more required scopes were not granted.
    #[error("missing required scopes: {}", .missing.join(", "))]
    Missing {
        /// The required scopes that were not granted.
        missing: Vec<String>,
    },
}

// ============================================================================
// Auth Error
// ============================================================================

/// The credential is missing, unrefreshable, or was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No access token is present.
    #[error("missing token")]
    MissingToken,

    /// The credential expired and carries no refresh token.
    #[error("unrefreshable: credential expired and no refresh token is available")]
    Unrefreshable,

    /// The token endpoint refused the refresh exchange.
    #[error("token exchange rejected: {0}")]
    ExchangeRejected(String),

    /// The provider rejected the credential on a data call.
    #[error("credential rejected by provider: {0}")]
    Rejected(String),

    /// A required credential field is absent or malformed.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The token endpoint uses plain HTTP and insecure transport is not allowed.
    #[error("insecure token endpoint: {0}")]
    InsecureEndpoint(String),
}

// ============================================================================
// Failure Kind
// ============================================================================

/// Classification of a transport adapter failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network failure, deadline expiry, server error, or unreadable body.
    Unreachable,
    /// The transport could not be configured (bootstrap failure).
    ConfigInvalid,
    /// The provider rejected the credential.
    AuthRejected,
    /// The provider rejected the query.
    QueryRejected,
}

impl FailureKind {
    /// Returns the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::ConfigInvalid => "config invalid",
            Self::AuthRejected => "auth rejected",
            Self::QueryRejected => "query rejected",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Error Kind
// ============================================================================

/// Caller-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing permission, detected locally.
    ScopeError,
    /// Token missing, unrefreshable, or rejected.
    AuthError,
    /// Malformed query or invalid date range.
    QueryError,
    /// Network or configuration failure.
    TransportError,
    /// Anything that could not be classified.
    UnknownProviderError,
}

impl ErrorKind {
    /// Returns true if recovery requires the user to authorize again.
    pub fn requires_reauthorization(&self) -> bool {
        matches!(self, Self::ScopeError | Self::AuthError)
    }
}

// ============================================================================
// Report Error
// ============================================================================

/// Error returned by report operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// Missing permission.
    #[error("scope error: {0}")]
    Scope(#[from] ScopeError),

    /// Credential problem.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Malformed query or invalid date range.
    #[error("query error: {detail}")]
    Query {
        /// What was wrong with the query.
        detail: String,
    },

    /// Network or configuration failure.
    #[error("transport error ({kind}): {detail}")]
    Transport {
        /// The transport failure classification.
        kind: FailureKind,
        /// Diagnostic detail.
        detail: String,
    },

    /// Unclassified provider failure, original diagnostic preserved.
    #[error("unknown provider error: {detail}")]
    UnknownProvider {
        /// The original message.
        detail: String,
    },
}

impl ReportError {
    /// Creates a query error.
    pub fn query(detail: impl Into<String>) -> Self {
        Self::Query {
            detail: detail.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            detail: detail.into(),
        }
    }

    /// Creates an unreachable transport error.
    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self::transport(FailureKind::Unreachable, detail)
    }

    /// Creates an unknown provider error.
    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::UnknownProvider {
            detail: detail.into(),
        }
    }

    /// Returns the caller-facing category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Scope(_) => ErrorKind::ScopeError,
            Self::Auth(_) => ErrorKind::AuthError,
            Self::Query { .. } => ErrorKind::QueryError,
            Self::Transport { .. } => ErrorKind::TransportError,
            Self::UnknownProvider { .. } => ErrorKind::UnknownProviderError,
        }
    }

    /// Returns true if the caller should prompt for re-authorization.
    pub fn requires_reauthorization(&self) -> bool {
        self.kind().requires_reauthorization()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            ReportError::from(ScopeError::NoScopes).kind(),
            ErrorKind::ScopeError
        );
        assert_eq!(
            ReportError::from(AuthError::MissingToken).kind(),
            ErrorKind::AuthError
        );
        assert_eq!(ReportError::query("bad").kind(), ErrorKind::QueryError);
        assert_eq!(
            ReportError::unreachable("down").kind(),
            ErrorKind::TransportError
        );
        assert_eq!(
            ReportError::unknown("???").kind(),
            ErrorKind::UnknownProviderError
        );
    }

    #[test]
    fn test_reauthorization_split() {
        assert!(ReportError::from(AuthError::Unrefreshable).requires_reauthorization());
        assert!(ReportError::from(ScopeError::NoScopes).requires_reauthorization());
        assert!(!ReportError::query("bad").requires_reauthorization());
        assert!(!ReportError::unreachable("down").requires_reauthorization());
    }

    #[test]
    fn test_missing_scope_message() {
        let err = ScopeError::Missing {
            missing: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "missing required scopes: a, b");
    }

    #[test]
    fn test_unknown_preserves_detail() {
        let err = ReportError::unknown("code 42: weird");
        assert!(err.to_string().contains("code 42: weird"));
    }
}
