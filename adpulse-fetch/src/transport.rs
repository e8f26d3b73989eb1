//! Transport adapter trait and types.
//!
//! An adapter executes one report query over one transport and returns the
//! provider-shaped raw result. The pipeline decides which adapter runs.

use std::fmt;

use adpulse_core::{Credential, ReportQuery};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::Deadline;
use crate::error::FetchError;

// ============================================================================
// Adapter Kind
// ============================================================================

/// Which tier an adapter serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// The native RPC transport.
    Primary,
    /// The HTTP/JSON transport.
    Fallback,
}

impl AdapterKind {
    /// Returns the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Transport Adapter Trait
// ============================================================================

/// Executes report queries over one transport.
///
/// Both adapters of a pipeline produce the same `Output` type so the caller
/// can normalize them in one place.
///
/// ## Implementing an Adapter
///
/// ```ignore
/// struct RestAdapter { /* ... */ }
///
/// #[async_trait]
/// impl TransportAdapter for RestAdapter {
///     type Output = RawResult;
///
///     fn id(&self) -> &str {
///         "ads.rest"
///     }
///
///     fn kind(&self) -> AdapterKind {
///         AdapterKind::Fallback
///     }
///
///     async fn execute(
///         &self,
///         credential: &Credential,
///         query: &ReportQuery,
///         deadline: Deadline,
///     ) -> Result<RawResult, FetchError> {
///         // POST the query, map non-2xx statuses to TransportFailure
///     }
/// }
/// ```
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    /// Provider-shaped raw result.
    type Output: Send;

    /// Unique identifier for this adapter.
    fn id(&self) -> &str;

    /// The tier this adapter serves.
    fn kind(&self) -> AdapterKind;

    /// Runs one query. Must give up once `deadline` passes.
    async fn execute(
        &self,
        credential: &Credential,
        query: &ReportQuery,
        deadline: Deadline,
    ) -> Result<Self::Output, FetchError>;
}
