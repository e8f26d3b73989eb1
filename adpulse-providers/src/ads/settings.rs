//! Provider settings passed to both adapters at construction.

use std::fmt;
use std::path::PathBuf;

use adpulse_core::AccountId;
use adpulse_fetch::TransportFailure;
use serde::{Deserialize, Serialize};

/// Default API version segment.
pub const DEFAULT_API_VERSION: &str = "v17";

/// Default REST base URL.
pub const DEFAULT_REST_BASE_URL: &str = "https://googleads.googleapis.com";

/// Default native bridge command.
pub const DEFAULT_RPC_COMMAND: &str = "adpulse-ads-bridge";

/// Ads provider settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsSettings {
    /// Developer token sent with every request.
    pub developer_token: Option<String>,
    /// Manager account the requests are made through.
    pub login_customer_id: Option<String>,
    /// Linked account, for third-party app analytics links.
    pub linked_customer_id: Option<String>,
    /// API version path segment, e.g. `v17`.
    pub api_version: String,
    /// Base URL of the REST transport.
    pub rest_base_url: String,
    /// Native bridge command for the primary transport.
    pub rpc_command: String,
    /// Directory for the primary transport's bootstrap record.
    pub bootstrap_dir: Option<PathBuf>,
}

impl Default for AdsSettings {
    fn default() -> Self {
        Self {
            developer_token: None,
            login_customer_id: None,
            linked_customer_id: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            rest_base_url: DEFAULT_REST_BASE_URL.to_string(),
            rpc_command: DEFAULT_RPC_COMMAND.to_string(),
            bootstrap_dir: None,
        }
    }
}

impl AdsSettings {
    /// Returns the developer token, failing if it is not configured.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigInvalid` failure if the token is missing or blank.
    pub fn require_developer_token(&self) -> Result<&str, TransportFailure> {
        self.developer_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TransportFailure::config_invalid("developer token is not configured"))
    }

    /// Normalized manager account id, if configured.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigInvalid` failure if the configured id is not numeric.
    pub fn login_customer(&self) -> Result<Option<AccountId>, TransportFailure> {
        parse_optional(self.login_customer_id.as_deref(), "login_customer_id")
    }

    /// Normalized linked account id, if configured.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigInvalid` failure if the configured id is not numeric.
    pub fn linked_customer(&self) -> Result<Option<AccountId>, TransportFailure> {
        parse_optional(self.linked_customer_id.as_deref(), "linked_customer_id")
    }
}

fn parse_optional(raw: Option<&str>, key: &str) -> Result<Option<AccountId>, TransportFailure> {
    match raw.filter(|r| !r.trim().is_empty()) {
        Some(raw) => AccountId::parse(raw)
            .map(Some)
            .map_err(|e| TransportFailure::config_invalid(format!("{key}: {e}"))),
        None => Ok(None),
    }
}

impl fmt::Debug for AdsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdsSettings")
            .field(
                "developer_token",
                &self.developer_token.as_ref().map(|_| "<redacted>"),
            )
            .field("login_customer_id", &self.login_customer_id)
            .field("linked_customer_id", &self.linked_customer_id)
            .field("api_version", &self.api_version)
            .field("rest_base_url", &self.rest_base_url)
            .field("rpc_command", &self.rpc_command)
            .field("bootstrap_dir", &self.bootstrap_dir)
            .finish()
    }
}
