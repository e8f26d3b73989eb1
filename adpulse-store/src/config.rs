//! Configuration management.
//!
//! Read from `<config_dir>/adpulse/config.json`, then overridden from the
//! environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `ADPULSE_CLIENT_ID` | `client_id` |
//! | `ADPULSE_CLIENT_SECRET` | `client_secret` |
//! | `ADPULSE_DEVELOPER_TOKEN` | `ads.developer_token` |
//! | `ADPULSE_LOGIN_CUSTOMER_ID` | `ads.login_customer_id` |
//! | `ADPULSE_ACCOUNT_ID` | `account_id` |
//! | `ADPULSE_LOG_LEVEL` | `log_level` |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use adpulse_core::{StoredCredential, normalize_account_id};
use adpulse_fetch::TransportSettings;
use adpulse_providers::AdsSettings;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::default_config_path;

/// Default token exchange endpoint.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Application configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OAuth client ID.
    pub client_id: Option<String>,
    /// OAuth client secret.
    pub client_secret: Option<String>,
    /// Token exchange endpoint.
    pub token_endpoint: String,
    /// Account queried when none is given.
    pub account_id: Option<String>,
    /// Log level.
    pub log_level: String,
    /// Credential file used when none is given.
    pub credentials_path: Option<PathBuf>,
    /// Ads provider settings.
    pub ads: AdsSettings,
    /// Transport settings.
    pub transport: TransportSettings,
    /// Deployment-specific account substitution, normalized id to
    /// normalized id.
    pub account_overrides: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            account_id: None,
            log_level: "info".to_string(),
            credentials_path: None,
            ads: AdsSettings::default(),
            transport: TransportSettings::default(),
            account_overrides: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        default_config_path()
    }

    /// Loads from the default path and applies the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path())
            .map(|config| config.with_env(|key| std::env::var(key).ok()))
    }

    /// Loads configuration from a specific path. A missing file yields the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Saves configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// Blank values are ignored.
    #[must_use]
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("ADPULSE_CLIENT_ID") {
            self.client_id = Some(v);
        }
        if let Some(v) = get("ADPULSE_CLIENT_SECRET") {
            self.client_secret = Some(v);
        }
        if let Some(v) = get("ADPULSE_DEVELOPER_TOKEN") {
            self.ads.developer_token = Some(v);
        }
        if let Some(v) = get("ADPULSE_LOGIN_CUSTOMER_ID") {
            self.ads.login_customer_id = Some(v);
        }
        if let Some(v) = get("ADPULSE_ACCOUNT_ID") {
            self.account_id = Some(v);
        }
        if let Some(v) = get("ADPULSE_LOG_LEVEL") {
            self.log_level = v;
        }
        self
    }

    /// Resolves the account to query: `explicit` or the configured default,
    /// normalized, then substituted through `account_overrides`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if neither is set.
    pub fn resolve_account(&self, explicit: Option<&str>) -> Result<String, StoreError> {
        let raw = explicit
            .or(self.account_id.as_deref())
            .ok_or_else(|| StoreError::Config("no account id given or configured".to_string()))?;
        let normalized = normalize_account_id(raw);

        let resolved = self
            .account_overrides
            .iter()
            .find(|(from, _)| normalize_account_id(from) == normalized)
            .map_or_else(|| normalized.clone(), |(_, to)| normalize_account_id(to));
        if resolved != normalized {
            debug!(from = %normalized, to = %resolved, "Account override applied");
        }
        Ok(resolved)
    }

    /// Fills OAuth client fields a stored credential leaves out.
    ///
    /// Returns true if anything changed.
    pub fn fill_stored_credential(&self, stored: &mut StoredCredential) -> bool {
        let mut changed = false;
        if stored.token_uri.is_none() {
            stored.token_uri = Some(self.token_endpoint.clone());
            changed = true;
        }
        if stored.client_id.is_none() && self.client_id.is_some() {
            stored.client_id.clone_from(&self.client_id);
            changed = true;
        }
        if stored.client_secret.is_none() && self.client_secret.is_some() {
            stored.client_secret.clone_from(&self.client_secret);
            changed = true;
        }
        changed
    }

    /// A copy with secrets masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.client_secret = config.client_secret.as_deref().map(mask_secret);
        config.ads.developer_token = config.ads.developer_token.as_deref().map(mask_secret);
        config
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("token_endpoint", &self.token_endpoint)
            .field("account_id", &self.account_id)
            .field("log_level", &self.log_level)
            .field("credentials_path", &self.credentials_path)
            .field("ads", &self.ads)
            .field("transport", &self.transport)
            .field("account_overrides", &self.account_overrides)
            .finish()
    }
}

/// Masks all but the last four characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
