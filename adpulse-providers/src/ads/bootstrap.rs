//! Bootstrap record for the native transport.
//!
//! The bridge reads its configuration from a YAML file:
//!
//! ```yaml
//! developer_token: "..."
//! login_customer_id: "1112223333"
//! linked_customer_id: null
//! client_id: "..."
//! client_secret: "..."
//! refresh_token: "..."
//! api_version: v17
//! ```
//!
//! The record embeds the refresh token, so it is rewritten whenever the
//! credential is refreshed, readable only by the owner, and removed when the
//! adapter is dropped. The file gets a random name and is created
//! exclusively, so a file planted at a guessable path is never reused.

use std::fmt;
use std::fs;
use std::io::{Seek, Write};
use std::path::Path;

use adpulse_core::Credential;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use super::error::BootstrapError;
use super::settings::AdsSettings;

/// File name prefix of bootstrap records.
const RECORD_PREFIX: &str = "adpulse-bootstrap-";

// ============================================================================
// Bootstrap Record
// ============================================================================

/// Configuration consumed by the native transport at start-up.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapRecord {
    /// Developer token.
    pub developer_token: String,
    /// Manager account, digits only.
    pub login_customer_id: Option<String>,
    /// Linked account, digits only.
    pub linked_customer_id: Option<String>,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Current refresh token.
    pub refresh_token: String,
    /// API version path segment.
    pub api_version: String,
}

impl BootstrapRecord {
    /// Builds the record from settings and the session's credential.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::MissingSetting`] if the developer token or
    /// refresh token is absent, or a configured account id is not numeric.
    pub fn from_settings(
        settings: &AdsSettings,
        credential: &Credential,
    ) -> Result<Self, BootstrapError> {
        let developer_token = settings
            .require_developer_token()
            .map_err(|_| BootstrapError::MissingSetting("developer_token"))?;
        let refresh_token = credential
            .refresh_token()
            .ok_or(BootstrapError::MissingSetting("refresh_token"))?;
        let login_customer_id = settings
            .login_customer()
            .map_err(|_| BootstrapError::MissingSetting("login_customer_id"))?;
        let linked_customer_id = settings
            .linked_customer()
            .map_err(|_| BootstrapError::MissingSetting("linked_customer_id"))?;

        Ok(Self {
            developer_token: developer_token.to_string(),
            login_customer_id: login_customer_id.map(|id| id.as_str().to_string()),
            linked_customer_id: linked_customer_id.map(|id| id.as_str().to_string()),
            client_id: credential.client_id().to_string(),
            client_secret: credential.client_secret().to_string(),
            refresh_token: refresh_token.to_string(),
            api_version: settings.api_version.clone(),
        })
    }
}

impl fmt::Debug for BootstrapRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapRecord")
            .field("login_customer_id", &self.login_customer_id)
            .field("linked_customer_id", &self.linked_customer_id)
            .field("client_id", &self.client_id)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bootstrap File
// ============================================================================

/// A bootstrap record on disk. Removed on drop.
#[derive(Debug)]
pub struct BootstrapFile {
    file: NamedTempFile,
    record: BootstrapRecord,
}

impl BootstrapFile {
    /// Writes a record into `dir` (the system temp dir if `None`).
    ///
    /// The file is created exclusively under a random name, owner
    /// read/write only on unix.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or written.
    #[instrument(skip(record))]
    pub fn create(dir: Option<&Path>, record: BootstrapRecord) -> Result<Self, BootstrapError> {
        let dir = dir.map_or_else(std::env::temp_dir, Path::to_path_buf);
        fs::create_dir_all(&dir)?;

        let mut file = tempfile::Builder::new()
            .prefix(RECORD_PREFIX)
            .suffix(".yaml")
            .tempfile_in(&dir)?;
        write_record(&mut file, &record)?;

        debug!(path = %file.path().display(), "Bootstrap record written");
        Ok(Self { file, record })
    }

    /// Rewrites the record if it changed. Returns true if it was rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or written.
    pub fn update(&mut self, record: BootstrapRecord) -> Result<bool, BootstrapError> {
        if record == self.record {
            return Ok(false);
        }
        write_record(&mut self.file, &record)?;
        self.record = record;
        debug!(path = %self.path().display(), "Bootstrap record regenerated");
        Ok(true)
    }

    /// Location of the record.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// The record as last written.
    pub fn record(&self) -> &BootstrapRecord {
        &self.record
    }
}

/// Replaces the file's content through the handle opened at creation.
fn write_record(file: &mut NamedTempFile, record: &BootstrapRecord) -> Result<(), BootstrapError> {
    let content = serde_yaml::to_string(record)?;

    let handle = file.as_file_mut();
    handle.set_len(0)?;
    handle.rewind()?;
    handle.write_all(content.as_bytes())?;
    handle.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AdsSettings {
        AdsSettings {
            developer_token: Some("dev-token".to_string()),
            login_customer_id: Some("111-222-3333".to_string()),
            ..AdsSettings::default()
        }
    }

    fn credential(refresh: &str) -> Credential {
        Credential::builder()
            .access_token("access")
            .refresh_token(refresh)
            .token_endpoint("https://oauth2.example.com/token")
            .client("client-id", "client-secret")
            .scope("scope")
            .build()
            .unwrap()
    }

    #[test]
    fn test_record_from_settings() {
        let record = BootstrapRecord::from_settings(&settings(), &credential("r1")).unwrap();
        assert_eq!(record.developer_token, "dev-token");
        assert_eq!(record.login_customer_id.as_deref(), Some("1112223333"));
        assert_eq!(record.refresh_token, "r1");
        assert_eq!(record.api_version, "v17");
    }

    #[test]
    fn test_record_requires_developer_token() {
        let result = BootstrapRecord::from_settings(&AdsSettings::default(), &credential("r1"));
        assert!(matches!(
            result,
            Err(BootstrapError::MissingSetting("developer_token"))
        ));
    }

    #[test]
    fn test_file_written_updated_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let record = BootstrapRecord::from_settings(&settings(), &credential("r1")).unwrap();

        let mut file = BootstrapFile::create(Some(dir.path()), record.clone()).unwrap();
        let path = file.path().to_path_buf();
        let on_disk: BootstrapRecord =
            serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, record);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        assert!(!file.update(record).unwrap());
        let rotated = BootstrapRecord::from_settings(&settings(), &credential("r2")).unwrap();
        assert!(file.update(rotated).unwrap());
        assert!(fs::read_to_string(&path).unwrap().contains("r2"));

        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_planted_file_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let planted = dir
            .path()
            .join(format!("{RECORD_PREFIX}{}-0.yaml", std::process::id()));
        fs::write(&planted, "").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&planted, fs::Permissions::from_mode(0o644)).unwrap();
        }

        let record = BootstrapRecord::from_settings(&settings(), &credential("r1")).unwrap();
        let first = BootstrapFile::create(Some(dir.path()), record.clone()).unwrap();
        let second = BootstrapFile::create(Some(dir.path()), record).unwrap();

        assert_ne!(first.path(), planted.as_path());
        assert_ne!(first.path(), second.path());
        assert_eq!(fs::read_to_string(&planted).unwrap(), "");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(first.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
