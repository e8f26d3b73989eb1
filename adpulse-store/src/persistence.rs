//! File persistence helpers.
//!
//! Credential and config files hold secrets, so everything written here is
//! owner read/write only.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - macOS: `~/Library/Application Support/adpulse`
/// - Linux: `~/.config/adpulse`
/// - Windows: `%APPDATA%\adpulse`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|c| c.join("adpulse"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the default config file path.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.json")
}

/// Returns the default directory for per-session credential files.
pub fn default_sessions_dir() -> PathBuf {
    default_config_dir().join("sessions")
}

// ============================================================================
// File Operations
// ============================================================================

/// Saves data to a JSON file.
///
/// Creates parent directories, writes a temp file with mode 0600 and renames
/// it over the target.
pub async fn save_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving JSON file");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent).await?;
    }

    let json = serde_json::to_string_pretty(data)?;

    let temp_path = path.with_extension("json.tmp");
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(&temp_path).await?;
    file.write_all(json.as_bytes()).await?;
    file.flush().await?;
    drop(file);
    tokio::fs::rename(&temp_path, path).await?;

    debug!(path = %path.display(), "JSON file saved");
    Ok(())
}

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading JSON file");

    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_json::from_str(&content)?;
    Ok(data)
}

/// Ensures a directory exists, owner-only on unix when created here.
pub async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    if tokio::fs::try_exists(path).await? {
        return Ok(());
    }
    debug!(path = %path.display(), "Creating directory");
    tokio::fs::create_dir_all(path).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).await?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        assert!(default_config_path().ends_with("adpulse/config.json"));
        assert!(default_sessions_dir().ends_with("adpulse/sessions"));
    }

    #[tokio::test]
    async fn test_save_creates_parent_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("deeply").join("nested").join("test.json");

        save_json(&nested, &serde_json::json!({"key": "value"})).await.unwrap();

        let loaded: serde_json::Value = load_json(&nested).await.unwrap();
        assert_eq!(loaded["key"], "value");
        assert!(!nested.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let result: Result<serde_json::Value, _> =
            load_json(Path::new("/nonexistent/path/config.json")).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("secret.json");
        save_json(&path, &serde_json::json!({"token": "x"})).await.unwrap();

        let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "File should have 0600 permissions");
    }
}
