//! Session backends: where the host application keeps per-session data.
//!
//! The store only needs get/set/delete keyed by session identity. A write is
//! visible to the next read for the same session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use adpulse_core::StoredCredential;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::persistence::{load_json, save_json};

/// Get/set/delete of session credentials.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Reads the credential stored for a session.
    async fn get(&self, session_id: &str) -> Result<Option<StoredCredential>, StoreError>;

    /// Replaces the credential stored for a session.
    async fn set(&self, session_id: &str, credential: &StoredCredential) -> Result<(), StoreError>;

    /// Removes a session's credential. Removing an absent one is not an error.
    async fn delete(&self, session_id: &str) -> Result<(), StoreError>;
}

// ============================================================================
// Memory Backend
// ============================================================================

/// Process-local sessions.
#[derive(Debug, Default)]
pub struct MemorySessionBackend {
    sessions: RwLock<HashMap<String, StoredCredential>>,
}

impl MemorySessionBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions holding a credential.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if no session holds a credential.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionBackend for MemorySessionBackend {
    async fn get(&self, session_id: &str) -> Result<Option<StoredCredential>, StoreError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn set(&self, session_id: &str, credential: &StoredCredential) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), credential.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }
}

// ============================================================================
// File Backend
// ============================================================================

#[derive(Debug, Clone)]
enum Layout {
    /// One `<session>.json` per session.
    Directory(PathBuf),
    /// Every session maps to the same file.
    Single(PathBuf),
}

/// Sessions as JSON files on disk.
#[derive(Debug, Clone)]
pub struct FileSessionBackend {
    layout: Layout,
}

impl FileSessionBackend {
    /// One file per session inside `dir`.
    pub fn directory(dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: Layout::Directory(dir.into()),
        }
    }

    /// A single credential file shared by every session id.
    pub fn single_file(path: impl Into<PathBuf>) -> Self {
        Self {
            layout: Layout::Single(path.into()),
        }
    }

    /// File backing a session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the session id cannot be used as a
    /// file name.
    pub fn path_for(&self, session_id: &str) -> Result<PathBuf, StoreError> {
        match &self.layout {
            Layout::Single(path) => Ok(path.clone()),
            Layout::Directory(dir) => {
                let valid = !session_id.is_empty()
                    && session_id
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
                if !valid {
                    return Err(StoreError::Backend(format!(
                        "invalid session id: {session_id:?}"
                    )));
                }
                Ok(dir.join(format!("{session_id}.json")))
            }
        }
    }
}

async fn exists(path: &Path) -> Result<bool, StoreError> {
    Ok(tokio::fs::try_exists(path).await?)
}

#[async_trait]
impl SessionBackend for FileSessionBackend {
    #[instrument(skip(self))]
    async fn get(&self, session_id: &str) -> Result<Option<StoredCredential>, StoreError> {
        let path = self.path_for(session_id)?;
        if !exists(&path).await? {
            debug!(path = %path.display(), "No credential file");
            return Ok(None);
        }
        Ok(Some(load_json(&path).await?))
    }

    #[instrument(skip(self, credential))]
    async fn set(&self, session_id: &str, credential: &StoredCredential) -> Result<(), StoreError> {
        let path = self.path_for(session_id)?;
        save_json(&path, credential).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        let path = self.path_for(session_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
