//! Session-scoped credential storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use adpulse_core::Credential;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument};

use crate::backend::SessionBackend;
use crate::error::StoreError;

/// Loads, persists and clears credentials per session.
///
/// Also hands out one refresh lock per session, so two requests of the same
/// session never refresh concurrently while different sessions never wait on
/// each other.
pub struct CredentialStore {
    backend: Arc<dyn SessionBackend>,
    allow_insecure_http: bool,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl CredentialStore {
    /// Creates a store over a session backend.
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            allow_insecure_http: false,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Accepts stored credentials with `http://` token endpoints.
    #[must_use]
    pub fn with_insecure_http(mut self, allow: bool) -> Self {
        self.allow_insecure_http = allow;
        self
    }

    /// Loads and validates a session's credential.
    ///
    /// # Errors
    ///
    /// Returns a backend error, or a report error if the stored form does
    /// not validate.
    #[instrument(skip(self))]
    pub async fn load(&self, session_id: &str) -> Result<Option<Credential>, StoreError> {
        let Some(stored) = self.backend.get(session_id).await? else {
            debug!("No credential in session");
            return Ok(None);
        };
        let credential = Credential::from_stored(stored, self.allow_insecure_http)?;
        Ok(Some(credential))
    }

    /// Writes a credential back to the session.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the write fails.
    #[instrument(skip(self, credential))]
    pub async fn persist(&self, session_id: &str, credential: &Credential) -> Result<(), StoreError> {
        self.backend.set(session_id, &credential.to_stored()).await?;
        debug!(expires_at = ?credential.expires_at(), "Credential persisted");
        Ok(())
    }

    /// Removes a session's credential and its refresh lock.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the delete fails.
    #[instrument(skip(self))]
    pub async fn clear(&self, session_id: &str) -> Result<(), StoreError> {
        self.backend.delete(session_id).await?;
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
        info!("Session credential cleared");
        Ok(())
    }

    /// Returns true if the session holds a valid credential.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the read fails. An invalid stored
    /// credential counts as not authenticated.
    pub async fn is_authenticated(&self, session_id: &str) -> Result<bool, StoreError> {
        match self.load(session_id).await {
            Ok(credential) => Ok(credential.is_some()),
            Err(StoreError::Report(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The session's refresh lock.
    pub fn refresh_lock(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(session_id.to_string()).or_default())
    }

    /// Drops the session's refresh lock from the map once `lock` is its
    /// only holder outside the map. Returns true if it was dropped.
    pub fn release_lock(&self, session_id: &str, lock: &Arc<AsyncMutex<()>>) -> bool {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = locks
            .get(session_id)
            .is_some_and(|held| Arc::ptr_eq(held, lock) && Arc::strong_count(lock) == 2);
        if idle {
            locks.remove(session_id);
        }
        idle
    }

    // ========================================================================
    // Session-facing aliases
    // ========================================================================

    /// Alias of [`Self::load`].
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub async fn get_credential(&self, session_id: &str) -> Result<Option<Credential>, StoreError> {
        self.load(session_id).await
    }

    /// Alias of [`Self::persist`].
    ///
    /// # Errors
    ///
    /// See [`Self::persist`].
    pub async fn set_credential(
        &self,
        session_id: &str,
        credential: &Credential,
    ) -> Result<(), StoreError> {
        self.persist(session_id, credential).await
    }

    /// Alias of [`Self::clear`].
    ///
    /// # Errors
    ///
    /// See [`Self::clear`].
    pub async fn clear_credential(&self, session_id: &str) -> Result<(), StoreError> {
        self.clear(session_id).await
    }

    /// Number of sessions with a live refresh lock.
    pub fn lock_count(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("allow_insecure_http", &self.allow_insecure_http)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use adpulse_core::scope::ADWORDS;
    use adpulse_core::{AuthError, ReportError, StoredCredential};

    use super::*;
    use crate::backend::MemorySessionBackend;

    fn credential(token: &str) -> Credential {
        Credential::builder()
            .access_token(token)
            .refresh_token("refresh")
            .token_endpoint("https://oauth2.example.com/token")
            .client("id", "secret")
            .scope(ADWORDS)
            .build()
            .unwrap()
    }

    fn store() -> (CredentialStore, Arc<MemorySessionBackend>) {
        let backend = Arc::new(MemorySessionBackend::new());
        (CredentialStore::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_persist_then_load() {
        let (store, _) = store();
        assert!(store.load("s1").await.unwrap().is_none());

        store.persist("s1", &credential("a")).await.unwrap();
        store.set_credential("s1", &credential("b")).await.unwrap();

        let loaded = store.get_credential("s1").await.unwrap().unwrap();
        assert_eq!(loaded.access_token(), "b");
        assert!(store.is_authenticated("s1").await.unwrap());
        assert!(!store.is_authenticated("s2").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_stored_credential() {
        let (store, backend) = store();
        backend
            .set("s1", &StoredCredential::default())
            .await
            .unwrap();

        let err = store.load("s1").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Report(ReportError::Auth(AuthError::MissingToken))
        ));
        assert!(!store.is_authenticated("s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_removes_credential_and_lock() {
        let (store, _) = store();
        store.persist("s1", &credential("a")).await.unwrap();
        let _lock = store.refresh_lock("s1");
        assert_eq!(store.lock_count(), 1);

        store.clear_credential("s1").await.unwrap();

        assert!(store.load("s1").await.unwrap().is_none());
        assert_eq!(store.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_locks_are_per_session() {
        let (store, _) = store();
        let a1 = store.refresh_lock("a");
        let a2 = store.refresh_lock("a");
        let b = store.refresh_lock("b");

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));

        let _held = a1.lock().await;
        assert!(a2.try_lock().is_err());
        assert!(b.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_release_lock_only_when_idle() {
        let (store, _) = store();
        let first = store.refresh_lock("s1");
        let waiting = store.refresh_lock("s1");

        assert!(!store.release_lock("s1", &first));
        assert_eq!(store.lock_count(), 1);

        drop(first);
        assert!(store.release_lock("s1", &waiting));
        assert_eq!(store.lock_count(), 0);
    }
}
