//! Running reports on behalf of a session.

use std::sync::Arc;

use adpulse_core::ReportQuery;
use adpulse_fetch::Deadline;
use adpulse_providers::{ReportOutcome, TieredReportClient};
use tracing::{debug, instrument, warn};

use crate::credential_store::CredentialStore;
use crate::error::StoreError;

/// Session-scoped query runner.
///
/// Loads the session's credential, runs the query and writes the credential
/// back if the client refreshed it. The session's refresh lock is held for
/// the whole call, so a concurrent request of the same session sees the
/// refreshed token instead of refreshing again.
#[derive(Debug, Clone)]
pub struct SessionReports {
    store: Arc<CredentialStore>,
}

impl SessionReports {
    /// Creates a runner over a credential store.
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Runs one query for a session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAuthenticated`] if the session holds no
    /// credential, or the client's error wrapped in [`StoreError::Report`].
    #[instrument(skip(self, client, query, deadline), fields(account = %query.account_id))]
    pub async fn run(
        &self,
        session_id: &str,
        client: &mut TieredReportClient,
        query: &ReportQuery,
        deadline: Deadline,
    ) -> Result<ReportOutcome, StoreError> {
        let lock = self.store.refresh_lock(session_id);
        let guard = lock.lock().await;
        let result = self.run_locked(session_id, client, query, deadline).await;
        drop(guard);

        self.store.release_lock(session_id, &lock);
        result
    }

    async fn run_locked(
        &self,
        session_id: &str,
        client: &mut TieredReportClient,
        query: &ReportQuery,
        deadline: Deadline,
    ) -> Result<ReportOutcome, StoreError> {
        let mut credential = self
            .store
            .load(session_id)
            .await?
            .ok_or_else(|| StoreError::NotAuthenticated(session_id.to_string()))?;
        let before = credential.access_token().to_string();

        let result = client.run_report(&mut credential, query, deadline).await;

        // A refresh can succeed even when the query then fails.
        if credential.access_token() != before {
            self.store.persist(session_id, &credential).await?;
            debug!("Refreshed credential written back to session");
        }

        result.map_err(|e| {
            if e.requires_reauthorization() {
                warn!(error = %e, "Session needs reauthorization");
            }
            StoreError::Report(e)
        })
    }
}
