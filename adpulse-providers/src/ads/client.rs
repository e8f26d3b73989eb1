//! The entry point the rest of the application calls.

use std::sync::Arc;

use adpulse_core::{Credential, ReportError, ReportQuery, ReportRow, ScopeValidator};
use adpulse_fetch::{
    AdapterKind, BoxedAdapter, Deadline, ErrorClassifier, FetchAttempt, FetchError,
    TieredClientState, TieredPipeline, TransportSettings,
};
use tracing::{debug, info, instrument, warn};

use super::normalizer::ResponseNormalizer;
use super::oauth::{CredentialRefresher, OAuthTokenExchange};
use super::primary::PrimaryAdapter;
use super::raw::ProviderRawResult;
use super::rest::FallbackAdapter;
use super::settings::AdsSettings;

/// Rows returned by [`TieredReportClient::run_report`] and how they were
/// obtained.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    /// Canonical rows.
    pub rows: Vec<ReportRow>,
    /// Tier that produced the rows.
    pub source: AdapterKind,
    /// True if the credential was refreshed and must be persisted.
    pub refreshed: bool,
    /// Every adapter attempt made for this call.
    pub attempts: Vec<FetchAttempt>,
}

/// Refresh, scope gate, tiered fetch and normalization for one client
/// instance.
///
/// Fallback is sticky for the lifetime of the instance, so one instance is
/// meant to serve a single inbound request.
pub struct TieredReportClient {
    pipeline: TieredPipeline<ProviderRawResult>,
    refresher: CredentialRefresher,
    scopes: ScopeValidator,
    transport: TransportSettings,
}

impl TieredReportClient {
    /// Builds both adapters. A primary bootstrap failure is logged and the
    /// client starts in fallback.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigInvalid` transport error if the HTTP clients cannot
    /// be built.
    #[instrument(skip_all)]
    pub async fn connect(
        ads: AdsSettings,
        transport: TransportSettings,
        credential: &Credential,
    ) -> Result<Self, ReportError> {
        let classify_http = |e| ErrorClassifier::classify(&FetchError::Http(e));
        let exchange = OAuthTokenExchange::new(&transport).map_err(classify_http)?;
        let fallback = FallbackAdapter::new(ads.clone(), &transport).map_err(classify_http)?;

        let primary: Option<BoxedAdapter<ProviderRawResult>> =
            match PrimaryAdapter::bootstrap(&ads, credential, transport.deadline()).await {
                Ok(adapter) => Some(Box::new(adapter)),
                Err(failure) => {
                    warn!(kind = %failure.kind, detail = %failure.detail, "Starting in fallback");
                    None
                }
            };

        let scopes = ScopeValidator::reporting();
        Ok(Self::from_parts(
            primary,
            Box::new(fallback),
            CredentialRefresher::new(Arc::new(exchange), scopes.clone()),
            scopes,
            transport,
        ))
    }

    /// Assembles a client from prebuilt parts.
    pub fn from_parts(
        primary: Option<BoxedAdapter<ProviderRawResult>>,
        fallback: BoxedAdapter<ProviderRawResult>,
        refresher: CredentialRefresher,
        scopes: ScopeValidator,
        transport: TransportSettings,
    ) -> Self {
        Self {
            pipeline: TieredPipeline::new(primary, fallback),
            refresher,
            scopes,
            transport,
        }
    }

    /// Current routing state.
    pub fn state(&self) -> TieredClientState {
        self.pipeline.state()
    }

    /// Runs a query with the default deadline from the transport settings.
    ///
    /// # Errors
    ///
    /// See [`Self::run_report`].
    pub async fn run(
        &mut self,
        credential: &mut Credential,
        query: &ReportQuery,
    ) -> Result<ReportOutcome, ReportError> {
        let deadline = self.transport.deadline();
        self.run_report(credential, query, deadline).await
    }

    /// Runs one query.
    ///
    /// Scopes are checked before any network call. The credential is then
    /// refreshed in place if expired; `refreshed` in the outcome tells the
    /// caller to persist it.
    ///
    /// # Errors
    ///
    /// - [`ReportError::Query`] if the query is malformed
    /// - [`ReportError::Scope`] if a required scope is missing
    /// - [`ReportError::Auth`] if the credential cannot be made fresh
    /// - the fallback tier's classified error if every tier failed
    #[instrument(skip_all, fields(account = %query.account_id, routing = ?self.state().routing()))]
    pub async fn run_report(
        &mut self,
        credential: &mut Credential,
        query: &ReportQuery,
        deadline: Deadline,
    ) -> Result<ReportOutcome, ReportError> {
        query.validate()?;
        self.scopes.validate(credential)?;

        let refreshed = self
            .refresher
            .ensure_fresh(credential, deadline)
            .await?
            .is_refreshed();

        let outcome = self.pipeline.execute(credential, query, deadline).await;
        let attempts = outcome.attempts;
        let fetched = outcome.result?;

        let rows = ResponseNormalizer::normalize(&fetched.output, fetched.kind, query)?;
        info!(
            rows = rows.len(),
            adapter = %fetched.adapter_id,
            attempts = attempts.len(),
            "Report completed"
        );
        debug!(refreshed, "Credential freshness");

        Ok(ReportOutcome {
            rows,
            source: fetched.kind,
            refreshed,
            attempts,
        })
    }
}

impl std::fmt::Debug for TieredReportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredReportClient")
            .field("state", &self.pipeline.state())
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}
