//! Session-scoped reports: persistence after refresh and per-session
//! single-flight refresh.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use adpulse_core::scope::ADWORDS;
use adpulse_core::{Credential, DateRange, ReportQuery, ScopeValidator, TokenGrant};
use adpulse_fetch::{
    AdapterKind, Deadline, FetchError, TransportAdapter, TransportFailure, TransportSettings,
};
use adpulse_providers::ads::RestSearchResult;
use adpulse_providers::{CredentialRefresher, ProviderRawResult, TieredReportClient, TokenExchange};
use adpulse_store::{CredentialStore, MemorySessionBackend, SessionReports, StoreError};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;

// ============================================================================
// Mocks
// ============================================================================

struct CountingExchange {
    calls: AtomicUsize,
}

#[async_trait]
impl TokenExchange for CountingExchange {
    async fn exchange(&self, _credential: &Credential) -> Result<TokenGrant, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        Ok(TokenGrant::from_expires_in(
            format!("fresh-{n}"),
            Some(3600),
            Utc::now(),
        ))
    }
}

struct RestStub {
    fail: bool,
}

#[async_trait]
impl TransportAdapter for RestStub {
    type Output = ProviderRawResult;

    fn id(&self) -> &str {
        "rest-stub"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Fallback
    }

    async fn execute(
        &self,
        _credential: &Credential,
        _query: &ReportQuery,
        _deadline: Deadline,
    ) -> Result<ProviderRawResult, FetchError> {
        if self.fail {
            return Err(TransportFailure::unreachable("503").into());
        }
        Ok(ProviderRawResult::Rest(RestSearchResult {
            results: vec![json!({
                "segments": {"date": "2024-05-01"},
                "metrics": {"activeUsers": "5", "newUsers": "1"}
            })],
        }))
    }
}

fn client(exchange: &Arc<CountingExchange>, fail: bool) -> TieredReportClient {
    let scopes = ScopeValidator::reporting();
    let exchange: Arc<dyn TokenExchange> = exchange.clone();
    TieredReportClient::from_parts(
        None,
        Box::new(RestStub { fail }),
        CredentialRefresher::new(exchange, scopes.clone()),
        scopes,
        TransportSettings::default(),
    )
}

fn expired_credential() -> Credential {
    Credential::builder()
        .access_token("stale")
        .refresh_token("refresh")
        .token_endpoint("https://oauth2.example.com/token")
        .client("id", "secret")
        .scope(ADWORDS)
        .expires_at(Utc::now() - Duration::minutes(1))
        .build()
        .unwrap()
}

fn query() -> ReportQuery {
    ReportQuery::active_users("123-456-7890", DateRange::last_days(7)).unwrap()
}

fn deadline() -> Deadline {
    Deadline::after(StdDuration::from_secs(5))
}

async fn setup() -> (SessionReports, Arc<CountingExchange>) {
    let store = Arc::new(CredentialStore::new(Arc::new(MemorySessionBackend::new())));
    store.persist("alice", &expired_credential()).await.unwrap();
    let exchange = Arc::new(CountingExchange {
        calls: AtomicUsize::new(0),
    });
    (SessionReports::new(store), exchange)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_refreshed_credential_is_persisted() {
    let (reports, exchange) = setup().await;

    let outcome = reports
        .run("alice", &mut client(&exchange, false), &query(), deadline())
        .await
        .unwrap();

    assert!(outcome.refreshed);
    assert_eq!(outcome.rows.len(), 1);
    let stored = reports.store().load("alice").await.unwrap().unwrap();
    assert_eq!(stored.access_token(), "fresh-1");
    assert!(stored.expires_at().unwrap() > Utc::now());
}

#[tokio::test]
async fn test_refresh_is_persisted_even_if_query_fails() {
    let (reports, exchange) = setup().await;

    let err = reports
        .run("alice", &mut client(&exchange, true), &query(), deadline())
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Report(_)));
    assert!(!err.requires_reauthorization());
    let stored = reports.store().load("alice").await.unwrap().unwrap();
    assert_eq!(stored.access_token(), "fresh-1");
}

#[tokio::test]
async fn test_concurrent_requests_refresh_once() {
    let (reports, exchange) = setup().await;
    let mut first = client(&exchange, false);
    let mut second = client(&exchange, false);

    let (query_a, query_b) = (query(), query());
    let (a, b) = tokio::join!(
        reports.run("alice", &mut first, &query_a, deadline()),
        reports.run("alice", &mut second, &query_b, deadline()),
    );

    assert!(a.unwrap().refreshed ^ b.unwrap().refreshed);
    assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
    assert_eq!(reports.store().lock_count(), 0);
}

#[tokio::test]
async fn test_finished_sessions_leave_no_lock_behind() {
    let (reports, exchange) = setup().await;

    reports
        .run("alice", &mut client(&exchange, false), &query(), deadline())
        .await
        .unwrap();
    let _ = reports
        .run("mallory", &mut client(&exchange, false), &query(), deadline())
        .await;

    assert_eq!(reports.store().lock_count(), 0);
}

#[tokio::test]
async fn test_unknown_session_is_not_authenticated() {
    let (reports, exchange) = setup().await;

    let err = reports
        .run("mallory", &mut client(&exchange, false), &query(), deadline())
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::NotAuthenticated(ref s) if s == "mallory"));
    assert!(err.requires_reauthorization());
    assert_eq!(exchange.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cleared_session_is_not_authenticated() {
    let (reports, exchange) = setup().await;
    reports.store().clear_credential("alice").await.unwrap();

    assert!(!reports.store().is_authenticated("alice").await.unwrap());
    let err = reports
        .run("alice", &mut client(&exchange, false), &query(), deadline())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotAuthenticated(_)));
}
