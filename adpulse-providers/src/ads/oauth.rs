//! Token exchange and credential freshness.
//!
//! # Token endpoint
//!
//! ```text
//! POST <token_endpoint>
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=refresh_token&client_id=...&client_secret=...&refresh_token=...
//! ```
//!
//! A successful response carries `access_token` and `expires_in`, and may
//! restate `scope` or rotate `refresh_token`.

use std::sync::Arc;

use adpulse_core::{
    AuthError, Credential, FailureKind, ReportError, ScopeValidator, TokenGrant,
    normalize_account_id,
};
use adpulse_fetch::{
    Deadline, ErrorClassifier, FetchError, HttpClient, HttpError, TransportFailure,
    TransportSettings,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

// ============================================================================
// Token Exchange
// ============================================================================

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Performs one exchange.
    ///
    /// A rejection by the endpoint is reported as an `AuthRejected`
    /// [`TransportFailure`]; anything else as the underlying fetch error.
    async fn exchange(&self, credential: &Credential) -> Result<TokenGrant, FetchError>;
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
    scope: Option<String>,
    refresh_token: Option<String>,
}

/// Error body of a rejected exchange.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Form-POST exchange against the credential's token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthTokenExchange {
    http: HttpClient,
}

impl OAuthTokenExchange {
    /// Creates an exchange with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: &TransportSettings) -> Result<Self, HttpError> {
        Ok(Self {
            http: HttpClient::new(settings)?,
        })
    }
}

#[async_trait]
impl TokenExchange for OAuthTokenExchange {
    #[instrument(skip(self, credential), fields(endpoint = %credential.token_endpoint()))]
    async fn exchange(&self, credential: &Credential) -> Result<TokenGrant, FetchError> {
        let refresh_token = credential
            .refresh_token()
            .ok_or_else(|| TransportFailure::auth_rejected("no refresh token"))?;

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", credential.client_id()),
            ("client_secret", credential.client_secret()),
            ("refresh_token", refresh_token),
        ];

        debug!("Exchanging refresh token");

        let response = self
            .http
            .post_form(credential.token_endpoint().as_str(), &params)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<TokenErrorResponse>(&body).map_or_else(
                |_| format!("HTTP {status}"),
                |e| match e.error_description {
                    Some(description) => format!("{}: {description}", e.error),
                    None => e.error,
                },
            );
            warn!(status = %status, reason = %reason, "Token exchange rejected");
            return Err(TransportFailure::auth_rejected(reason).into());
        }

        let token: TokenResponse = response.json().await.map_err(HttpError::from)?;
        if token.access_token.is_empty() {
            return Err(TransportFailure::auth_rejected("empty access token in response").into());
        }

        Ok(
            TokenGrant::from_expires_in(token.access_token, token.expires_in, Utc::now())
                .with_scope_string(token.scope.as_deref())
                .with_refresh_token(token.refresh_token),
        )
    }
}

// ============================================================================
// Credential Refresher
// ============================================================================

/// Whether [`CredentialRefresher::ensure_fresh`] changed the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The token was still valid; nothing was sent.
    Fresh,
    /// The token was exchanged; the caller should persist the credential.
    Refreshed,
}

impl Freshness {
    /// Returns true if the credential was mutated.
    pub fn is_refreshed(self) -> bool {
        self == Self::Refreshed
    }
}

/// Keeps a credential usable for provider calls.
#[derive(Clone)]
pub struct CredentialRefresher {
    exchange: Arc<dyn TokenExchange>,
    scopes: ScopeValidator,
}

impl CredentialRefresher {
    /// Creates a refresher that re-validates `scopes` whenever the token
    /// endpoint restates them.
    pub fn new(exchange: Arc<dyn TokenExchange>, scopes: ScopeValidator) -> Self {
        Self { exchange, scopes }
    }

    /// Normalizes an externally supplied account identifier.
    pub fn normalize_account_id(raw: &str) -> String {
        normalize_account_id(raw)
    }

    /// Ensures the credential is not expired, refreshing it in place if needed.
    ///
    /// No request is made while the token is still valid.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingToken`] if the access token is empty
    /// - [`AuthError::Unrefreshable`] if it expired without a refresh token
    /// - [`AuthError::ExchangeRejected`] if the endpoint refused the refresh
    /// - a scope error if the restated scopes drop a required one
    /// - an `Unreachable` transport error on network failure or deadline expiry
    #[instrument(skip(self, credential, deadline), fields(expires_at = ?credential.expires_at()))]
    pub async fn ensure_fresh(
        &self,
        credential: &mut Credential,
        deadline: Deadline,
    ) -> Result<Freshness, ReportError> {
        if credential.access_token().is_empty() {
            return Err(AuthError::MissingToken.into());
        }
        if !credential.is_expired() {
            debug!("Access token still valid");
            return Ok(Freshness::Fresh);
        }
        if credential.refresh_token().is_none() {
            return Err(AuthError::Unrefreshable.into());
        }

        let grant = deadline
            .run(self.exchange.exchange(credential))
            .await
            .map_err(|e| classify_exchange_error(&e))?;

        let restated = grant.scopes.is_some();
        credential.apply_grant(grant);
        info!(expires_at = ?credential.expires_at(), "Access token refreshed");

        if restated {
            self.scopes.validate(credential)?;
        }
        Ok(Freshness::Refreshed)
    }
}

impl std::fmt::Debug for CredentialRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRefresher")
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

/// Endpoint rejections are auth errors; everything else follows the
/// transport classification, so timeouts never look like a bad login.
fn classify_exchange_error(error: &FetchError) -> ReportError {
    match error {
        FetchError::Transport(failure) if failure.kind == FailureKind::AuthRejected => {
            AuthError::ExchangeRejected(failure.detail.clone()).into()
        }
        other => ErrorClassifier::classify(other),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use adpulse_core::ErrorKind;
    use adpulse_core::scope::{ADWORDS, ANALYTICS_READONLY};
    use chrono::Duration as ChronoDuration;

    use super::*;

    struct MockExchange {
        result: fn() -> Result<TokenGrant, FetchError>,
        calls: AtomicUsize,
    }

    impl MockExchange {
        fn new(result: fn() -> Result<TokenGrant, FetchError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenExchange for MockExchange {
        async fn exchange(&self, _credential: &Credential) -> Result<TokenGrant, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    /// Answers only after `delay`.
    struct SlowExchange {
        delay: Duration,
    }

    #[async_trait]
    impl TokenExchange for SlowExchange {
        async fn exchange(&self, _credential: &Credential) -> Result<TokenGrant, FetchError> {
            tokio::time::sleep(self.delay).await;
            new_token()
        }
    }

    fn new_token() -> Result<TokenGrant, FetchError> {
        Ok(TokenGrant::from_expires_in("new-token", Some(3600), Utc::now()))
    }

    fn credential(expired: bool, refresh: bool) -> Credential {
        let offset = if expired {
            -ChronoDuration::minutes(5)
        } else {
            ChronoDuration::minutes(30)
        };
        let mut builder = Credential::builder()
            .access_token("old-token")
            .token_endpoint("https://oauth2.example.com/token")
            .client("id", "secret")
            .scope(ADWORDS)
            .scope(ANALYTICS_READONLY)
            .expires_at(Utc::now() + offset);
        if refresh {
            builder = builder.refresh_token("refresh");
        }
        builder.build().unwrap()
    }

    fn refresher(exchange: Arc<MockExchange>) -> CredentialRefresher {
        CredentialRefresher::new(exchange, ScopeValidator::reporting())
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_valid_token_makes_no_call() {
        let exchange = MockExchange::new(new_token);
        let mut creds = credential(false, true);

        let freshness = refresher(exchange.clone())
            .ensure_fresh(&mut creds, deadline())
            .await
            .unwrap();

        assert_eq!(freshness, Freshness::Fresh);
        assert_eq!(exchange.calls(), 0);
        assert_eq!(creds.access_token(), "old-token");
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_in_place() {
        let exchange = MockExchange::new(new_token);
        let mut creds = credential(true, true);

        let freshness = refresher(exchange.clone())
            .ensure_fresh(&mut creds, deadline())
            .await
            .unwrap();

        assert!(freshness.is_refreshed());
        assert_eq!(exchange.calls(), 1);
        assert_eq!(creds.access_token(), "new-token");
        assert!(creds.expires_at().unwrap() > Utc::now());
        assert!(!creds.is_expired());
    }

    #[tokio::test]
    async fn test_missing_token() {
        let exchange = MockExchange::new(new_token);
        let mut creds = credential(true, true);
        creds.clear_access_token();

        let err = refresher(exchange.clone())
            .ensure_fresh(&mut creds, deadline())
            .await
            .unwrap_err();

        assert_eq!(err, ReportError::Auth(AuthError::MissingToken));
        assert_eq!(exchange.calls(), 0);
    }

    #[tokio::test]
    async fn test_unrefreshable() {
        let exchange = MockExchange::new(new_token);
        let mut creds = credential(true, false);

        let err = refresher(exchange.clone())
            .ensure_fresh(&mut creds, deadline())
            .await
            .unwrap_err();

        assert_eq!(err, ReportError::Auth(AuthError::Unrefreshable));
        assert_eq!(exchange.calls(), 0);
    }

    #[tokio::test]
    async fn test_exchange_rejection_is_auth_error() {
        let exchange = MockExchange::new(|| {
            Err(TransportFailure::auth_rejected("invalid_grant: Token has been revoked.").into())
        });
        let mut creds = credential(true, true);

        let err = refresher(exchange)
            .ensure_fresh(&mut creds, deadline())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ReportError::Auth(AuthError::ExchangeRejected(
                "invalid_grant: Token has been revoked.".to_string()
            ))
        );
        assert!(err.requires_reauthorization());
    }

    #[tokio::test]
    async fn test_exchange_outage_is_transport_error() {
        let exchange =
            MockExchange::new(|| Err(TransportFailure::unreachable("connection refused").into()));
        let mut creds = credential(true, true);

        let err = refresher(exchange)
            .ensure_fresh(&mut creds, deadline())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransportError);
        assert!(!err.requires_reauthorization());
    }

    #[tokio::test]
    async fn test_exchange_past_deadline_is_transport_error() {
        let exchange = Arc::new(SlowExchange {
            delay: Duration::from_secs(2),
        });
        let refresher = CredentialRefresher::new(exchange, ScopeValidator::reporting());
        let mut creds = credential(true, true);

        let err = refresher
            .ensure_fresh(&mut creds, Deadline::after(Duration::from_millis(20)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransportError);
        assert!(matches!(
            err,
            ReportError::Transport {
                kind: FailureKind::Unreachable,
                ..
            }
        ));
        assert!(!err.requires_reauthorization());
        assert_eq!(creds.access_token(), "old-token");
    }

    #[tokio::test]
    async fn test_restated_scope_drop_is_scope_error() {
        let exchange = MockExchange::new(|| {
            Ok(TokenGrant::from_expires_in("new-token", Some(3600), Utc::now())
                .with_scope_string(Some(ANALYTICS_READONLY)))
        });
        let mut creds = credential(true, true);

        let err = refresher(exchange)
            .ensure_fresh(&mut creds, deadline())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ScopeError);
    }

    #[test]
    fn test_account_normalization_idempotent() {
        let once = CredentialRefresher::normalize_account_id(" \"123-456-7890\" ");
        assert_eq!(once, "1234567890");
        assert_eq!(CredentialRefresher::normalize_account_id(&once), once);
    }
}
