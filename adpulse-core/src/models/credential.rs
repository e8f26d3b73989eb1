//! Delegated-access credentials.
//!
//! A [`Credential`] is only ever built through validation, either from the
//! loosely-typed session form ([`StoredCredential`]) or through a
//! [`CredentialBuilder`]. Missing fields fail fast with an [`AuthError`] or
//! [`ScopeError`] instead of surfacing mid-call.
//!
//! # Session Format
//!
//! ```json
//! {
//!   "token": "ya29...",
//!   "refresh_token": "1//0g...",
//!   "token_uri": "https://oauth2.googleapis.com/token",
//!   "client_id": "123.apps.googleusercontent.com",
//!   "client_secret": "...",
//!   "scopes": ["https://www.googleapis.com/auth/adwords"],
//!   "expiry": "2025-01-01T12:00:00Z"
//! }
//! ```

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AuthError, ReportError, ScopeError};

// ============================================================================
// Stored Credential
// ============================================================================

/// Session form of a credential, as kept by the host application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Access token.
    #[serde(default)]
    pub token: Option<String>,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token exchange endpoint.
    #[serde(default)]
    pub token_uri: Option<String>,
    /// OAuth client ID.
    #[serde(default)]
    pub client_id: Option<String>,
    /// OAuth client secret.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Granted scopes.
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    /// Access token expiry.
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

// ============================================================================
// Token Grant
// ============================================================================

/// The outcome of a successful token exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// The new access token.
    pub access_token: String,
    /// When the new access token expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// A rotated refresh token, if the endpoint issued one.
    pub refresh_token: Option<String>,
    /// Scopes restated by the endpoint, if any.
    pub scopes: Option<BTreeSet<String>>,
}

impl TokenGrant {
    /// Creates a grant whose expiry is `expires_in` seconds after `now`.
    pub fn from_expires_in(
        access_token: impl Into<String>,
        expires_in: Option<u64>,
        now: DateTime<Utc>,
    ) -> Self {
        let expires_at = expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| now + Duration::seconds(secs));

        Self {
            access_token: access_token.into(),
            expires_at,
            refresh_token: None,
            scopes: None,
        }
    }

    /// Sets the restated scopes from a space-separated scope string.
    #[must_use]
    pub fn with_scope_string(mut self, scope: Option<&str>) -> Self {
        self.scopes = scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .filter(|set: &BTreeSet<String>| !set.is_empty());
        self
    }

    /// Sets a rotated refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token.filter(|t| !t.is_empty());
        self
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("scopes", &self.scopes)
            .finish()
    }
}

// ============================================================================
// Credential
// ============================================================================

/// A validated delegated-access grant.
///
/// Scopes only change through [`Credential::apply_grant`]; the token and
/// expiry are replaced in place on refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
    refresh_token: Option<String>,
    token_endpoint: Url,
    client_id: String,
    client_secret: String,
    scopes: BTreeSet<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Creates a builder for a credential.
    pub fn builder() -> CredentialBuilder {
        CredentialBuilder::default()
    }

    /// Validates a stored credential.
    ///
    /// Plain `http://` token endpoints are only accepted when
    /// `allow_insecure_http` is set.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] for a missing token, endpoint or client
    /// identity, and [`ScopeError::NoScopes`] when no scopes are recorded.
    pub fn from_stored(
        stored: StoredCredential,
        allow_insecure_http: bool,
    ) -> Result<Self, ReportError> {
        let access_token = stored
            .token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let endpoint = stored
            .token_uri
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AuthError::InvalidCredential("missing token endpoint".to_string()))?;
        let token_endpoint = parse_endpoint(&endpoint, allow_insecure_http)?;

        let client_id = stored
            .client_id
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::InvalidCredential("missing client id".to_string()))?;

        let client_secret = stored
            .client_secret
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::InvalidCredential("missing client secret".to_string()))?;

        let scopes: BTreeSet<String> = stored
            .scopes
            .unwrap_or_default()
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        if scopes.is_empty() {
            return Err(ScopeError::NoScopes.into());
        }

        Ok(Self {
            access_token,
            refresh_token: stored.refresh_token.filter(|t| !t.is_empty()),
            token_endpoint,
            client_id,
            client_secret,
            scopes,
            expires_at: stored.expiry,
        })
    }

    /// Converts back to the session form.
    pub fn to_stored(&self) -> StoredCredential {
        StoredCredential {
            token: Some(self.access_token.clone()),
            refresh_token: self.refresh_token.clone(),
            token_uri: Some(self.token_endpoint.to_string()),
            client_id: Some(self.client_id.clone()),
            client_secret: Some(self.client_secret.clone()),
            scopes: Some(self.scopes.iter().cloned().collect()),
            expiry: self.expires_at,
        }
    }

    /// Returns the access token.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the refresh token, if any.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Returns the token exchange endpoint.
    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }

    /// Returns the OAuth client ID.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth client secret.
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the granted scopes.
    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    /// Returns the access token expiry.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Check if the credential has a specific scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Check if the credential is expired now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check if the credential is expired at `now`.
    ///
    /// No expiry means the token is treated as valid.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Replaces the token and expiry with a fresh grant.
    ///
    /// Restated scopes replace the granted set; a rotated refresh token
    /// replaces the old one.
    pub fn apply_grant(&mut self, grant: TokenGrant) {
        self.access_token = grant.access_token;
        self.expires_at = grant.expires_at;
        if let Some(refresh_token) = grant.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        if let Some(scopes) = grant.scopes {
            self.scopes = scopes;
        }
    }

    /// Drops the access token, e.g. on logout.
    pub fn clear_access_token(&mut self) {
        self.access_token.clear();
        self.expires_at = None;
    }
}

impl TryFrom<StoredCredential> for Credential {
    type Error = ReportError;

    fn try_from(stored: StoredCredential) -> Result<Self, Self::Error> {
        Self::from_stored(stored, false)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

fn parse_endpoint(raw: &str, allow_insecure_http: bool) -> Result<Url, AuthError> {
    let url = Url::parse(raw)
        .map_err(|e| AuthError::InvalidCredential(format!("token endpoint {raw:?}: {e}")))?;

    match url.scheme() {
        "https" => Ok(url),
        "http" if allow_insecure_http => Ok(url),
        "http" => Err(AuthError::InsecureEndpoint(raw.to_string())),
        other => Err(AuthError::InvalidCredential(format!(
            "unsupported token endpoint scheme: {other}"
        ))),
    }
}

// ============================================================================
// Credential Builder
// ============================================================================

/// Builder for a [`Credential`], validated on [`CredentialBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct CredentialBuilder {
    stored: StoredCredential,
    allow_insecure_http: bool,
}

impl CredentialBuilder {
    /// Sets the access token.
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.stored.token = Some(token.into());
        self
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
        self.stored.refresh_token = Some(token.into());
        self
    }

    /// Sets the token exchange endpoint.
    #[must_use]
    pub fn token_endpoint(mut self, url: impl Into<String>) -> Self {
        self.stored.token_uri = Some(url.into());
        self
    }

    /// Sets the OAuth client identity.
    #[must_use]
    pub fn client(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.stored.client_id = Some(id.into());
        self.stored.client_secret = Some(secret.into());
        self
    }

    /// Adds a granted scope.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.stored
            .scopes
            .get_or_insert_with(Vec::new)
            .push(scope.into());
        self
    }

    /// Sets the access token expiry.
    #[must_use]
    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.stored.expiry = Some(expires_at);
        self
    }

    /// Accepts plain `http://` token endpoints.
    #[must_use]
    pub fn allow_insecure_http(mut self, allow: bool) -> Self {
        self.allow_insecure_http = allow;
        self
    }

    /// Validates and builds the credential.
    ///
    /// # Errors
    ///
    /// See [`Credential::from_stored`].
    pub fn build(self) -> Result<Credential, ReportError> {
        Credential::from_stored(self.stored, self.allow_insecure_http)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ADWORDS: &str = "https://www.googleapis.com/auth/adwords";

    fn builder() -> CredentialBuilder {
        Credential::builder()
            .access_token("access")
            .refresh_token("refresh")
            .token_endpoint("https://oauth2.example.com/token")
            .client("client-id", "client-secret")
            .scope(ADWORDS)
    }

    #[test]
    fn test_build_valid() {
        let creds = builder().build().unwrap();
        assert_eq!(creds.access_token(), "access");
        assert_eq!(creds.refresh_token(), Some("refresh"));
        assert!(creds.has_scope(ADWORDS));
        assert!(!creds.is_expired());
    }

    #[test]
    fn test_missing_token_fails_fast() {
        let err = Credential::builder()
            .token_endpoint("https://oauth2.example.com/token")
            .client("id", "secret")
            .scope(ADWORDS)
            .build()
            .unwrap_err();
        assert_eq!(err, ReportError::Auth(AuthError::MissingToken));
    }

    #[test]
    fn test_missing_scopes_fails_fast() {
        let err = Credential::builder()
            .access_token("access")
            .token_endpoint("https://oauth2.example.com/token")
            .client("id", "secret")
            .build()
            .unwrap_err();
        assert_eq!(err, ReportError::Scope(ScopeError::NoScopes));
    }

    #[test]
    fn test_missing_client_secret() {
        let stored = StoredCredential {
            token: Some("access".to_string()),
            token_uri: Some("https://oauth2.example.com/token".to_string()),
            client_id: Some("id".to_string()),
            scopes: Some(vec![ADWORDS.to_string()]),
            ..Default::default()
        };
        let err = Credential::try_from(stored).unwrap_err();
        assert!(matches!(err, ReportError::Auth(AuthError::InvalidCredential(_))));
    }

    #[test]
    fn test_insecure_endpoint_rejected_by_default() {
        let err = builder()
            .token_endpoint("http://localhost:8080/token")
            .build()
            .unwrap_err();
        assert!(matches!(err, ReportError::Auth(AuthError::InsecureEndpoint(_))));

        let creds = builder()
            .token_endpoint("http://localhost:8080/token")
            .allow_insecure_http(true)
            .build()
            .unwrap();
        assert_eq!(creds.token_endpoint().scheme(), "http");
    }

    #[test]
    fn test_empty_refresh_token_is_none() {
        let creds = builder().refresh_token("").build().unwrap();
        assert_eq!(creds.refresh_token(), None);
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let past = builder().expires_at(now - Duration::hours(1)).build().unwrap();
        assert!(past.is_expired_at(now));

        let future = builder().expires_at(now + Duration::hours(1)).build().unwrap();
        assert!(!future.is_expired_at(now));

        let none = builder().build().unwrap();
        assert!(!none.is_expired_at(now));
    }

    #[test]
    fn test_apply_grant_replaces_token() {
        let now = Utc::now();
        let mut creds = builder().expires_at(now - Duration::hours(1)).build().unwrap();

        creds.apply_grant(TokenGrant::from_expires_in("fresh", Some(3600), now));

        assert_eq!(creds.access_token(), "fresh");
        assert_eq!(creds.refresh_token(), Some("refresh"));
        assert!(!creds.is_expired_at(now));
        assert!(creds.has_scope(ADWORDS));
    }

    #[test]
    fn test_apply_grant_restates_scopes() {
        let now = Utc::now();
        let mut creds = builder().build().unwrap();
        let grant = TokenGrant::from_expires_in("fresh", Some(60), now)
            .with_scope_string(Some("scope-a scope-b"))
            .with_refresh_token(Some("rotated".to_string()));

        creds.apply_grant(grant);

        assert!(creds.has_scope("scope-a"));
        assert!(!creds.has_scope(ADWORDS));
        assert_eq!(creds.refresh_token(), Some("rotated"));
    }

    #[test]
    fn test_stored_roundtrip_preserves_fields() {
        let creds = builder().expires_at(Utc::now()).build().unwrap();
        let back = Credential::try_from(creds.to_stored()).unwrap();
        assert_eq!(back, creds);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = builder().build().unwrap();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("access\""));
        assert!(!debug.contains("client-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
