//! Fallback adapter: the REST/JSON transport.
//!
//! # API Endpoint
//!
//! ```text
//! POST {base}/{version}/customers/{account}/googleAds:search
//! Authorization: Bearer <access_token>
//! developer-token: <developer_token>
//! login-customer-id: <manager account>
//!
//! {"query": "SELECT ...", "pageToken": "..."}
//! ```
//!
//! # Response Format
//!
//! ```json
//! {
//!   "results": [
//!     {"campaign": {"id": "1", "name": "Spring"}, "metrics": {"costMicros": "5000000"}}
//!   ],
//!   "nextPageToken": "..."
//! }
//! ```

use adpulse_core::{Credential, ReportQuery};
use adpulse_fetch::{
    AdapterKind, Deadline, FetchError, HttpClient, HttpError, TransportAdapter, TransportFailure,
    TransportSettings,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::failure::render_rest_error;
use super::gaql::build_query;
use super::raw::{ProviderRawResult, RestSearchResult};
use super::settings::AdsSettings;

/// Adapter id.
pub const FALLBACK_ADAPTER_ID: &str = "ads.rest";

/// Header carrying the developer token.
const DEVELOPER_TOKEN_HEADER: &str = "developer-token";

/// Header carrying the manager account id.
const LOGIN_CUSTOMER_HEADER: &str = "login-customer-id";

/// Header carrying the linked account id.
const LINKED_CUSTOMER_HEADER: &str = "linked-customer-id";

// ============================================================================
// API Request/Response Structures
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    results: Vec<serde_json::Value>,
    next_page_token: Option<String>,
}

// ============================================================================
// Fallback Adapter
// ============================================================================

/// Runs queries over HTTPS with a bearer token.
#[derive(Debug, Clone)]
pub struct FallbackAdapter {
    http: HttpClient,
    settings: AdsSettings,
}

impl FallbackAdapter {
    /// Creates the adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: AdsSettings, transport: &TransportSettings) -> Result<Self, HttpError> {
        Ok(Self {
            http: HttpClient::new(transport)?,
            settings,
        })
    }

    fn search_url(&self, account: &str) -> String {
        format!(
            "{}/{}/customers/{account}/googleAds:search",
            self.settings.rest_base_url.trim_end_matches('/'),
            self.settings.api_version,
        )
    }

    fn headers(&self, credential: &Credential, account: &str) -> Result<HeaderMap, FetchError> {
        let developer_token = self.settings.require_developer_token()?;
        let login_customer = self.settings.login_customer()?;
        let linked_customer = self.settings.linked_customer()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", credential.access_token()))?,
        );
        headers.insert(
            HeaderName::from_static(DEVELOPER_TOKEN_HEADER),
            header_value(developer_token)?,
        );
        headers.insert(
            HeaderName::from_static(LOGIN_CUSTOMER_HEADER),
            header_value(login_customer.as_ref().map_or(account, |id| id.as_str()))?,
        );
        if let Some(linked) = linked_customer {
            headers.insert(
                HeaderName::from_static(LINKED_CUSTOMER_HEADER),
                header_value(linked.as_str())?,
            );
        }
        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, TransportFailure> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| TransportFailure::config_invalid("header value contains invalid characters"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Maps a non-success status onto a failure kind, keeping the provider's
/// diagnostic as detail.
pub fn classify_status(status: StatusCode, body: &str) -> TransportFailure {
    let detail = render_rest_error(body).unwrap_or_else(|| {
        let snippet: String = body.chars().take(200).collect();
        format!("HTTP {status}: {snippet}")
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransportFailure::auth_rejected(detail),
        s if s.is_client_error() => TransportFailure::query_rejected(detail),
        _ => TransportFailure::unreachable(detail),
    }
}

#[async_trait]
impl TransportAdapter for FallbackAdapter {
    type Output = ProviderRawResult;

    fn id(&self) -> &str {
        FALLBACK_ADAPTER_ID
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Fallback
    }

    #[instrument(skip_all, fields(account = %query.account_id))]
    async fn execute(
        &self,
        credential: &Credential,
        query: &ReportQuery,
        deadline: Deadline,
    ) -> Result<ProviderRawResult, FetchError> {
        let account = query.account_id.as_str();
        let url = self.search_url(account);
        let headers = self.headers(credential, account)?;
        let gaql = build_query(query);
        debug!(query = %gaql, "Searching via REST transport");

        let mut results = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0_u32;

        loop {
            if deadline.is_expired() {
                return Err(FetchError::DeadlineExceeded(deadline.budget()));
            }

            let body = SearchRequest {
                query: &gaql,
                page_token: page_token.as_deref(),
            };
            let response = self.http.post_json(&url, headers.clone(), &body).await?;

            let status = response.status();
            let text = response.text().await.map_err(HttpError::from)?;
            if !status.is_success() {
                let failure = classify_status(status, &text);
                warn!(status = %status, kind = %failure.kind, "REST search failed");
                return Err(failure.into());
            }

            let page: SearchResponse = serde_json::from_str(&text)?;
            pages += 1;
            results.extend(page.results);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(rows = results.len(), pages, "REST search returned");
        Ok(ProviderRawResult::Rest(RestSearchResult { results }))
    }
}
