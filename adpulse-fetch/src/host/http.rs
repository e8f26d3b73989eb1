//! HTTP client with tracing and a transport-security check.
//!
//! This module provides a wrapped HTTP client that adds:
//! - Request/response tracing
//! - Refusal of plain-text `http://` URLs unless explicitly allowed
//! - Convenience methods for form and JSON posts

use reqwest::{Client, Response, header::HeaderMap};
use tracing::{debug, instrument};
use url::Url;

use crate::context::TransportSettings;
use crate::error::HttpError;

/// User agent string for `AdPulse`.
const USER_AGENT: &str = concat!("AdPulse/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing and a scheme check.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    allow_insecure_http: bool,
}

impl HttpClient {
    /// Creates a client from transport settings.
    ///
    /// The per-request timeout is the settings' timeout; callers still bound
    /// the whole call with a [`crate::Deadline`].
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(settings: &TransportSettings) -> Result<Self, HttpError> {
        let inner = Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            inner,
            allow_insecure_http: settings.allow_insecure_http,
        })
    }

    /// Parses a URL and checks its scheme.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidUrl`] for unparsable or non-HTTP URLs and
    /// [`HttpError::InsecureUrl`] for `http://` URLs when not allowed.
    pub fn check_url(&self, url: &str) -> Result<Url, HttpError> {
        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(format!("{url}: {e}")))?;
        match parsed.scheme() {
            "https" => Ok(parsed),
            "http" if self.allow_insecure_http => Ok(parsed),
            "http" => Err(HttpError::InsecureUrl(url.to_string())),
            other => Err(HttpError::InvalidUrl(format!("unsupported scheme {other}"))),
        }
    }

    /// Performs a POST request with form data.
    #[instrument(skip(self, form), fields(url = %url))]
    pub async fn post_form<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        form: &T,
    ) -> Result<Response, HttpError> {
        let url = self.check_url(url)?;
        debug!("POST request with form data");

        let response = self.inner.post(url).form(form).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Performs a POST request with a JSON body and custom headers.
    #[instrument(skip(self, headers, body), fields(url = %url))]
    pub async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &T,
    ) -> Result<Response, HttpError> {
        let url = self.check_url(url)?;
        debug!("POST request with JSON");

        let response = self
            .inner
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_allowed() {
        let client = HttpClient::new(&TransportSettings::default()).unwrap();
        assert!(client.check_url("https://oauth2.example.com/token").is_ok());
    }

    #[test]
    fn test_http_refused_by_default() {
        let client = HttpClient::new(&TransportSettings::default()).unwrap();
        assert!(matches!(
            client.check_url("http://127.0.0.1:8080/token"),
            Err(HttpError::InsecureUrl(_))
        ));
    }

    #[test]
    fn test_http_allowed_when_enabled() {
        let settings = TransportSettings::default().with_insecure_http(true);
        let client = HttpClient::new(&settings).unwrap();
        assert!(client.check_url("http://127.0.0.1:8080/token").is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let client = HttpClient::new(&TransportSettings::default()).unwrap();
        assert!(matches!(
            client.check_url("not-a-valid-url"),
            Err(HttpError::InvalidUrl(_))
        ));
        assert!(matches!(
            client.check_url("ftp://example.com/file"),
            Err(HttpError::InvalidUrl(_))
        ));
    }
}
