//! Maps adapter failures onto the caller-facing error taxonomy.

use adpulse_core::{AuthError, FailureKind, ReportError};
use tracing::debug;

use crate::error::{FetchError, HttpError, ProcessError, TransportFailure};

/// Assigns every adapter failure an [`adpulse_core::ErrorKind`].
///
/// Nothing is swallowed: failures that fit no category become
/// [`ReportError::UnknownProvider`] with the original message as detail.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classifies a fetch failure.
    pub fn classify(error: &FetchError) -> ReportError {
        let classified = match error {
            FetchError::Transport(failure) => Self::classify_failure(failure),
            FetchError::Http(err) => Self::classify_http(err),
            FetchError::Process(err) => Self::classify_process(err),
            FetchError::Json(err) => {
                ReportError::unreachable(format!("malformed response body: {err}"))
            }
            FetchError::DeadlineExceeded(_) => ReportError::unreachable(error.to_string()),
            FetchError::Unexpected(detail) => ReportError::unknown(detail.clone()),
        };
        debug!(kind = ?classified.kind(), "Classified failure");
        classified
    }

    /// Classifies an already-kinded transport failure.
    pub fn classify_failure(failure: &TransportFailure) -> ReportError {
        let detail = failure.detail.clone();
        match failure.kind {
            FailureKind::AuthRejected => ReportError::Auth(AuthError::Rejected(detail)),
            FailureKind::QueryRejected => ReportError::query(detail),
            FailureKind::Unreachable | FailureKind::ConfigInvalid => {
                ReportError::transport(failure.kind, detail)
            }
        }
    }

    fn classify_http(error: &HttpError) -> ReportError {
        match error {
            HttpError::Request(err)
                if err.is_timeout()
                    || err.is_connect()
                    || err.is_request()
                    || err.is_body()
                    || err.is_decode() =>
            {
                ReportError::unreachable(err.to_string())
            }
            HttpError::Request(err) => ReportError::unknown(err.to_string()),
            HttpError::InvalidUrl(_) | HttpError::InsecureUrl(_) => {
                ReportError::transport(FailureKind::ConfigInvalid, error.to_string())
            }
        }
    }

    fn classify_process(error: &ProcessError) -> ReportError {
        match error {
            ProcessError::NotFound(_) | ProcessError::SpawnFailed(_) => {
                ReportError::transport(FailureKind::ConfigInvalid, error.to_string())
            }
            ProcessError::ConnectionClosed(_) | ProcessError::Io(_) => {
                ReportError::unreachable(error.to_string())
            }
        }
    }
}
