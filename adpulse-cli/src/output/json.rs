//! JSON output formatting.

use adpulse_core::{ErrorKind, ReportError, ReportQuery};
use adpulse_fetch::{AdapterKind, FetchAttempt};
use adpulse_providers::ReportOutcome;
use adpulse_store::StoreError;
use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};

// ============================================================================
// Output Types
// ============================================================================

/// Envelope around every JSON response.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reauthorize: Option<bool>,
}

/// A finished report.
#[derive(Debug, Serialize)]
pub struct ReportOutput {
    pub account: String,
    pub start: String,
    pub end: String,
    pub source: AdapterKind,
    pub refreshed: bool,
    pub row_count: usize,
    pub rows: Vec<Map<String, Value>>,
    pub attempts: Vec<AttemptOutput>,
}

/// One adapter attempt.
#[derive(Debug, Serialize)]
pub struct AttemptOutput {
    pub adapter: String,
    pub kind: AdapterKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// A failed command.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl From<&FetchAttempt> for AttemptOutput {
    fn from(attempt: &FetchAttempt) -> Self {
        Self {
            adapter: attempt.adapter_id.clone(),
            kind: attempt.kind,
            success: attempt.success,
            error: attempt.error.clone(),
            duration_ms: u64::try_from(attempt.duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a finished report inside a success envelope.
    pub fn format_report(&self, query: &ReportQuery, outcome: &ReportOutcome) -> Result<String> {
        self.format(&Envelope {
            success: true,
            data: Some(report_output(query, outcome)),
            error: None,
            reauthorize: None,
        })
    }

    /// Formats a command failure inside an error envelope.
    pub fn format_error(&self, error: &anyhow::Error, reauthorize: bool) -> Result<String> {
        self.format(&Envelope::<()> {
            success: false,
            data: None,
            error: Some(ErrorOutput {
                kind: error_kind(error),
                message: format!("{error:#}"),
            }),
            reauthorize: Some(reauthorize),
        })
    }
}

pub(super) fn report_output(query: &ReportQuery, outcome: &ReportOutcome) -> ReportOutput {
    ReportOutput {
        account: query.account_id.to_string(),
        start: query.date_range.start().to_string(),
        end: query.date_range.end().to_string(),
        source: outcome.source,
        refreshed: outcome.refreshed,
        row_count: outcome.rows.len(),
        rows: outcome.rows.iter().map(|row| row.to_flat_json()).collect(),
        attempts: outcome.attempts.iter().map(AttemptOutput::from).collect(),
    }
}

/// Caller-facing category of a command failure, when it has one.
pub(super) fn error_kind(error: &anyhow::Error) -> Option<ErrorKind> {
    if let Some(e) = error.downcast_ref::<StoreError>() {
        return match e {
            StoreError::Report(report) => Some(report.kind()),
            StoreError::NotAuthenticated(_) => Some(ErrorKind::AuthError),
            _ => None,
        };
    }
    error.downcast_ref::<ReportError>().map(ReportError::kind)
}
