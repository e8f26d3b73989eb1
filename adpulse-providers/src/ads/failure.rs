//! Provider failure payloads and their diagnostic rendering.
//!
//! Both transports report failures as a list of errors, each optionally
//! pointing at the offending field path. They are rendered as
//!
//! ```text
//! Error: Unrecognized field in the query: 'metrics.foo'.
//! 	On field: query
//! ```

use serde::Deserialize;

/// A provider failure: one or more errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdsFailure {
    /// The individual errors.
    #[serde(default)]
    pub errors: Vec<AdsErrorEntry>,
}

/// One provider error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdsErrorEntry {
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Where in the request the error applies.
    pub location: Option<ErrorLocation>,
}

/// Location of an error within the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLocation {
    /// Field path, outermost first.
    #[serde(default)]
    pub field_path_elements: Vec<FieldPathElement>,
}

/// One element of a field path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPathElement {
    /// Field name.
    #[serde(default)]
    pub field_name: String,
}

impl AdsFailure {
    /// Returns true if the payload lists no errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Renders `Error:` lines, each followed by its `\tOn field:` lines.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        for error in &self.errors {
            lines.push(format!("Error: {}", error.message));
            if let Some(ref location) = error.location {
                for element in &location.field_path_elements {
                    lines.push(format!("\tOn field: {}", element.field_name));
                }
            }
        }
        lines.join("\n")
    }
}

// ============================================================================
// REST error envelope
// ============================================================================

#[derive(Debug, Deserialize)]
struct RestErrorBody {
    error: RestErrorStatus,
}

#[derive(Debug, Deserialize)]
struct RestErrorStatus {
    message: Option<String>,
    status: Option<String>,
    #[serde(default)]
    details: Vec<AdsFailure>,
}

/// Extracts a diagnostic from a REST error body.
///
/// Returns `None` if the body is not a recognizable error envelope.
pub fn render_rest_error(body: &str) -> Option<String> {
    let parsed: RestErrorBody = serde_json::from_str(body).ok()?;
    let failure = AdsFailure {
        errors: parsed
            .error
            .details
            .into_iter()
            .flat_map(|detail| detail.errors)
            .collect(),
    };

    if failure.is_empty() {
        match (parsed.error.status, parsed.error.message) {
            (Some(status), Some(message)) => Some(format!("{status}: {message}")),
            (None, Some(message)) => Some(message),
            (Some(status), None) => Some(status),
            (None, None) => None,
        }
    } else {
        Some(failure.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_field_paths() {
        let failure: AdsFailure = serde_json::from_str(
            r#"{"errors": [
                {"message": "Unrecognized field", "location": {"fieldPathElements": [{"fieldName": "query"}, {"fieldName": "select"}]}},
                {"message": "Second problem"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            failure.render(),
            "Error: Unrecognized field\n\tOn field: query\n\tOn field: select\nError: Second problem"
        );
    }

    #[test]
    fn test_rest_error_with_details() {
        let body = r#"{"error": {"code": 400, "message": "Request contains an invalid argument.",
            "status": "INVALID_ARGUMENT",
            "details": [{"@type": "type.googleapis.com/google.ads.googleads.v17.errors.GoogleAdsFailure",
                "errors": [{"errorCode": {"queryError": "UNRECOGNIZED_FIELD"},
                    "message": "Unrecognized field in the query: 'metrics.foo'.",
                    "location": {"fieldPathElements": [{"fieldName": "query"}]}}]}]}}"#;

        assert_eq!(
            render_rest_error(body).unwrap(),
            "Error: Unrecognized field in the query: 'metrics.foo'.\n\tOn field: query"
        );
    }

    #[test]
    fn test_rest_error_without_details() {
        let body = r#"{"error": {"code": 401, "message": "Request had invalid authentication credentials.", "status": "UNAUTHENTICATED"}}"#;
        assert_eq!(
            render_rest_error(body).unwrap(),
            "UNAUTHENTICATED: Request had invalid authentication credentials."
        );
        assert!(render_rest_error("<html>502</html>").is_none());
    }
}
