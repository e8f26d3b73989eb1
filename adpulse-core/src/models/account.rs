//! Account identifier normalization.
//!
//! Identifiers arrive from configuration files, query strings and copy-paste
//! in forms like `"123-456-7890"` or ` 1234567890 `. Every identifier is
//! normalized before it reaches a transport.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReportError;

/// Characters stripped from account identifiers.
const STRIPPED: &[char] = &['-', '.', '_', '"', '\''];

/// Normalizes an externally supplied account identifier.
///
/// Removes quotes, whitespace and separator characters. Normalizing an
/// already-normalized identifier is a no-op.
pub fn normalize_account_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !STRIPPED.contains(c))
        .collect()
}

/// A normalized, validated account identifier (digits only).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Normalizes and validates an account identifier.
    ///
    /// # Errors
    ///
    /// Returns a query error if the normalized identifier is empty or
    /// contains anything other than ASCII digits.
    pub fn parse(raw: &str) -> Result<Self, ReportError> {
        let normalized = normalize_account_id(raw);
        if normalized.is_empty() {
            return Err(ReportError::query("account id is empty"));
        }
        if !normalized.chars().all(|c| c.is_ascii_digit()) {
            return Err(ReportError::query(format!(
                "account id must contain only digits: {raw:?}"
            )));
        }
        Ok(Self(normalized))
    }

    /// Returns the normalized identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
