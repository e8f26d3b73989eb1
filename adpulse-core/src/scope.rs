//! Local scope validation.
//!
//! Checking granted scopes locally is cheaper than discovering an
//! authorization failure after a round trip, so report calls run this gate
//! before any network I/O.

use std::collections::BTreeSet;

use crate::error::ScopeError;
use crate::models::Credential;

/// Read-only analytics scope.
pub const ANALYTICS_READONLY: &str = "https://www.googleapis.com/auth/analytics.readonly";

/// Ads management scope.
pub const ADWORDS: &str = "https://www.googleapis.com/auth/adwords";

/// Checks a credential's granted scopes against a required set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeValidator {
    required: BTreeSet<String>,
}

impl ScopeValidator {
    /// Creates a validator requiring the given scopes.
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    /// Validator for the scopes the report client needs by default.
    pub fn reporting() -> Self {
        Self::new([ADWORDS])
    }

    /// Returns the required scopes.
    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    /// Validates a credential. Pure; performs no I/O.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Missing`] listing every required scope that was
    /// not granted.
    pub fn validate(&self, credential: &Credential) -> Result<(), ScopeError> {
        validate_scopes(credential.scopes(), &self.required)
    }
}

/// Fails when `required` is not a subset of `granted`.
///
/// # Errors
///
/// Returns [`ScopeError::Missing`] listing the missing scopes.
pub fn validate_scopes(
    granted: &BTreeSet<String>,
    required: &BTreeSet<String>,
) -> Result<(), ScopeError> {
    let missing: Vec<String> = required.difference(granted).cloned().collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ScopeError::Missing { missing })
    }
}
