// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `AdPulse` Core
//!
//! Core types and invariants shared by every other `AdPulse` crate.
//!
//! - Delegated-access credentials and their session form
//! - Report queries, date ranges and normalized account identifiers
//! - Canonical report rows
//! - Local scope validation
//! - The caller-facing error taxonomy
//!
//! ## Key Types
//!
//! ### Credentials
//! - [`Credential`] - A validated access/refresh token pair
//! - [`StoredCredential`] - Loosely-typed session form of a credential
//! - [`TokenGrant`] - Result of a token exchange, applied with [`Credential::apply_grant`]
//! - [`ScopeValidator`] - Checks granted scopes before any network call
//!
//! ### Reports
//! - [`ReportQuery`] - One metrics request over a date range
//! - [`ReportRow`] - Canonical result row
//! - [`AccountId`] - Normalized account identifier
//!
//! ### Errors
//! - [`ReportError`] - Everything a caller can see, grouped by [`ErrorKind`]

pub mod error;
pub mod models;
pub mod scope;

// Re-export error types
pub use error::{AuthError, ErrorKind, FailureKind, ReportError, ScopeError};

// Re-export all model types
pub use models::{
    // Account identifiers
    AccountId,
    normalize_account_id,
    // Credentials
    Credential,
    CredentialBuilder,
    StoredCredential,
    TokenGrant,
    // Queries
    DateRange,
    ReportQuery,
    // Results
    MetricValue,
    ReportRow,
    has_uniform_schema,
};

pub use scope::ScopeValidator;
