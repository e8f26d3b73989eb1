//! Domain models for `AdPulse`.
//!
//! ## Submodules
//!
//! - [`account`] - Account identifier normalization
//! - [`credential`] - Delegated-access credentials
//! - [`query`] - Report queries and date ranges
//! - [`report`] - Canonical report rows

mod account;
mod credential;
mod query;
mod report;

// Re-export everything at the models level
pub use account::{AccountId, normalize_account_id};
pub use credential::{Credential, CredentialBuilder, StoredCredential, TokenGrant};
pub use query::{DateRange, ReportQuery};
pub use report::{MetricValue, ReportRow, has_uniform_schema};
