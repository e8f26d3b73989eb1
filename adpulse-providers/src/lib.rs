// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `AdPulse` Providers
//!
//! Provider implementations for `AdPulse`.
//!
//! | Provider | Primary tier | Fallback tier | Auth |
//! |----------|--------------|---------------|------|
//! | Ads | native bridge (JSON-RPC) | REST/JSON | OAuth refresh token |
//!
//! Each provider module includes:
//!
//! - **Settings**: explicit configuration passed at construction
//! - **Adapters**: one [`adpulse_fetch::TransportAdapter`] per tier
//! - **Normalizer**: raw rows of either tier to canonical rows
//! - **Client**: the tiered entry point the application calls
//!
//! ## Usage
//!
//! ```ignore
//! use adpulse_providers::{AdsSettings, TieredReportClient};
//! use adpulse_fetch::TransportSettings;
//!
//! let mut client =
//!     TieredReportClient::connect(AdsSettings::default(), TransportSettings::default(), &credential)
//!         .await?;
//! let outcome = client.run(&mut credential, &query).await?;
//! ```

pub mod ads;

// Re-export key types
pub use ads::{
    AdsSettings, CredentialRefresher, FallbackAdapter, Freshness, OAuthTokenExchange,
    PrimaryAdapter, ProviderRawResult, ReportOutcome, ResponseNormalizer, TieredReportClient,
    TokenExchange,
};
