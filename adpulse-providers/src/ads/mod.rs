//! Delegated ads reporting provider.
//!
//! Queries run over one of two transport tiers:
//!
//! 1. **Native** (primary): a local bridge process started with a bootstrap
//!    record and driven over JSON-RPC on stdio.
//!    - Record written to the temp dir, owner read/write only
//!    - Rewritten whenever the refresh token rotates
//!
//! 2. **REST** (fallback): `POST .../customers/{account}/googleAds:search`
//!    with a bearer token and developer-token header.
//!
//! A primary failure switches the client to REST for the rest of its
//! lifetime.
//!
//! ## Usage
//!
//! ```ignore
//! use adpulse_providers::ads::{AdsSettings, TieredReportClient};
//!
//! let mut client = TieredReportClient::connect(ads, transport, &credential).await?;
//! let outcome = client.run(&mut credential, &query).await?;
//! if outcome.refreshed {
//!     store.persist(session_id, &credential).await?;
//! }
//! ```

// Modules
mod bootstrap;
pub mod catalog;
mod client;
mod error;
mod failure;
pub mod gaql;
mod normalizer;
mod oauth;
mod primary;
mod raw;
mod rest;
mod rpc;
mod settings;

// Re-exports
pub use bootstrap::{BootstrapFile, BootstrapRecord};
pub use client::{ReportOutcome, TieredReportClient};
pub use error::{BootstrapError, RpcError};
pub use failure::{AdsErrorEntry, AdsFailure, ErrorLocation, FieldPathElement, render_rest_error};
pub use normalizer::ResponseNormalizer;
pub use oauth::{CredentialRefresher, Freshness, OAuthTokenExchange, TokenExchange};
pub use primary::{PRIMARY_ADAPTER_ID, PrimaryAdapter};
pub use raw::{ProviderRawResult, RestSearchResult, RpcRow, RpcSearchResult, RpcValue};
pub use rest::{FALLBACK_ADAPTER_ID, FallbackAdapter, classify_status};
pub use rpc::{AdsRpcClient, InitializeResult, ServerInfo};
pub use settings::{AdsSettings, DEFAULT_API_VERSION, DEFAULT_REST_BASE_URL, DEFAULT_RPC_COMMAND};
