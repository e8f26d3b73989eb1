// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `AdPulse` Store
//!
//! Session state and configuration for `AdPulse`.
//!
//! This crate provides:
//!
//! - **CredentialStore**: load/persist/clear of credentials per session,
//!   plus one refresh lock per session
//! - **SessionReports**: runs a query for a session and writes a refreshed
//!   credential back
//! - **Config**: file and environment configuration
//! - **Persistence**: owner-only JSON file helpers
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use adpulse_store::{CredentialStore, MemorySessionBackend, SessionReports};
//!
//! let store = Arc::new(CredentialStore::new(Arc::new(MemorySessionBackend::new())));
//! store.set_credential("session-1", &credential).await?;
//!
//! let reports = SessionReports::new(store);
//! let outcome = reports.run("session-1", &mut client, &query, deadline).await?;
//! ```

pub mod backend;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod persistence;
pub mod session;

pub use backend::{FileSessionBackend, MemorySessionBackend, SessionBackend};
pub use config::{Config, DEFAULT_TOKEN_ENDPOINT, mask_secret};
pub use credential_store::CredentialStore;
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_config_path, default_sessions_dir, ensure_dir, load_json,
    save_json,
};
pub use session::SessionReports;
