// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `AdPulse` Fetch
//!
//! Transport plumbing and tiered routing for `AdPulse` report clients.
//!
//! ## Host APIs
//!
//! The [`host`] module provides abstractions for system interactions:
//!
//! - [`host::http`] - HTTP client with tracing and a scheme check
//! - [`host::process`] - Native transport processes over stdio
//!
//! ## Tiered Pipeline
//!
//! - [`transport::TransportAdapter`] - Trait for one transport tier
//! - [`pipeline::TieredPipeline`] - Primary first, sticky fallback after any failure
//! - [`classify::ErrorClassifier`] - Maps adapter failures onto [`adpulse_core::ErrorKind`]
//! - [`context::Deadline`] - Caller-supplied budget for every network-bound call
//!
//! ## Example
//!
//! ```ignore
//! use adpulse_fetch::{Deadline, TieredPipeline};
//!
//! let mut pipeline = TieredPipeline::new(Some(Box::new(primary)), Box::new(fallback));
//! let outcome = pipeline.execute(&credential, &query, Deadline::after(timeout)).await;
//! ```

pub mod classify;
pub mod context;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod transport;

// Errors
pub use error::{FetchError, HttpError, ProcessError, TransportFailure};

// Host APIs
pub use host::{
    http::HttpClient,
    process::{ProcessRunner, StdioChild},
};

// Adapters & Pipeline
pub use classify::ErrorClassifier;
pub use context::{Deadline, TransportSettings};
pub use pipeline::{
    BoxedAdapter, FetchAttempt, FetchOutcome, FetchResult, RoutingState, TieredClientState,
    TieredPipeline,
};
pub use transport::{AdapterKind, TransportAdapter};
