//! Host APIs used by the transport adapters.
//!
//! - [`http`] - HTTP client with tracing and a scheme check
//! - [`process`] - Native transport processes over stdio

pub mod http;
pub mod process;

pub use http::HttpClient;
pub use process::{ProcessRunner, StdioChild};
