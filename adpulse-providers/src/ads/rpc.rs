//! JSON-RPC client for the native ads bridge.
//!
//! The bridge is started in stdio mode with the bootstrap record:
//!
//! ```bash
//! adpulse-ads-bridge --config /tmp/adpulse-bootstrap-1234-0.yaml serve --stdio
//! ```
//!
//! Messages are newline-delimited JSON-RPC 2.0. Methods used:
//!
//! - `initialize` - handshake, returns server info
//! - `search` - `{customerId, query}` returns typed rows
//! - `config/reload` - `{path}` re-reads the bootstrap record

use std::path::Path;

use adpulse_fetch::{ProcessError, ProcessRunner, StdioChild};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tracing::{debug, instrument, trace};

use super::error::RpcError;
use super::failure::AdsFailure;
use super::raw::RpcSearchResult;

/// Client name for initialization.
const CLIENT_NAME: &str = "adpulse";

/// Client version for initialization.
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// JSON-RPC Messages
// ============================================================================

#[derive(Debug, Serialize)]
struct RpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    id: u32,
    method: &'a str,
    params: T,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    id: Option<u32>,
    result: Option<serde_json::Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i32,
    message: String,
    data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    client_info: ClientInfo,
}

#[derive(Debug, Serialize)]
struct ClientInfo {
    name: &'static str,
    version: &'static str,
}

/// Result of `initialize`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Server info.
    pub server_info: Option<ServerInfo>,
}

/// Bridge identification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: Option<String>,
    /// Server version.
    pub version: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams<'a> {
    customer_id: &'a str,
    query: &'a str,
}

#[derive(Debug, Serialize)]
struct ReloadParams<'a> {
    path: &'a str,
}

// ============================================================================
// RPC Client
// ============================================================================

/// JSON-RPC client over a bridge process's stdio.
#[derive(Debug)]
pub struct AdsRpcClient {
    process: StdioChild,
    next_id: u32,
    initialized: bool,
    server_version: Option<String>,
}

impl AdsRpcClient {
    /// Spawns the bridge with a bootstrap record.
    ///
    /// `command` is the program followed by any leading arguments, separated
    /// by whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be found or started.
    #[instrument(skip(runner))]
    pub fn spawn(
        runner: &ProcessRunner,
        command: &str,
        config: &Path,
    ) -> Result<Self, RpcError> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| ProcessError::NotFound("empty bridge command".to_string()))?;

        let config = config.to_string_lossy();
        let mut args: Vec<&str> = parts.collect();
        args.extend(["--config", &*config, "serve", "--stdio"]);

        let process =
            runner.spawn_stdio(program, &args, std::iter::empty::<(&str, &str)>())?;

        Ok(Self {
            process,
            next_id: 1,
            initialized: false,
            server_version: None,
        })
    }

    /// Performs the handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the bridge does not answer or answers with an error.
    #[instrument(skip(self))]
    pub async fn initialize(&mut self) -> Result<InitializeResult, RpcError> {
        let params = InitializeParams {
            client_info: ClientInfo {
                name: CLIENT_NAME,
                version: CLIENT_VERSION,
            },
        };

        let result: InitializeResult = self.call("initialize", params).await?;
        if let Some(ref info) = result.server_info {
            self.server_version.clone_from(&info.version);
            debug!(version = ?info.version, "Bridge initialized");
        }
        self.initialized = true;
        Ok(result)
    }

    /// Runs a query for one account.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Remote`] if the provider rejects the query.
    #[instrument(skip(self, query))]
    pub async fn search(
        &mut self,
        customer_id: &str,
        query: &str,
    ) -> Result<RpcSearchResult, RpcError> {
        if !self.initialized {
            return Err(RpcError::NotInitialized);
        }
        self.call("search", SearchParams { customer_id, query })
            .await
    }

    /// Asks the bridge to re-read its bootstrap record.
    ///
    /// # Errors
    ///
    /// Returns an error if the bridge refuses the new record.
    #[instrument(skip(self))]
    pub async fn reload(&mut self, config: &Path) -> Result<(), RpcError> {
        let path = config.to_string_lossy();
        match self
            .call::<_, serde_json::Value>("config/reload", ReloadParams { path: &path })
            .await
        {
            Ok(_) | Err(RpcError::EmptyResponse) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Returns the bridge version, if known.
    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    async fn call<P: Serialize, R: DeserializeOwned>(
        &mut self,
        method: &str,
        params: P,
    ) -> Result<R, RpcError> {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        trace!(method, id, "Sending request");

        self.process.stdin.write_all(line.as_bytes()).await?;
        self.process.stdin.flush().await?;

        loop {
            let mut line = String::new();
            let read = self.process.stdout.read_line(&mut line).await?;
            if read == 0 {
                return Err(ProcessError::ConnectionClosed("ads bridge".to_string()).into());
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            // Notifications and stale replies are skipped.
            let response: RpcResponse = match serde_json::from_str(line) {
                Ok(response) => response,
                Err(e) => {
                    trace!(error = %e, "Skipping non-response line");
                    continue;
                }
            };
            if response.id != Some(id) {
                continue;
            }

            if let Some(error) = response.error {
                return Err(RpcError::Remote {
                    code: error.code,
                    message: error.message,
                    failure: error
                        .data
                        .and_then(|data| serde_json::from_value::<AdsFailure>(data).ok()),
                });
            }
            let result = response.result.ok_or(RpcError::EmptyResponse)?;
            return Ok(serde_json::from_value(result)?);
        }
    }
}
