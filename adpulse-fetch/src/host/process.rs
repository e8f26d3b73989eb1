//! Native transport processes.
//!
//! The primary transport runs as a long-lived child process speaking
//! newline-delimited JSON over stdin/stdout.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, instrument, warn};

use crate::error::ProcessError;

// ============================================================================
// Stdio Child
// ============================================================================

/// A spawned child with piped stdin and stdout.
#[derive(Debug)]
pub struct StdioChild {
    /// The child process. Killed when dropped.
    pub child: Child,
    /// Writer for requests.
    pub stdin: ChildStdin,
    /// Line reader for responses.
    pub stdout: BufReader<ChildStdout>,
}

// ============================================================================
// Process Runner
// ============================================================================

/// Locates and spawns native commands.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    pub fn new() -> Self {
        Self
    }

    /// Resolves a command on `PATH`, or checks an explicit path.
    pub fn which(&self, cmd: &str) -> Option<PathBuf> {
        which::which(cmd).ok()
    }

    /// Returns true if the command can be found.
    pub fn command_exists(&self, cmd: &str) -> bool {
        self.which(cmd).is_some()
    }

    /// Spawns a command with piped stdin/stdout and extra environment.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::NotFound`] if the command cannot be resolved and
    /// [`ProcessError::SpawnFailed`] if the OS refuses to start it.
    #[instrument(skip(self, args, env), fields(cmd = %cmd))]
    pub fn spawn_stdio<I, K, V>(
        &self,
        cmd: &str,
        args: &[&str],
        env: I,
    ) -> Result<StdioChild, ProcessError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        let path = self.which(cmd).ok_or_else(|| {
            warn!("Command not found");
            ProcessError::NotFound(cmd.to_string())
        })?;

        debug!(path = %path.display(), "Spawning native transport");

        let mut child = Command::new(&path)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProcessError::SpawnFailed(format!("{cmd}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProcessError::SpawnFailed("failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProcessError::SpawnFailed("failed to get stdout".to_string()))?;

        Ok(StdioChild {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }
}
