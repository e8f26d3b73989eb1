// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `AdPulse` CLI - delegated ads reporting from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Campaign performance for the last 30 days
//! adpulse campaigns --account 123-456-7890
//!
//! # Daily active users for the last week, as JSON
//! adpulse active-users --days 7 --format json --pretty
//!
//! # Explicit query
//! adpulse query --dimension campaign.name --metric clicks --metric cost_micros \
//!     --start 2024-05-01 --end 2024-05-31
//!
//! # Effective configuration, secrets masked
//! adpulse config show
//! ```

mod commands;
mod output;

use std::path::PathBuf;

use adpulse_core::ReportError;
use adpulse_store::StoreError;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{config, report};
use output::JsonFormatter;

// ============================================================================
// CLI Definition
// ============================================================================

/// `AdPulse` CLI - delegated ads reporting.
#[derive(Parser)]
#[command(name = "adpulse")]
#[command(about = "Delegated ads reporting with tiered transport fallback")]
#[command(long_about = r"
AdPulse runs ads reports with a stored delegated-access credential.

Reports run over the native bridge when it is available and fall back to
the REST transport otherwise. An expired access token is refreshed and
written back to the credential file.

Examples:
  adpulse campaigns --account 123-456-7890
  adpulse active-users --days 7
  adpulse traffic-sources --format json
  adpulse config show
")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Stored credential file (JSON session form).
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,

    /// Config file instead of the default location.
    #[arg(long, global = true)]
    pub config_file: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Campaign performance: delivery, cost and conversions.
    #[command(visible_alias = "c")]
    Campaigns(report::PresetArgs),

    /// Daily active and new users.
    ActiveUsers(report::PresetArgs),

    /// Sessions and active users per traffic source.
    TrafficSources(report::PresetArgs),

    /// Run an explicit query.
    #[command(visible_alias = "q")]
    Query(report::QueryArgs),

    /// Show configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table.
    #[default]
    Text,
    /// JSON envelope for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// General error.
    Error = 1,
    /// The stored credential must be authorized again.
    Reauthorize = 2,
}

// ============================================================================
// Logging Setup
// ============================================================================

/// Filter directives: `--verbose`, then `RUST_LOG`, then the configured level.
fn log_directives(verbose: bool, rust_log: Option<String>, configured: Option<&str>) -> String {
    if verbose {
        return "adpulse=debug,info".to_string();
    }
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        return directives;
    }
    match configured.map(str::trim).filter(|l| !l.is_empty()) {
        Some(level) => format!("adpulse={level}"),
        None => "adpulse=warn".to_string(),
    }
}

fn setup_logging(verbose: bool, configured: Option<&str>) {
    let directives = log_directives(verbose, std::env::var("RUST_LOG").ok(), configured);
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("adpulse=warn"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Auth and scope failures, wherever they surfaced.
fn requires_reauthorization(error: &anyhow::Error) -> bool {
    if let Some(e) = error.downcast_ref::<StoreError>() {
        return e.requires_reauthorization();
    }
    error
        .downcast_ref::<ReportError>()
        .is_some_and(ReportError::requires_reauthorization)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config is reported by the command itself.
    let log_level = report::load_config(&cli).ok().map(|config| config.log_level);
    setup_logging(cli.verbose, log_level.as_deref());

    let result = match &cli.command {
        Commands::Campaigns(args) => report::run_preset(report::Preset::Campaigns, args, &cli).await,
        Commands::ActiveUsers(args) => {
            report::run_preset(report::Preset::ActiveUsers, args, &cli).await
        }
        Commands::TrafficSources(args) => {
            report::run_preset(report::Preset::TrafficSources, args, &cli).await
        }
        Commands::Query(args) => report::run_query(args, &cli).await,
        Commands::Config(args) => config::run(args, &cli),
    };

    if let Err(e) = result {
        let reauthorize = requires_reauthorization(&e);

        match cli.format {
            OutputFormat::Json => {
                let formatter = JsonFormatter::new(cli.pretty);
                println!("{}", formatter.format_error(&e, reauthorize)?);
            }
            OutputFormat::Text => {
                eprintln!("Error: {e:#}");
                if reauthorize {
                    eprintln!("The stored credential must be authorized again.");
                }
            }
        }

        let code = if reauthorize {
            ExitCode::Reauthorize
        } else {
            ExitCode::Error
        };
        std::process::exit(code as i32);
    }

    Ok(())
}
