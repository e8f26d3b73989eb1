//! Report commands - run presets or explicit queries.

use std::path::PathBuf;
use std::sync::Arc;

use adpulse_core::{DateRange, ReportQuery};
use adpulse_providers::{ReportOutcome, TieredReportClient};
use adpulse_store::{
    Config, CredentialStore, FileSessionBackend, SessionBackend, SessionReports, StoreError,
    default_sessions_dir,
};
use anyhow::Result;
use clap::Args;
use tracing::{debug, info};

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Session id used for the CLI's single credential file.
const CLI_SESSION: &str = "cli";

/// Arguments shared by the preset reports.
#[derive(Args)]
pub struct PresetArgs {
    /// Account to query (defaults to the configured account).
    #[arg(long, short)]
    pub account: Option<String>,

    /// Number of days to include, ending today.
    #[arg(long, default_value = "30")]
    pub days: u32,
}

/// Arguments for an explicit query.
#[derive(Args)]
pub struct QueryArgs {
    /// Dimension field (repeatable).
    #[arg(long = "dimension", short = 'd')]
    pub dimensions: Vec<String>,

    /// Metric field (repeatable).
    #[arg(long = "metric", short = 'm')]
    pub metrics: Vec<String>,

    /// First day, YYYY-MM-DD.
    #[arg(long)]
    pub start: String,

    /// Last day, YYYY-MM-DD.
    #[arg(long)]
    pub end: String,

    /// Account to query (defaults to the configured account).
    #[arg(long, short)]
    pub account: Option<String>,

    /// Logical table to select from.
    #[arg(long)]
    pub resource: Option<String>,

    /// Metric to order by, descending.
    #[arg(long)]
    pub order_by: Option<String>,
}

/// Built-in report shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Campaign performance.
    Campaigns,
    /// Daily active users.
    ActiveUsers,
    /// Traffic sources.
    TrafficSources,
}

impl Preset {
    fn build(self, account: &str, range: DateRange) -> Result<ReportQuery> {
        let query = match self {
            Self::Campaigns => ReportQuery::campaign_performance(account, range)?,
            Self::ActiveUsers => ReportQuery::active_users(account, range)?,
            Self::TrafficSources => ReportQuery::traffic_sources(account, range)?,
        };
        Ok(query)
    }
}

/// Runs a preset report.
pub async fn run_preset(preset: Preset, args: &PresetArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let account = config.resolve_account(args.account.as_deref())?;
    info!(?preset, %account, days = args.days, "Running preset report");

    let query = preset.build(&account, DateRange::last_days(args.days))?;
    execute(&config, &query, cli).await
}

/// Runs an explicit query.
pub async fn run_query(args: &QueryArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let account = config.resolve_account(args.account.as_deref())?;
    info!(%account, "Running query");

    let range = DateRange::parse(&args.start, &args.end)?;
    let mut query = ReportQuery::new(
        &account,
        args.dimensions.iter().cloned(),
        args.metrics.iter().cloned(),
        range,
    )?;
    if let Some(resource) = &args.resource {
        query = query.with_resource(resource.as_str())?;
    }
    if let Some(metric) = &args.order_by {
        query = query.with_order_by(metric.as_str())?;
    }

    execute(&config, &query, cli).await
}

// ============================================================================
// Shared flow
// ============================================================================

pub(crate) fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config_file {
        Some(path) => Config::load_from(path)?.with_env(|key| std::env::var(key).ok()),
        None => Config::load()?,
    };
    Ok(config)
}

fn credentials_path(cli: &Cli, config: &Config) -> PathBuf {
    cli.credentials
        .clone()
        .or_else(|| config.credentials_path.clone())
        .unwrap_or_else(|| default_sessions_dir().join("default.json"))
}

async fn execute(config: &Config, query: &ReportQuery, cli: &Cli) -> Result<()> {
    let path = credentials_path(cli, config);
    debug!(path = %path.display(), "Using credential file");

    let backend = Arc::new(FileSessionBackend::single_file(&path));
    let Some(mut stored) = backend.get(CLI_SESSION).await? else {
        return Err(StoreError::NotAuthenticated(path.display().to_string()).into());
    };
    if config.fill_stored_credential(&mut stored) {
        backend.set(CLI_SESSION, &stored).await?;
    }

    let store = Arc::new(
        CredentialStore::new(backend).with_insecure_http(config.transport.allow_insecure_http),
    );
    let credential = store
        .load(CLI_SESSION)
        .await?
        .ok_or_else(|| StoreError::NotAuthenticated(path.display().to_string()))?;

    let mut client =
        TieredReportClient::connect(config.ads.clone(), config.transport.clone(), &credential)
            .await?;
    let reports = SessionReports::new(store);
    let outcome = reports
        .run(CLI_SESSION, &mut client, query, config.transport.deadline())
        .await?;

    print_outcome(query, &outcome, cli)
}

fn print_outcome(query: &ReportQuery, outcome: &ReportOutcome, cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_report(query, outcome));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_report(query, outcome)?);
        }
    }
    Ok(())
}
