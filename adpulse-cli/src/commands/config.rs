//! Config command - inspect configuration.

use adpulse_store::{Config, default_config_dir, default_sessions_dir};
use anyhow::Result;
use clap::{Args, Subcommand};

use crate::commands::report::load_config;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration, secrets masked.
    Show,

    /// Show configuration paths.
    Path,
}

/// Runs the config command.
pub fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli),
        ConfigAction::Path => show_paths(cli),
    }
}

fn show_config(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?.redacted();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_config(&config));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&config)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_file = cli.config_file.clone().unwrap_or_else(Config::default_path);
    let sessions_dir = default_sessions_dir();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:   {}", default_config_dir().display());
            println!("Config file:  {}", config_file.display());
            println!("Sessions dir: {}", sessions_dir.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": default_config_dir().display().to_string(),
                "config_file": config_file.display().to_string(),
                "sessions_dir": sessions_dir.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}
