//! Text output formatting with aligned tables and colors.

use adpulse_core::{MetricValue, ReportQuery, ReportRow};
use adpulse_providers::ReportOutcome;
use adpulse_store::Config;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[36m";

const COLUMN_GAP: &str = "  ";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats a finished report as a table.
    pub fn format_report(&self, query: &ReportQuery, outcome: &ReportOutcome) -> String {
        let mut lines = vec![format!(
            "Account {} ({} to {})",
            self.cyan(query.account_id.as_str()),
            query.date_range.start(),
            query.date_range.end()
        )];
        lines.push(String::new());

        if outcome.rows.is_empty() {
            lines.push("No rows.".to_string());
        } else {
            lines.extend(self.table(&outcome.rows));
        }

        lines.push(String::new());
        let noun = if outcome.rows.len() == 1 { "row" } else { "rows" };
        let mut footer = format!(
            "{} {noun} via {} transport",
            outcome.rows.len(),
            outcome.source
        );
        if outcome.refreshed {
            footer.push_str(", credential refreshed");
        }
        lines.push(self.dim(&footer));

        lines.join("\n")
    }

    /// Dimensions left-aligned then metrics right-aligned, in key order of
    /// the first row.
    pub(super) fn table(&self, rows: &[ReportRow]) -> Vec<String> {
        let Some(first) = rows.first() else {
            return Vec::new();
        };
        let dimensions: Vec<&String> = first.dimension_values.keys().collect();
        let metrics: Vec<&String> = first.metric_values.keys().collect();

        let header: Vec<String> = dimensions
            .iter()
            .chain(metrics.iter())
            .map(|name| (*name).clone())
            .collect();
        let body: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                let dims = dimensions
                    .iter()
                    .map(|name| row.dimension(name).unwrap_or_default().to_string());
                let mets = metrics
                    .iter()
                    .map(|name| row.metric(name).map(format_metric).unwrap_or_default());
                dims.chain(mets).collect()
            })
            .collect();

        let widths: Vec<usize> = (0..header.len())
            .map(|i| {
                body.iter()
                    .map(|cells| cells[i].chars().count())
                    .chain(std::iter::once(header[i].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let render = |cells: &[String]| -> String {
            cells
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    if i < dimensions.len() {
                        format!("{cell:<width$}", width = widths[i])
                    } else {
                        format!("{cell:>width$}", width = widths[i])
                    }
                })
                .collect::<Vec<_>>()
                .join(COLUMN_GAP)
                .trim_end()
                .to_string()
        };

        let mut lines = vec![self.bold(&render(&header))];
        let rule = widths.iter().sum::<usize>() + COLUMN_GAP.len() * widths.len().saturating_sub(1);
        lines.push(self.dim(&"─".repeat(rule)));
        lines.extend(body.iter().map(|cells| render(cells)));
        lines
    }

    /// Formats an already redacted configuration.
    pub fn format_config(&self, config: &Config) -> String {
        let unset = |value: Option<&str>| value.unwrap_or("(not set)").to_string();
        let mut lines = vec![self.bold("AdPulse Configuration"), "─".repeat(40), String::new()];

        lines.push(format!("Account:           {}", unset(config.account_id.as_deref())));
        lines.push(format!("Client ID:         {}", unset(config.client_id.as_deref())));
        lines.push(format!("Client secret:     {}", unset(config.client_secret.as_deref())));
        lines.push(format!("Token endpoint:    {}", config.token_endpoint));
        lines.push(format!(
            "Credentials:       {}",
            config
                .credentials_path
                .as_ref()
                .map_or_else(|| "(default)".to_string(), |p| p.display().to_string())
        ));
        lines.push(format!("Log level:         {}", config.log_level));
        lines.push(String::new());
        lines.push(format!("Developer token:   {}", unset(config.ads.developer_token.as_deref())));
        lines.push(format!("Login customer:    {}", unset(config.ads.login_customer_id.as_deref())));
        lines.push(format!("API version:       {}", config.ads.api_version));
        lines.push(format!("REST base URL:     {}", config.ads.rest_base_url));
        lines.push(format!("Bridge command:    {}", config.ads.rpc_command));
        lines.push(format!("Timeout:           {}s", config.transport.timeout.as_secs()));
        lines.push(format!("Insecure HTTP:     {}", config.transport.allow_insecure_http));

        if !config.account_overrides.is_empty() {
            lines.push(String::new());
            lines.push("Account overrides:".to_string());
            for (from, to) in &config.account_overrides {
                lines.push(format!("  {from} -> {to}"));
            }
        }

        lines.join("\n")
    }

    // ========================================================================
    // Color helpers
    // ========================================================================

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Whole numbers without decimals, everything else with two.
pub(super) fn format_metric(value: &MetricValue) -> String {
    match value {
        MetricValue::Number(n) if n.fract().abs() < f64::EPSILON && n.abs() < 1e15 => {
            format!("{n:.0}")
        }
        MetricValue::Number(n) => format!("{n:.2}"),
        MetricValue::Text(s) => s.clone(),
    }
}
