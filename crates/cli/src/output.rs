//! Output formatting for CLI

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use std::path::Path;

use specgate_common::{CheckStatus, OverallStatus, ValidationReport};

/// Longest diagnostic shown per check in the human format
const MAX_DIAGNOSTIC_CHARS: usize = 100;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

fn status_icon(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "✅",
        CheckStatus::Fail => "❌",
        CheckStatus::Skip => "⏭️",
        CheckStatus::Error => "⚠️",
    }
}

/// First line of `text`, cut to `max` characters
pub fn truncate(text: &str, max: usize) -> String {
    let first = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let multiline = text.trim().lines().count() > 1;

    if first.chars().count() > max {
        let cut: String = first.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut.trim_end())
    } else if multiline {
        format!("{} …", first)
    } else {
        first.to_string()
    }
}

pub fn render_json(report: &ValidationReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn render_table(report: &ValidationReport) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["", "Check", "Status", "Details"]);

    for (name, result) in report.checks() {
        table.add_row(vec![
            status_icon(result.status()).to_string(),
            name.clone(),
            result.status().to_string(),
            result
                .error_text()
                .map(|text| truncate(text, MAX_DIAGNOSTIC_CHARS))
                .unwrap_or_default(),
        ]);
    }

    table.to_string()
}

/// Print the report in the requested format
pub fn print_report(report: &ValidationReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", render_json(report)?),
        OutputFormat::Table => {
            let summary = report.summary();
            println!("{}", "━".repeat(60).dimmed());
            println!(" {} {}", "Validating".bold(), report.target().cyan());
            println!("{}", "━".repeat(60).dimmed());
            println!("{}", render_table(report));

            let verdict = match summary.overall_status {
                OverallStatus::Pass => summary.overall_status.to_string().green().bold(),
                OverallStatus::Warning => summary.overall_status.to_string().yellow().bold(),
                OverallStatus::Fail => summary.overall_status.to_string().red().bold(),
            };
            println!(
                "Score: {}/100  {}  ({} passed, {} failed, {} skipped of {})",
                summary.score.to_string().bold(),
                verdict,
                summary.passed_checks,
                summary.failed_checks,
                summary.skipped_checks,
                summary.total_checks
            );
            println!(
                "{}",
                format!("Checked at {}", report.timestamp().format("%Y-%m-%d %H:%M:%S UTC"))
                    .dimmed()
            );
        }
    }
    Ok(())
}

/// Write the JSON report to `path`
pub fn write_report(report: &ValidationReport, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, render_json(report)?)?;
    Ok(())
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}
