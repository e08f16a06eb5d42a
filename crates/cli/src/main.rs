//! specgate CLI - Main Entry Point
//!
//! Runs every quality gate against one Storybook story file and exits with
//! 0 (pass), 2 (warning) or 1 (failure, usage error or interrupt).

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

use specgate_checks::{resolve, Validator, ValidatorConfig};

mod output;

use output::OutputFormat;

/// Exit code for failures, usage errors and interrupts
const EXIT_FAILURE: u8 = 1;

/// specgate - quality gates for component story files
#[derive(Parser, Debug)]
#[command(name = "specgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Story file to validate
    target: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Project root (default: nearest ancestor with a package.json)
    #[arg(long, env = "SPECGATE_PROJECT_ROOT")]
    project_root: Option<PathBuf>,

    /// Configuration file (default: <project root>/specgate.toml)
    #[arg(long, env = "SPECGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Preview server port
    #[arg(long)]
    port: Option<u16>,

    /// Live test timeout in seconds
    #[arg(long)]
    live_timeout: Option<u64>,

    /// Also write the JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        }
    }

    /// Load configuration and apply command-line overrides
    fn load_config(&self, project_root: &std::path::Path) -> anyhow::Result<ValidatorConfig> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| ValidatorConfig::default_path(project_root));
        let mut config = ValidatorConfig::load(&path)?;

        if let Some(port) = self.port {
            config.server.set_port(port);
        }
        if let Some(secs) = self.live_timeout {
            config.live.runner.timeout_secs = secs;
        }
        Ok(config)
    }
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let (target, project_root) = resolve(&cli.target, cli.project_root.as_deref())?;
    let config = cli.load_config(&project_root)?;
    info!("Project root: {}", project_root.display());

    let validator = Validator::new(target, project_root, config);

    let Some(report) = validator.validate_until(shutdown_signal()).await else {
        return Ok(EXIT_FAILURE);
    };
    validator.cleanup();

    output::print_report(&report, cli.format())?;
    if let Some(path) = &cli.output {
        output::write_report(&report, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(report.exit_code() as u8)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays parseable
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
