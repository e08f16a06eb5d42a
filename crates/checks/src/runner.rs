//! The check-runner seam and its failure-isolation wrapper
//!
//! Runners are free to fail with `?`; [`run_isolated`] turns whatever
//! happens inside a runner (an error or a panic) into results for the
//! checks it owns, so one runner can never take down its siblings.

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use specgate_common::{CheckResult, CheckStatus};

use crate::error::{Error, Result};
use crate::project::PackageManifest;

/// Results a runner produced, keyed by check name
pub type NamedResults = Vec<(&'static str, CheckResult)>;

/// What every runner gets to look at
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub target: PathBuf,
    pub project_root: PathBuf,
    pub manifest: Option<PackageManifest>,
}

impl CheckContext {
    pub fn new(target: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let manifest = PackageManifest::load(&project_root);
        Self {
            target: target.into(),
            project_root,
            manifest,
        }
    }

    /// Target path relative to the project root, with `/` separators
    pub fn relative_target(&self) -> String {
        let relative = self
            .target
            .strip_prefix(&self.project_root)
            .unwrap_or(&self.target);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// One independent quality gate
#[async_trait]
pub trait CheckRunner: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Report keys this runner fills
    fn checks(&self) -> &'static [&'static str];

    /// Status assigned to every owned check when the runner itself fails
    fn failure_status(&self) -> CheckStatus {
        CheckStatus::Fail
    }

    async fn run(&self, ctx: &CheckContext) -> Result<NamedResults>;
}

/// Run a runner and convert any failure into results for its checks
pub async fn run_isolated(runner: &dyn CheckRunner, ctx: &CheckContext) -> NamedResults {
    let start = Instant::now();
    debug!("Starting {} check", runner.name());

    let outcome = AssertUnwindSafe(runner.run(ctx)).catch_unwind().await;

    let mut results = match outcome {
        Ok(Ok(results)) => results,
        Ok(Err(e)) => {
            warn!("{} check failed: {}", runner.name(), e);
            uniform(runner, CheckResult::with_status(runner.failure_status(), e.to_string()))
        }
        Err(panic) => {
            error!("{} check panicked: {}", runner.name(), panic_message(&*panic));
            uniform(
                runner,
                CheckResult::error(format!(
                    "{} check panicked: {}",
                    runner.name(),
                    panic_message(&*panic)
                )),
            )
        }
    };

    for name in runner.checks() {
        if !results.iter().any(|(n, _)| n == name) {
            results.push((
                *name,
                CheckResult::error(format!("{} check produced no result", runner.name())),
            ));
        }
    }

    info!(
        "{} check finished in {} ms",
        runner.name(),
        start.elapsed().as_millis()
    );
    results
}

fn uniform(runner: &dyn CheckRunner, result: CheckResult) -> NamedResults {
    runner
        .checks()
        .iter()
        .map(|name| (*name, result.clone()))
        .collect()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Output of an external tool run to completion
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub text: String,
}

impl ToolOutput {
    /// Captured text, or a note about the exit status when the tool was silent
    pub fn diagnostic(&self, tool: &str) -> String {
        let text = self.text.trim();
        if text.is_empty() {
            match self.exit_code {
                Some(code) => format!("{} exited with status {}", tool, code),
                None => format!("{} was terminated by a signal", tool),
            }
        } else {
            text.to_string()
        }
    }
}

/// Run `program args...` in `cwd` and capture both streams
pub async fn run_tool(program: &str, args: &[String], cwd: &Path) -> Result<ToolOutput> {
    debug!("Running {} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| Error::ToolInvocation {
            tool: program.to_string(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
        (false, true) => stdout.trim_end().to_string(),
        (true, _) => stderr.trim_end().to_string(),
    };

    Ok(ToolOutput {
        success: output.status.success(),
        exit_code: output.status.code(),
        text,
    })
}
