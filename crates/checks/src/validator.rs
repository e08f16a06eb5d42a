//! Validator facade: run every check concurrently and aggregate the report

use futures::future::join_all;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use specgate_common::{ReportBuilder, ValidationReport};
use specgate_e2e::PreviewServer;

use crate::config::ValidatorConfig;
use crate::format::FormatRunner;
use crate::lint::LintRunner;
use crate::live::LiveTestRunner;
use crate::runner::{run_isolated, CheckContext, CheckRunner};
use crate::typecheck::TypecheckRunner;

/// Validates one story file.
///
/// The preview server is owned here and shared with the live-test runner,
/// so [`Validator::cleanup`] can stop it from outside a run (e.g. on
/// interrupt) while the runner holds its own scoped lease.
pub struct Validator {
    ctx: CheckContext,
    server: Arc<PreviewServer>,
    runners: Vec<Box<dyn CheckRunner>>,
}

impl Validator {
    /// Build a validator with the standard four runners
    pub fn new(target: PathBuf, project_root: PathBuf, mut config: ValidatorConfig) -> Self {
        config.server.working_dir = Some(project_root.clone());
        let server = Arc::new(PreviewServer::new(config.server));

        let runners: Vec<Box<dyn CheckRunner>> = vec![
            Box::new(LintRunner::new(config.lint)),
            Box::new(TypecheckRunner::new(config.typecheck)),
            Box::new(FormatRunner::new(config.format)),
            Box::new(LiveTestRunner::new(config.live, server.clone())),
        ];

        Self::with_runners(target, project_root, server, runners)
    }

    /// Build a validator from explicit parts
    pub fn with_runners(
        target: PathBuf,
        project_root: PathBuf,
        server: Arc<PreviewServer>,
        runners: Vec<Box<dyn CheckRunner>>,
    ) -> Self {
        Self {
            ctx: CheckContext::new(target, project_root),
            server,
            runners,
        }
    }

    pub fn context(&self) -> &CheckContext {
        &self.ctx
    }

    pub fn server(&self) -> &Arc<PreviewServer> {
        &self.server
    }

    /// Run all checks and return the finished report.
    ///
    /// Runners execute concurrently and never cancel each other; each one's
    /// failure is folded into its own results.
    pub async fn validate(&self) -> ValidationReport {
        info!("Validating {}", self.ctx.target.display());

        let outcomes = join_all(
            self.runners
                .iter()
                .map(|runner| run_isolated(runner.as_ref(), &self.ctx)),
        )
        .await;

        let mut builder = ReportBuilder::new(self.ctx.target.display().to_string());
        for (name, result) in outcomes.into_iter().flatten() {
            if let Err(e) = builder.record(name, result) {
                warn!("Dropping result: {}", e);
            }
        }
        let report = builder.finish();

        let summary = report.summary();
        info!(
            "Validation finished: {} ({}/100, {} passed, {} failed, {} skipped)",
            summary.overall_status,
            summary.score,
            summary.passed_checks,
            summary.failed_checks,
            summary.skipped_checks
        );
        report
    }

    /// Run all checks unless `interrupt` resolves first. On interrupt the
    /// in-flight checks are abandoned, the preview server is stopped and
    /// `None` is returned.
    pub async fn validate_until<F>(&self, interrupt: F) -> Option<ValidationReport>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            report = self.validate() => Some(report),
            _ = interrupt => {
                warn!("Interrupted, stopping preview server");
                self.server.shutdown().await;
                None
            }
        }
    }

    /// Stop the preview server if it is still running. Safe to call repeatedly.
    pub fn cleanup(&self) {
        self.server.stop();
    }
}

impl Drop for Validator {
    fn drop(&mut self) {
        self.cleanup();
    }
}
