//! Style check (ESLint)

use async_trait::async_trait;
use tracing::{debug, info};

use specgate_common::{check_names, CheckResult};

use crate::config::LintConfig;
use crate::error::Result;
use crate::runner::{run_tool, CheckContext, CheckRunner, NamedResults};

/// Runs the configured linter against the target file
pub struct LintRunner {
    config: LintConfig,
}

impl LintRunner {
    pub fn new(config: LintConfig) -> Self {
        Self { config }
    }

    /// Name of the first linter configuration found for the project
    fn discover_config(&self, ctx: &CheckContext) -> Option<String> {
        if let Some(file) = self
            .config
            .config_files
            .iter()
            .find(|file| ctx.project_root.join(file).is_file())
        {
            return Some(file.clone());
        }

        let key = self.config.package_key.as_deref()?;
        ctx.manifest
            .as_ref()
            .filter(|manifest| manifest.has_key(key))
            .map(|_| format!("package.json#{}", key))
    }
}

#[async_trait]
impl CheckRunner for LintRunner {
    fn name(&self) -> &'static str {
        "lint"
    }

    fn checks(&self) -> &'static [&'static str] {
        &[check_names::LINTING]
    }

    async fn run(&self, ctx: &CheckContext) -> Result<NamedResults> {
        let Some(found) = self.discover_config(ctx) else {
            info!("No ESLint configuration found, skipping lint");
            return Ok(vec![(
                check_names::LINTING,
                CheckResult::skip("No ESLint configuration found"),
            )]);
        };
        debug!("Using linter configuration {}", found);

        let mut args = self.config.args.clone();
        args.push(ctx.target.to_string_lossy().into_owned());

        let output = run_tool(&self.config.program, &args, &ctx.project_root).await?;
        let result = if output.success {
            CheckResult::pass()
        } else {
            CheckResult::fail(output.diagnostic(&self.config.program))
        };

        Ok(vec![(check_names::LINTING, result)])
    }
}
