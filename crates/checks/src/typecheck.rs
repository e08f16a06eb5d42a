//! Type check (TypeScript) scoped to the target file
//!
//! `tsc` has no "check just this file with the project settings" mode, so a
//! throwaway config is written next to the project's own one. It extends the
//! base config and includes only the target. The file is a
//! [`tempfile::NamedTempFile`], removed when it drops on any exit path.

use async_trait::async_trait;
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use specgate_common::{check_names, CheckResult};

use crate::config::TypecheckConfig;
use crate::error::Result;
use crate::runner::{run_tool, CheckContext, CheckRunner, NamedResults};

/// Prefix of the scoped configuration written into the project root
pub const SCOPED_CONFIG_PREFIX: &str = "tsconfig.specgate-";

pub struct TypecheckRunner {
    config: TypecheckConfig,
}

impl TypecheckRunner {
    pub fn new(config: TypecheckConfig) -> Self {
        Self { config }
    }

    fn scoped_config(&self, ctx: &CheckContext) -> serde_json::Value {
        json!({
            "extends": format!("./{}", self.config.base_config),
            "compilerOptions": { "noEmit": true },
            "include": [ctx.relative_target()],
            "exclude": self.config.exclude,
        })
    }

    fn write_scoped_config(&self, ctx: &CheckContext) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix(SCOPED_CONFIG_PREFIX)
            .suffix(".json")
            .tempfile_in(&ctx.project_root)?;

        serde_json::to_writer_pretty(&mut file, &self.scoped_config(ctx))?;
        file.flush()?;

        debug!("Wrote scoped type-check config {}", file.path().display());
        Ok(file)
    }
}

#[async_trait]
impl CheckRunner for TypecheckRunner {
    fn name(&self) -> &'static str {
        "typecheck"
    }

    fn checks(&self) -> &'static [&'static str] {
        &[check_names::TYPESCRIPT]
    }

    async fn run(&self, ctx: &CheckContext) -> Result<NamedResults> {
        if !ctx.project_root.join(&self.config.base_config).is_file() {
            info!("No {} found, skipping type check", self.config.base_config);
            return Ok(vec![(
                check_names::TYPESCRIPT,
                CheckResult::skip(format!("No {} found", self.config.base_config)),
            )]);
        }

        let scoped = self.write_scoped_config(ctx)?;

        let mut args = self.config.args.clone();
        args.push("-p".to_string());
        args.push(scoped.path().to_string_lossy().into_owned());

        let output = run_tool(&self.config.program, &args, &ctx.project_root).await?;
        let result = if output.success {
            CheckResult::pass()
        } else {
            CheckResult::fail(output.diagnostic(&self.config.program))
        };

        Ok(vec![(check_names::TYPESCRIPT, result)])
    }
}
