//! Live render and interaction tests against the preview server

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use specgate_common::{check_names, CheckResult};
use specgate_e2e::{
    derive_test_identifier, run_test_runner, JestTextClassifier, LiveTestClassification,
    OutputClassifier, PreviewServer,
};

use crate::config::LiveConfig;
use crate::error::Result;
use crate::runner::{CheckContext, CheckRunner, NamedResults};

/// Owns one preview-server lifecycle per run: start, test, stop
pub struct LiveTestRunner {
    config: LiveConfig,
    server: Arc<PreviewServer>,
    classifier: Arc<dyn OutputClassifier>,
}

impl LiveTestRunner {
    pub fn new(config: LiveConfig, server: Arc<PreviewServer>) -> Self {
        let classifier = Arc::new(JestTextClassifier::new(
            &config.render_tags,
            &config.interaction_tags,
        ));
        Self::with_classifier(config, server, classifier)
    }

    pub fn with_classifier(
        config: LiveConfig,
        server: Arc<PreviewServer>,
        classifier: Arc<dyn OutputClassifier>,
    ) -> Self {
        Self {
            config,
            server,
            classifier,
        }
    }

    fn results(classification: LiveTestClassification) -> NamedResults {
        vec![
            (check_names::RENDER_TEST, classification.render),
            (check_names::INTERACTION_TEST, classification.interaction),
        ]
    }
}

#[async_trait]
impl CheckRunner for LiveTestRunner {
    fn name(&self) -> &'static str {
        "live"
    }

    fn checks(&self) -> &'static [&'static str] {
        &[check_names::RENDER_TEST, check_names::INTERACTION_TEST]
    }

    async fn run(&self, ctx: &CheckContext) -> Result<NamedResults> {
        let declared = ctx
            .manifest
            .as_ref()
            .is_some_and(|manifest| manifest.has_dependency(&self.config.dependency));
        if !declared {
            info!("{} is not a project dependency, skipping live tests", self.config.dependency);
            return Ok(Self::results(LiveTestClassification::uniform(
                CheckResult::skip(format!("{} is not installed", self.config.dependency)),
            )));
        }

        let identifier = derive_test_identifier(&ctx.target, &self.config.runner.story_suffixes);
        debug!("Live test identifier: {}", identifier);

        let lease = self.server.lease();
        let outcome = match lease.start().await {
            Ok(()) => {
                run_test_runner(
                    &self.config.runner,
                    &ctx.target,
                    &lease.base_url(),
                    &ctx.project_root,
                )
                .await
            }
            Err(e) => Err(e),
        };
        lease.release().await;
        let output = outcome?;

        debug!(
            "Test runner finished (exit code {:?}), classifying output",
            output.exit_code
        );
        Ok(Self::results(self.classifier.classify(&output.text, &identifier)))
    }
}
