//! End-to-end validation runs against throwaway projects.
//!
//! External tools are replaced with `sh` scripts through the same config
//! fields a real project would use, so every runner takes its real path.

#![cfg(unix)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use specgate_checks::config::{FormatConfig, LintConfig, LiveConfig, TypecheckConfig};
use specgate_checks::{
    CheckContext, CheckRunner, FormatRunner, LiveTestRunner, NamedResults, Validator,
    ValidatorConfig,
};
use specgate_common::{check_names, CheckResult, CheckStatus, OverallStatus};
use specgate_e2e::{PortProbe, PreviewServer, ServerConfig};

const CSF3_STORY: &str = r#"import type { Meta, StoryObj } from '@storybook/react';
import { Button } from './Button';

const meta = { component: Button, tags: ['autodocs'] } satisfies Meta<typeof Button>;
export default meta;
type Story = StoryObj<typeof meta>;

export const Primary: Story = { args: { primary: true, label: 'Button' } };
"#;

const CSF2_STORY: &str = r#"import { ComponentStory, ComponentMeta } from '@storybook/react';
import { Button } from './Button';

export default { title: 'Example/Button', component: Button } as ComponentMeta<typeof Button>;
const Template: ComponentStory<typeof Button> = (args) => <Button {...args} />;
export const Primary = Template.bind({});
"#;

const RENDER_FAILURE: &str = "\
FAIL browser: chromium src/Button.stories.tsx
  Example/Button
    Primary
      ✕ smoke-test (2013 ms)
      ✓ play-test (412 ms)

  ● Example/Button › Primary › smoke-test

    page.evaluate: StorybookTestRunnerError: An error occurred in the following story:

    Message:
      Cannot read properties of undefined (reading 'label')

      at Button (src/Button.stories.tsx:9:21)
      at renderWithHooks (node_modules/react-dom/cjs/react-dom.development.js:16305:18)

Test Suites: 1 failed, 1 total
Tests:       1 failed, 1 passed, 2 total";

struct Project {
    dir: TempDir,
}

impl Project {
    fn new(story: &str, manifest: &str) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), manifest).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/Button.stories.tsx"), story).unwrap();
        Self { dir }
    }

    fn with_live_dependency(story: &str) -> Self {
        Self::new(
            story,
            r#"{ "name": "ui-kit", "devDependencies": { "@storybook/test-runner": "^0.19.0" } }"#,
        )
    }

    fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    fn target(&self) -> PathBuf {
        self.dir.path().join("src/Button.stories.tsx")
    }

    fn touch(&self, name: &str) {
        std::fs::write(self.dir.path().join(name), "{}").unwrap();
    }
}

fn shell(script: &str) -> (String, Vec<String>) {
    ("sh".to_string(), vec!["-c".to_string(), script.to_string()])
}

fn lint(script: &str) -> LintConfig {
    let (program, args) = shell(script);
    LintConfig {
        program,
        args,
        ..Default::default()
    }
}

fn typecheck(script: &str) -> TypecheckConfig {
    let (program, mut args) = shell(script);
    args.push("tsc".to_string());
    TypecheckConfig {
        program,
        args,
        ..Default::default()
    }
}

struct NeverBound;

#[async_trait]
impl PortProbe for NeverBound {
    async fn is_bound(&self, _host: &str, _port: u16) -> bool {
        false
    }
}

struct AlwaysBound;

#[async_trait]
impl PortProbe for AlwaysBound {
    async fn is_bound(&self, _host: &str, _port: u16) -> bool {
        true
    }
}

fn sleeper(root: &Path, probe: Arc<dyn PortProbe>) -> Arc<PreviewServer> {
    let config = ServerConfig {
        program: "sleep".to_string(),
        args: vec!["30".to_string()],
        port: 6108,
        poll_interval_ms: 10,
        max_attempts: 3,
        shutdown_grace_ms: 50,
        working_dir: Some(root.to_path_buf()),
        ..Default::default()
    };
    Arc::new(PreviewServer::with_probe(config, probe))
}

/// Validator with real runners, the live one backed by `server`
fn validator(project: &Project, config: ValidatorConfig, server: Arc<PreviewServer>) -> Validator {
    let runners: Vec<Box<dyn CheckRunner>> = vec![
        Box::new(specgate_checks::LintRunner::new(config.lint)),
        Box::new(specgate_checks::TypecheckRunner::new(config.typecheck)),
        Box::new(FormatRunner::new(config.format)),
        Box::new(LiveTestRunner::new(config.live, server.clone())),
    ];
    Validator::with_runners(project.target(), project.root(), server, runners)
}

fn status(report: &specgate_common::ValidationReport, name: &str) -> CheckStatus {
    report.check(name).map(CheckResult::status).unwrap()
}

#[tokio::test]
async fn unconfigured_modern_story_passes() {
    let project = Project::new(CSF3_STORY, r#"{ "name": "ui-kit" }"#);
    let validator = Validator::new(project.target(), project.root(), ValidatorConfig::default());

    let report = validator.validate().await;

    assert_eq!(report.checks().len(), check_names::ALL.len());
    for name in check_names::ALL {
        assert!(report.check(name).is_some(), "missing {}", name);
    }
    assert_eq!(status(&report, check_names::FORMAT_COMPLIANCE), CheckStatus::Pass);
    for name in [
        check_names::LINTING,
        check_names::TYPESCRIPT,
        check_names::RENDER_TEST,
        check_names::INTERACTION_TEST,
    ] {
        assert_eq!(status(&report, name), CheckStatus::Skip, "{}", name);
    }

    let summary = report.summary();
    assert_eq!(summary.total_checks, 5);
    assert_eq!(summary.passed_checks, 1);
    assert_eq!(summary.skipped_checks, 4);
    assert_eq!(summary.score, 100);
    assert_eq!(summary.overall_status, OverallStatus::Pass);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn deprecated_story_fails() {
    let project = Project::new(CSF2_STORY, r#"{ "name": "ui-kit" }"#);
    let validator = Validator::new(project.target(), project.root(), ValidatorConfig::default());

    let report = validator.validate().await;

    let format = report.check(check_names::FORMAT_COMPLIANCE).unwrap();
    assert_eq!(format.status(), CheckStatus::Fail);
    assert_eq!(format.metadata().unwrap()["format"], "csf2");
    assert_eq!(report.summary().score, 0);
    assert_eq!(report.summary().overall_status, OverallStatus::Fail);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn configured_tools_run_against_the_target() {
    let project = Project::new(CSF3_STORY, r#"{ "name": "ui-kit" }"#);
    project.touch(".eslintrc.json");
    project.touch("tsconfig.json");

    let config = ValidatorConfig {
        lint: lint("case \"$0\" in *Button.stories.tsx) exit 0;; *) exit 1;; esac"),
        typecheck: typecheck("grep -q 'src/Button.stories.tsx' \"$2\""),
        ..Default::default()
    };
    let validator = Validator::new(project.target(), project.root(), config);

    let report = validator.validate().await;

    assert_eq!(status(&report, check_names::LINTING), CheckStatus::Pass);
    assert_eq!(status(&report, check_names::TYPESCRIPT), CheckStatus::Pass);
    assert_eq!(report.summary().passed_checks, 3);
    assert_eq!(report.summary().score, 100);
}

#[tokio::test]
async fn tool_failures_lower_the_score() {
    let project = Project::new(CSF3_STORY, r#"{ "name": "ui-kit" }"#);
    project.touch("eslint.config.js");
    project.touch("tsconfig.json");

    let config = ValidatorConfig {
        lint: lint("echo \"$0\"; echo '  7:7  error  Unexpected any  @typescript-eslint/no-explicit-any'; exit 1"),
        typecheck: typecheck("exit 0"),
        ..Default::default()
    };
    let validator = Validator::new(project.target(), project.root(), config);

    let report = validator.validate().await;

    let linting = report.check(check_names::LINTING).unwrap();
    assert_eq!(linting.status(), CheckStatus::Fail);
    assert!(linting.error_text().unwrap().contains("no-explicit-any"));

    // 2 of 3 scored checks pass
    assert_eq!(report.summary().score, 67);
    assert_eq!(report.summary().overall_status, OverallStatus::Warning);
    assert_eq!(report.exit_code(), 2);

    let leftovers = std::fs::read_dir(project.dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("tsconfig.specgate-"))
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn startup_timeout_fails_both_live_checks() {
    let project = Project::with_live_dependency(CSF3_STORY);
    let server = sleeper(&project.root(), Arc::new(NeverBound));
    let validator = validator(&project, ValidatorConfig::default(), server.clone());

    let report = validator.validate().await;

    for name in [check_names::RENDER_TEST, check_names::INTERACTION_TEST] {
        let result = report.check(name).unwrap();
        assert_eq!(result.status(), CheckStatus::Fail);
        assert!(result.error_text().unwrap().contains("6108"));
    }
    assert!(server.process_id().is_none());

    validator.cleanup();
    validator.cleanup();
    assert!(!server.is_running());
}

#[tokio::test]
async fn interrupt_stops_server_mid_run() {
    let project = Project::with_live_dependency(CSF3_STORY);
    let mut live = LiveConfig::default();
    live.runner.program = "sh".to_string();
    live.runner.args = vec!["-c".to_string(), "sleep 5".to_string()];
    let config = ValidatorConfig {
        live,
        ..Default::default()
    };
    let server = sleeper(&project.root(), Arc::new(AlwaysBound));
    let validator = validator(&project, config, server.clone());

    let started = std::time::Instant::now();
    let interrupt = tokio::time::sleep(std::time::Duration::from_millis(200));
    let report = validator.validate_until(interrupt).await;

    assert!(report.is_none());
    assert!(started.elapsed() < std::time::Duration::from_secs(4));
    assert!(server.process_id().is_none());
    assert!(!server.is_running());
}

#[tokio::test]
async fn validation_finishing_first_returns_report() {
    let project = Project::new(CSF3_STORY, r#"{ "name": "ui-kit" }"#);
    let server = sleeper(&project.root(), Arc::new(NeverBound));
    let validator = validator(&project, ValidatorConfig::default(), server.clone());

    let report = validator.validate_until(std::future::pending()).await;

    let report = report.unwrap();
    assert_eq!(status(&report, check_names::FORMAT_COMPLIANCE), CheckStatus::Pass);
    assert!(server.process_id().is_none());
}

#[tokio::test]
async fn render_failure_is_classified_independently() {
    let project = Project::with_live_dependency(CSF3_STORY);
    let fixture = project.dir.path().join("runner-output.txt");
    std::fs::write(&fixture, RENDER_FAILURE).unwrap();

    let mut live = LiveConfig::default();
    live.runner.program = "sh".to_string();
    live.runner.args = vec![
        "-c".to_string(),
        format!("cat '{}'; exit 1", fixture.display()),
    ];
    let config = ValidatorConfig {
        live,
        ..Default::default()
    };
    let server = sleeper(&project.root(), Arc::new(AlwaysBound));
    let validator = validator(&project, config, server.clone());

    let report = validator.validate().await;

    let render = report.check(check_names::RENDER_TEST).unwrap();
    assert_eq!(render.status(), CheckStatus::Fail);
    assert!(render
        .error_text()
        .unwrap()
        .contains("Cannot read properties of undefined"));
    assert_eq!(status(&report, check_names::INTERACTION_TEST), CheckStatus::Pass);
    assert!(server.process_id().is_none());
}

#[tokio::test]
async fn panicking_runner_does_not_affect_others() {
    struct Exploding;

    #[async_trait]
    impl CheckRunner for Exploding {
        fn name(&self) -> &'static str {
            "lint"
        }

        fn checks(&self) -> &'static [&'static str] {
            &[check_names::LINTING]
        }

        async fn run(&self, _ctx: &CheckContext) -> specgate_checks::Result<NamedResults> {
            panic!("unexpected linter state");
        }
    }

    let project = Project::new(CSF3_STORY, r#"{ "name": "ui-kit" }"#);
    let server = sleeper(&project.root(), Arc::new(NeverBound));
    let runners: Vec<Box<dyn CheckRunner>> = vec![
        Box::new(Exploding),
        Box::new(FormatRunner::new(FormatConfig::default())),
    ];
    let validator = Validator::with_runners(project.target(), project.root(), server, runners);

    let report = validator.validate().await;

    assert_eq!(status(&report, check_names::LINTING), CheckStatus::Error);
    assert_eq!(status(&report, check_names::FORMAT_COMPLIANCE), CheckStatus::Pass);
    assert_eq!(report.summary().failed_checks, 1);
    assert_eq!(report.summary().score, 50);
    assert_eq!(report.summary().overall_status, OverallStatus::Fail);
}

#[tokio::test]
async fn report_serializes_with_stable_field_names() {
    let project = Project::new(CSF3_STORY, r#"{ "name": "ui-kit" }"#);
    let validator = Validator::new(project.target(), project.root(), ValidatorConfig::default());

    let report = validator.validate().await;
    let json = serde_json::to_value(&report).unwrap();

    assert!(json["target"].as_str().unwrap().ends_with("Button.stories.tsx"));
    assert!(json["timestamp"].is_string());
    assert_eq!(json["checks"]["formatCompliance"]["status"], "PASS");
    assert_eq!(json["checks"]["formatCompliance"]["metadata"]["format"], "csf3");
    assert_eq!(json["checks"]["linting"]["status"], "SKIP");
    assert_eq!(json["summary"]["totalChecks"], 5);
    assert_eq!(json["summary"]["overallStatus"], "PASS");
}
