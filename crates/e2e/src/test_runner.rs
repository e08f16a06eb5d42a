//! Storybook test-runner invocation

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};

/// Configuration for the live test tool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestRunnerConfig {
    /// Program to execute
    pub program: String,

    /// Arguments placed before the target file
    pub args: Vec<String>,

    /// Upper bound for one invocation
    pub timeout_secs: u64,

    /// File-name suffixes stripped to derive the test identifier
    pub story_suffixes: Vec<String>,
}

impl Default for TestRunnerConfig {
    fn default() -> Self {
        Self {
            program: "npx".to_string(),
            args: vec!["test-storybook".to_string()],
            timeout_secs: 120,
            story_suffixes: [
                ".stories.tsx",
                ".stories.ts",
                ".stories.jsx",
                ".stories.js",
                ".stories.mdx",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl TestRunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Captured output of one test-runner invocation
#[derive(Debug, Clone)]
pub struct LiveTestOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// stdout followed by stderr
    pub text: String,
}

/// Derive the identifier the test runner uses for a story file:
/// the file name without its story suffix, or the file stem otherwise.
pub fn derive_test_identifier(path: &Path, suffixes: &[String]) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    for suffix in suffixes {
        if let Some(stripped) = file_name.strip_suffix(suffix.as_str()) {
            if !stripped.is_empty() {
                return stripped.to_string();
            }
        }
    }

    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or(file_name)
}

/// Run the test runner for one story file against a running server.
///
/// A non-zero exit is not an error: failing stories are reported on the
/// output streams and the caller classifies them.
pub async fn run_test_runner(
    config: &TestRunnerConfig,
    target: &Path,
    base_url: &str,
    working_dir: &Path,
) -> E2eResult<LiveTestOutput> {
    let mut cmd = Command::new(&config.program);
    cmd.args(&config.args)
        .arg(target)
        .arg("--url")
        .arg(base_url)
        .current_dir(working_dir)
        .env("CI", "true")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    info!("Running {} against {}", config.program, base_url);
    debug!("Test runner target: {}", target.display());

    let output = match timeout(config.timeout(), cmd.output()).await {
        Ok(result) => result.map_err(|e| {
            E2eError::TestRunnerSpawn(format!("Failed to spawn {}: {}", config.program, e))
        })?,
        Err(_) => return Err(E2eError::TestRunnerTimeout(config.timeout_secs)),
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = format!("{}\n{}", stdout, stderr);

    debug!(
        "Test runner exited with {:?} ({} bytes of output)",
        output.status.code(),
        text.len()
    );

    Ok(LiveTestOutput {
        success: output.status.success(),
        exit_code: output.status.code(),
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use test_case::test_case;

    #[test_case("src/Button.stories.tsx", "Button" ; "tsx story")]
    #[test_case("Card.stories.js", "Card" ; "js story")]
    #[test_case("src/forms/Input.tsx", "Input" ; "no story suffix")]
    #[test_case(".stories.tsx", ".stories" ; "suffix only")]
    fn test_derive_test_identifier(path: &str, expected: &str) {
        let suffixes = TestRunnerConfig::default().story_suffixes;
        assert_eq!(derive_test_identifier(&PathBuf::from(path), &suffixes), expected);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_keeps_output() {
        let config = TestRunnerConfig {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "echo out; echo \"err $0 $1 $2\" >&2; exit 1".to_string(),
            ],
            ..Default::default()
        };
        let dir = std::env::temp_dir();
        let output = run_test_runner(&config, Path::new("Button.stories.tsx"), "http://127.0.0.1:1", &dir)
            .await
            .unwrap();

        assert!(!output.success);
        assert_eq!(output.exit_code, Some(1));
        assert!(output.text.contains("out"));
        assert!(output.text.contains("err Button.stories.tsx --url http://127.0.0.1:1"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_reported() {
        let config = TestRunnerConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "sleep 5".to_string()],
            timeout_secs: 0,
            ..Default::default()
        };
        let dir = std::env::temp_dir();
        let err = run_test_runner(&config, Path::new("x"), "http://127.0.0.1:1", &dir)
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::TestRunnerTimeout(0)));
    }
}
