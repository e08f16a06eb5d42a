//! Validator configuration
//!
//! Loaded from `specgate.toml` in the project root when present. Every
//! section and field has a default, so a partial file only overrides what
//! it names:
//!
//! ```toml
//! [server]
//! port = 6007
//!
//! [live]
//! timeout_secs = 300
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use specgate_e2e::{ServerConfig, TestRunnerConfig};

use crate::error::{Error, Result};

/// Default config file name looked up in the project root
pub const CONFIG_FILE_NAME: &str = "specgate.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub lint: LintConfig,
    pub typecheck: TypecheckConfig,
    pub format: FormatConfig,
    pub live: LiveConfig,
    pub server: ServerConfig,
}

/// Style checker (ESLint)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    pub program: String,
    pub args: Vec<String>,

    /// Files whose presence in the project root means the linter is configured
    pub config_files: Vec<String>,

    /// `package.json` key that also counts as configuration
    pub package_key: Option<String>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            program: "npx".to_string(),
            args: vec!["eslint".to_string()],
            config_files: [
                "eslint.config.js",
                "eslint.config.mjs",
                "eslint.config.cjs",
                "eslint.config.ts",
                ".eslintrc",
                ".eslintrc.js",
                ".eslintrc.cjs",
                ".eslintrc.json",
                ".eslintrc.yml",
                ".eslintrc.yaml",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            package_key: Some("eslintConfig".to_string()),
        }
    }
}

/// Type checker (TypeScript)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypecheckConfig {
    pub program: String,

    /// Arguments placed before `-p <scoped config>`
    pub args: Vec<String>,

    /// Base configuration the scoped config extends
    pub base_config: String,

    /// Globs excluded from the scoped config
    pub exclude: Vec<String>,
}

impl Default for TypecheckConfig {
    fn default() -> Self {
        Self {
            program: "npx".to_string(),
            args: vec!["tsc".to_string()],
            base_config: "tsconfig.json".to_string(),
            exclude: [
                "node_modules",
                "**/*.test.ts",
                "**/*.test.tsx",
                "**/*.spec.ts",
                "**/*.spec.tsx",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Story format markers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub modern_label: String,
    pub modern_markers: Vec<String>,
    pub deprecated_label: String,
    pub deprecated_markers: Vec<String>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            modern_label: "csf3".to_string(),
            modern_markers: ["StoryObj<", "satisfies Meta", "Meta<typeof"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            deprecated_label: "csf2".to_string(),
            deprecated_markers: ["Template.bind(", "ComponentStory<", "ComponentMeta<", "storiesOf("]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Live render/interaction tests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Package that must be a project dependency for live tests to run
    pub dependency: String,

    #[serde(flatten)]
    pub runner: TestRunnerConfig,

    pub render_tags: Vec<String>,
    pub interaction_tags: Vec<String>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            dependency: "@storybook/test-runner".to_string(),
            runner: TestRunnerConfig::default(),
            render_tags: vec!["smoke-test".to_string(), "smoke".to_string(), "render".to_string()],
            interaction_tags: vec![
                "play-test".to_string(),
                "play".to_string(),
                "interaction".to_string(),
            ],
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let port = config.server.port;
        config.server.set_port(port);
        Ok(config)
    }

    /// `specgate.toml` in the project root
    pub fn default_path(project_root: &Path) -> PathBuf {
        project_root.join(CONFIG_FILE_NAME)
    }
}
