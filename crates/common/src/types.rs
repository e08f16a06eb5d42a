//! Core types for specgate

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Stable check names used as keys in a validation report
pub mod check_names {
    pub const LINTING: &str = "linting";
    pub const TYPESCRIPT: &str = "typeScript";
    pub const FORMAT_COMPLIANCE: &str = "formatCompliance";
    pub const RENDER_TEST: &str = "renderTest";
    pub const INTERACTION_TEST: &str = "interactionTest";

    /// All checks a full validation run produces
    pub const ALL: [&str; 5] = [
        LINTING,
        TYPESCRIPT,
        FORMAT_COMPLIANCE,
        RENDER_TEST,
        INTERACTION_TEST,
    ];
}

/// Outcome of a single quality gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skip,
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Skip => "SKIP",
            CheckStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PASS" => Ok(CheckStatus::Pass),
            "FAIL" => Ok(CheckStatus::Fail),
            "SKIP" => Ok(CheckStatus::Skip),
            "ERROR" => Ok(CheckStatus::Error),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

/// Result of one check.
///
/// A passing result never carries diagnostic text; the constructors are the
/// only way to build one, and deserialization goes through the same rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCheckResult")]
pub struct CheckResult {
    status: CheckStatus,
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawCheckResult {
    status: CheckStatus,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

impl TryFrom<RawCheckResult> for CheckResult {
    type Error = String;

    fn try_from(raw: RawCheckResult) -> Result<Self, Self::Error> {
        if raw.status == CheckStatus::Pass && raw.error.is_some() {
            return Err("a PASS result cannot carry an error".to_string());
        }
        Ok(Self {
            status: raw.status,
            error: raw.error,
            metadata: raw.metadata,
        })
    }
}

impl CheckResult {
    pub fn pass() -> Self {
        Self {
            status: CheckStatus::Pass,
            error: None,
            metadata: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Fail,
            error: Some(error.into()),
            metadata: None,
        }
    }

    /// A skipped check; `reason` explains why it did not run
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Skip,
            error: Some(reason.into()),
            metadata: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Error,
            error: Some(error.into()),
            metadata: None,
        }
    }

    /// Build a non-passing result with the given status
    pub fn with_status(status: CheckStatus, error: impl Into<String>) -> Self {
        match status {
            CheckStatus::Pass => Self::pass(),
            CheckStatus::Fail => Self::fail(error),
            CheckStatus::Skip => Self::skip(error),
            CheckStatus::Error => Self::error(error),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn status(&self) -> CheckStatus {
        self.status
    }

    pub fn error_text(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    pub fn is_pass(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}
