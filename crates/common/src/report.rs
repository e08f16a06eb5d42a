//! Validation report and result aggregation
//!
//! A report is assembled through [`ReportBuilder`]: each check records its
//! result once, then [`ReportBuilder::finish`] derives the [`Summary`] and
//! yields an immutable [`ValidationReport`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::types::{CheckResult, CheckStatus};

/// Minimum score for an overall pass
pub const PASS_THRESHOLD: u8 = 80;

/// Minimum score for a warning instead of a failure
pub const WARNING_THRESHOLD: u8 = 60;

/// Overall verdict derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    Pass,
    Warning,
    Fail,
}

impl OverallStatus {
    /// Map a score to a verdict
    pub fn from_score(score: u8) -> Self {
        if score >= PASS_THRESHOLD {
            OverallStatus::Pass
        } else if score >= WARNING_THRESHOLD {
            OverallStatus::Warning
        } else {
            OverallStatus::Fail
        }
    }

    /// Process exit code for this verdict
    pub fn exit_code(&self) -> i32 {
        match self {
            OverallStatus::Pass => 0,
            OverallStatus::Fail => 1,
            OverallStatus::Warning => 2,
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallStatus::Pass => write!(f, "PASS"),
            OverallStatus::Warning => write!(f, "WARNING"),
            OverallStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// Counts and score over every recorded check.
///
/// `ERROR` results are counted as failed and stay in the scoring
/// denominator; only `SKIP` results are excluded from scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_checks: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
    pub skipped_checks: usize,
    pub score: u8,
    pub overall_status: OverallStatus,
}

impl Summary {
    /// Aggregate a set of results
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a CheckResult>) -> Self {
        let mut total = 0;
        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for result in results {
            total += 1;
            match result.status() {
                CheckStatus::Pass => passed += 1,
                CheckStatus::Fail | CheckStatus::Error => failed += 1,
                CheckStatus::Skip => skipped += 1,
            }
        }

        let score = score(passed, total - skipped);

        Self {
            total_checks: total,
            passed_checks: passed,
            failed_checks: failed,
            skipped_checks: skipped,
            score,
            overall_status: OverallStatus::from_score(score),
        }
    }
}

/// `round(100 * passed / scored)`, rounding half up; 0 when nothing was scored
pub fn score(passed: usize, scored: usize) -> u8 {
    if scored == 0 {
        return 0;
    }
    let passed = passed.min(scored);
    ((200 * passed + scored) / (2 * scored)) as u8
}

/// Accumulates check results for one target
#[derive(Debug)]
pub struct ReportBuilder {
    target: String,
    timestamp: DateTime<Utc>,
    checks: BTreeMap<String, CheckResult>,
}

impl ReportBuilder {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            timestamp: Utc::now(),
            checks: BTreeMap::new(),
        }
    }

    /// Record the result for `name`; each name may be recorded once
    pub fn record(&mut self, name: impl Into<String>, result: CheckResult) -> Result<()> {
        let name = name.into();
        if self.checks.contains_key(&name) {
            return Err(Error::DuplicateCheck(name));
        }
        self.checks.insert(name, result);
        Ok(())
    }

    /// Compute the summary and seal the report
    pub fn finish(self) -> ValidationReport {
        let summary = Summary::from_results(self.checks.values());
        ValidationReport {
            target: self.target,
            timestamp: self.timestamp,
            checks: self.checks,
            summary,
        }
    }
}

/// Immutable result of validating one target file
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    target: String,
    timestamp: DateTime<Utc>,
    checks: BTreeMap<String, CheckResult>,
    summary: Summary,
}

impl ValidationReport {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn checks(&self) -> &BTreeMap<String, CheckResult> {
        &self.checks
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.get(name)
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn exit_code(&self) -> i32 {
        self.summary.overall_status.exit_code()
    }
}
