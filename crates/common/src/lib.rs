//! specgate Common Library
//!
//! Shared data model for the specgate quality gate: per-check results,
//! the validation report, and the score aggregation that turns a set of
//! results into an overall verdict.

pub mod error;
pub mod report;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use report::{OverallStatus, ReportBuilder, Summary, ValidationReport};
pub use types::{check_names, CheckResult, CheckStatus};
