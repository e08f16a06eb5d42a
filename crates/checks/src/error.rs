//! Error types for check runners and validation setup

use std::path::PathBuf;
use thiserror::Error;

use specgate_e2e::E2eError;

/// Result type alias using the checks Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Target file not found: {}", .0.display())]
    TargetNotFound(PathBuf),

    #[error("No package.json found in {} or any parent directory", .0.display())]
    ProjectRootNotFound(PathBuf),

    #[error("Project root is not a directory: {}", .0.display())]
    InvalidProjectRoot(PathBuf),

    #[error("Invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run {tool}: {source}")]
    ToolInvocation {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Live(#[from] E2eError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
