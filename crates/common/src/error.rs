//! Error types for specgate

use thiserror::Error;

/// Result type alias using the specgate common Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while assembling a validation report
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Check already recorded: {0}")]
    DuplicateCheck(String),

    #[error("Invalid check status: {0}")]
    InvalidStatus(String),
}
