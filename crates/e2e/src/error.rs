//! Error types for live testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Preview server failed to start: {0}")]
    ServerStartup(String),

    #[error("Preview server did not bind port {port} after {attempts} attempts")]
    StartupTimeout { port: u16, attempts: u32 },

    #[error("Test runner could not be started: {0}")]
    TestRunnerSpawn(String),

    #[error("Test runner timed out after {0}s")]
    TestRunnerTimeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
