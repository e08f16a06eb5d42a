//! specgate live-test support
//!
//! Everything the live render/interaction check needs from the outside world:
//! - supervising the Storybook preview server as a subprocess
//! - invoking the Storybook test runner against one story file
//! - classifying the runner's free-text output per sub-test
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  PreviewServer                                           │
//! │    ├── start()  spawn + poll port (1s x 30)              │
//! │    ├── stop()   SIGTERM/SIGKILL process group, idempotent│
//! │    └── lease()  -> ServerLease (stops on drop)           │
//! ├──────────────────────────────────────────────────────────┤
//! │  run_test_runner(file, base_url) -> LiveTestOutput       │
//! ├──────────────────────────────────────────────────────────┤
//! │  OutputClassifier::classify(text, identifier)            │
//! │    -> { render: CheckResult, interaction: CheckResult }  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod classify;
pub mod error;
pub mod server;
pub mod test_runner;

pub use classify::{JestTextClassifier, LiveTestClassification, OutputClassifier, SubTest};
pub use error::{E2eError, E2eResult};
pub use server::{BindProbe, PortProbe, PreviewServer, ServerConfig, ServerLease};
pub use test_runner::{derive_test_identifier, run_test_runner, LiveTestOutput, TestRunnerConfig};
