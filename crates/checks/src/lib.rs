//! specgate check runners
//!
//! Four independent quality gates for one Storybook story file, and the
//! [`Validator`] that runs them together:
//!
//! | runner             | report keys                        |
//! |--------------------|------------------------------------|
//! | [`LintRunner`]      | `linting`                          |
//! | [`TypecheckRunner`] | `typeScript`                       |
//! | [`FormatRunner`]    | `formatCompliance`                 |
//! | [`LiveTestRunner`]  | `renderTest`, `interactionTest`    |

pub mod config;
pub mod error;
pub mod format;
pub mod lint;
pub mod live;
pub mod project;
pub mod runner;
pub mod typecheck;
pub mod validator;

pub use config::{ValidatorConfig, CONFIG_FILE_NAME};
pub use error::{Error, Result};
pub use format::FormatRunner;
pub use lint::LintRunner;
pub use live::LiveTestRunner;
pub use project::{resolve, PackageManifest};
pub use runner::{run_isolated, CheckContext, CheckRunner, NamedResults};
pub use typecheck::TypecheckRunner;
pub use validator::Validator;
