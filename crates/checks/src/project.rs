//! Project discovery and `package.json` inspection

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub const MANIFEST_FILE_NAME: &str = "package.json";

/// The subset of `package.json` the checks care about
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    dev_dependencies: BTreeMap<String, serde_json::Value>,

    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

impl PackageManifest {
    /// Load `package.json` from `project_root`.
    ///
    /// A missing or unparseable manifest is logged and treated as absent:
    /// the checks that depend on it then skip instead of failing the run.
    pub fn load(project_root: &Path) -> Option<Self> {
        let path = project_root.join(MANIFEST_FILE_NAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No readable {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!("Ignoring malformed {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn has_dependency(&self, package: &str) -> bool {
        self.dependencies.contains_key(package) || self.dev_dependencies.contains_key(package)
    }

    /// Whether a top-level key other than the dependency tables is present
    pub fn has_key(&self, key: &str) -> bool {
        self.other.contains_key(key)
    }
}

/// Nearest ancestor directory of `target` holding a `package.json`
pub fn find_project_root(target: &Path) -> Result<PathBuf> {
    target
        .ancestors()
        .skip(1)
        .find(|dir| dir.join(MANIFEST_FILE_NAME).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::ProjectRootNotFound(target.to_path_buf()))
}

/// Resolve the target file and project root for a validation run.
///
/// Both are returned as absolute paths. An explicit root must be an
/// existing directory; otherwise the root is discovered from the target.
pub fn resolve(target: &Path, project_root: Option<&Path>) -> Result<(PathBuf, PathBuf)> {
    if !target.is_file() {
        return Err(Error::TargetNotFound(target.to_path_buf()));
    }
    let target = target.canonicalize()?;

    let root = match project_root {
        Some(root) => {
            if !root.is_dir() {
                return Err(Error::InvalidProjectRoot(root.to_path_buf()));
            }
            root.canonicalize()?
        }
        None => find_project_root(&target)?,
    };

    Ok((target, root))
}
