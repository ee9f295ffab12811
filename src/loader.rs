//! Loading policy documents from disk.
//!
//! The surrounding server derives its ACL from textual policy documents at
//! process start; this module covers the read side. Documents use the
//! `.hcl` extension.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{Level, debug, instrument};

use crate::error::{AclError, Result};
use crate::policy::Policy;

/// Read and parse a single policy document.
///
/// When the document does not set a `name`, the file stem is used, so
/// `policies/ops.hcl` yields a policy named `ops`.
#[instrument(level = Level::DEBUG)]
pub fn load_policy_file(path: &Path) -> Result<Policy> {
    let source = fs::read_to_string(path).map_err(|source| AclError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut policy = Policy::parse(&source)?;
    if policy.name.is_empty()
        && let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
    {
        policy.name = stem.to_string();
    }
    debug!(name = %policy.name, rules = policy.rules.len(), "loaded policy");
    Ok(policy)
}

/// Load every `.hcl` policy document in a directory.
///
/// Files are read in file-name order so layering is deterministic.
#[instrument(level = Level::DEBUG)]
pub fn load_policy_dir(dir: &Path) -> Result<Vec<Policy>> {
    let entries = fs::read_dir(dir).map_err(|source| AclError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| AclError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "hcl") {
            paths.push(path);
        }
    }
    paths.sort();

    paths.iter().map(|path| load_policy_file(path)).collect()
}
