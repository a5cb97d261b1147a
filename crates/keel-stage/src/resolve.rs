//! Case-insensitive library directory lookup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Result, StageError};

/// A library directory found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDir {
    pub path: PathBuf,
    /// Directory name with its on-disk casing.
    pub leaf: String,
}

/// A declared library name resolved against the Swift and native trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryReference {
    /// Name as written in `config.json`.
    pub name: String,
    pub managed: ResolvedDir,
    pub native: Option<ResolvedDir>,
}

impl LibraryReference {
    pub fn is_language_only(&self) -> bool {
        self.native.is_none()
    }
}

/// Find the subdirectory of `root` whose name equals `name` ignoring ASCII
/// case. When several directories differ only in case, the lexically first
/// is taken whatever the casing of `name`. A missing `root` resolves to `None`.
pub fn resolve_dir(root: &Path, name: &str) -> Result<Option<ResolvedDir>> {
    if name.is_empty() || !root.is_dir() {
        return Ok(None);
    }
    let mut candidates = Vec::new();
    for entry in fs::read_dir(root).map_err(|e| StageError::io(root, e))? {
        let entry = entry.map_err(|e| StageError::io(root, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(leaf) = entry.file_name().to_str() {
            if leaf.eq_ignore_ascii_case(name) {
                candidates.push(leaf.to_string());
            }
        }
    }
    candidates.sort();

    Ok(candidates.into_iter().next().map(|leaf| ResolvedDir {
        path: root.join(&leaf),
        leaf,
    }))
}

/// Try each root in order and return the first match.
pub fn resolve_in(roots: &[PathBuf], name: &str) -> Result<Option<ResolvedDir>> {
    for root in roots {
        if let Some(found) = resolve_dir(root, name)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}
