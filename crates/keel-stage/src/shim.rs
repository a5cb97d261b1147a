//! Forwarding headers and promoted sources at the sketch root.
//!
//! The vendor tool only reliably compiles what sits at the sketch root and
//! only resolves `#include "X.h"` against the sketch root and libraries it
//! managed to discover. Every staged library is therefore mirrored at the
//! root: one forwarding header per header, one prefixed copy per source.

use std::fs;
use std::path::{Component, Path};

use tracing::{info, warn};

use crate::error::{Result, StageError};
use crate::walk::{list_files, HEADER_EXTS, SOURCE_EXTS};

/// First line of every generated forwarding header.
pub const SHIM_MARKER: &str = "// Auto-generated by keel";

/// What [`generate_shims`] did for one library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShimOutcome {
    /// Header names written at the sketch root.
    pub written: Vec<String>,
    /// Header names skipped because a file of that name already existed.
    pub collisions: Vec<String>,
}

/// Write a forwarding header at the sketch root for every header under
/// `libraries/<leaf>/src`. Existing files are never overwritten.
pub fn generate_shims(sketch_dir: &Path, leaf: &str) -> Result<ShimOutcome> {
    let src = library_src(sketch_dir, leaf);
    let mut outcome = ShimOutcome::default();
    if !src.is_dir() {
        return Ok(outcome);
    }

    for header in list_files(&src, HEADER_EXTS)? {
        let Some(base) = header.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let shim = sketch_dir.join(base);
        let include = format!("libraries/{leaf}/src/{}", slash_path(&src, &header));
        let text = format!("{SHIM_MARKER}\n#pragma once\n#include \"{include}\"\n");
        if shim.exists() {
            // Already forwarded by an earlier pass over the same library.
            if fs::read_to_string(&shim).is_ok_and(|existing| existing == text) {
                continue;
            }
            warn!(header = base, lib = leaf, "shim header collision; keeping existing file");
            outcome.collisions.push(base.to_string());
            continue;
        }
        fs::write(&shim, text).map_err(|e| StageError::io(&shim, e))?;
        info!(header = base, target = %include, "shim header");
        outcome.written.push(base.to_string());
    }
    Ok(outcome)
}

/// Copy every source under `libraries/<leaf>/src` to the sketch root as
/// `__<leaf>__<path with / replaced by __>`. Returns the promoted names.
pub fn promote_sources(sketch_dir: &Path, leaf: &str) -> Result<Vec<String>> {
    let src = library_src(sketch_dir, leaf);
    if !src.is_dir() {
        return Ok(Vec::new());
    }

    let mut promoted = Vec::new();
    for source in list_files(&src, SOURCE_EXTS)? {
        let name = promoted_name(leaf, &slash_path(&src, &source));
        let target = sketch_dir.join(&name);
        fs::copy(&source, &target).map_err(|e| StageError::io(&target, e))?;
        info!(source = %source.display(), promoted = %name, "promoted source");
        promoted.push(name);
    }
    Ok(promoted)
}

pub fn promoted_name(leaf: &str, rel: &str) -> String {
    format!("__{leaf}__{}", rel.replace('/', "__"))
}

fn library_src(sketch_dir: &Path, leaf: &str) -> std::path::PathBuf {
    sketch_dir.join("libraries").join(leaf).join("src")
}

/// `path` relative to `base`, `/`-separated regardless of platform.
fn slash_path(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
