//! Sorted directory listing and tree copies.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, StageError};

pub const SWIFT_EXTS: &[&str] = &["swift"];
pub const SOURCE_EXTS: &[&str] = &["c", "cpp", "cc", "cxx"];
pub const HEADER_EXTS: &[&str] = &["h", "hpp", "hh", "hxx"];

/// Whether `path` has one of `exts` (case-sensitive, like the vendor tool).
pub fn has_ext(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| exts.contains(&ext))
}

/// Whether `path` is a C/C++ source or header.
pub fn is_native(path: &Path) -> bool {
    has_ext(path, SOURCE_EXTS) || has_ext(path, HEADER_EXTS)
}

/// Every regular file below `root` with one of `exts`, sorted by path.
pub fn list_files(root: &Path, exts: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|err| walk_error(root, err))?;
        if entry.file_type().is_file() && has_ext(entry.path(), exts) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Copy files below `src` accepted by `keep` into `dst`, preserving relative
/// paths. Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path, keep: impl Fn(&Path) -> bool) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|err| walk_error(src, err))?;
        if !entry.file_type().is_file() || !keep(entry.path()) {
            continue;
        }
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| StageError::io(parent, e))?;
        }
        fs::copy(entry.path(), &target).map_err(|e| StageError::io(&target, e))?;
        copied += 1;
    }
    Ok(copied)
}

/// Regular files below `root` up to `max_depth`, relative and sorted.
pub fn list_tree(root: &Path, max_depth: usize) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).max_depth(max_depth).sort_by_file_name() {
        let entry = entry.map_err(|err| walk_error(root, err))?;
        if entry.file_type().is_file() {
            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            files.push(rel.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn walk_error(root: &Path, err: walkdir::Error) -> StageError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    StageError::io(path, err.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_recursively_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/nested")).unwrap();
        fs::write(dir.path().join("z.swift"), "").unwrap();
        fs::write(dir.path().join("a.swift"), "").unwrap();
        fs::write(dir.path().join("b/nested/m.swift"), "").unwrap();
        fs::write(dir.path().join("b/readme.md"), "").unwrap();

        let files = list_files(dir.path(), SWIFT_EXTS).unwrap();
        let rel: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("a.swift"),
                PathBuf::from("b/nested/m.swift"),
                PathBuf::from("z.swift")
            ]
        );
    }

    #[test]
    fn tree_listing_respects_depth() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
        fs::write(dir.path().join("top.ino"), "").unwrap();
        fs::write(dir.path().join("a/b/mid.h"), "").unwrap();
        fs::write(dir.path().join("a/b/c/deep.cpp"), "").unwrap();

        assert_eq!(
            list_tree(dir.path(), 3).unwrap(),
            vec![PathBuf::from("a/b/mid.h"), PathBuf::from("top.ino")]
        );
        assert_eq!(list_tree(dir.path(), 4).unwrap().len(), 3);
    }

    #[test]
    fn copy_tree_filters_and_keeps_layout() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("impl")).unwrap();
        fs::write(src.path().join("Bridge.h"), "h").unwrap();
        fs::write(src.path().join("impl/Bridge.cpp"), "c").unwrap();
        fs::write(src.path().join("Lib.swift"), "s").unwrap();

        let copied = copy_tree(src.path(), dst.path(), is_native).unwrap();
        assert_eq!(copied, 2);
        assert!(dst.path().join("Bridge.h").is_file());
        assert!(dst.path().join("impl/Bridge.cpp").is_file());
        assert!(!dst.path().join("Lib.swift").exists());
    }
}
