//! Arduino 1.5 library layout: `libraries/<Name>/src/*` plus `library.properties`.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, StageError};
use crate::walk::is_native;

/// Move root-level sources and headers into `src/` when `src/` does not exist.
/// Returns the number of files moved.
pub fn normalize(lib_dir: &Path) -> Result<usize> {
    let src = lib_dir.join("src");
    if src.is_dir() || !lib_dir.is_dir() {
        return Ok(0);
    }

    let mut loose = Vec::new();
    for entry in fs::read_dir(lib_dir).map_err(|e| StageError::io(lib_dir, e))? {
        let path = entry.map_err(|e| StageError::io(lib_dir, e))?.path();
        if path.is_file() && is_native(&path) {
            loose.push(path);
        }
    }
    if loose.is_empty() {
        return Ok(0);
    }
    loose.sort();

    fs::create_dir_all(&src).map_err(|e| StageError::io(&src, e))?;
    for path in &loose {
        if let Some(name) = path.file_name() {
            let target = src.join(name);
            fs::rename(path, &target).map_err(|e| StageError::io(&target, e))?;
        }
    }
    debug!(lib = %lib_dir.display(), moved = loose.len(), "normalized library layout");
    Ok(loose.len())
}

/// Write a minimal `library.properties` unless one exists. Returns whether a
/// file was written.
pub fn ensure_properties(lib_dir: &Path, name: &str) -> Result<bool> {
    let path = lib_dir.join("library.properties");
    if path.exists() {
        return Ok(false);
    }
    fs::write(&path, properties_text(name)).map_err(|e| StageError::io(&path, e))?;
    Ok(true)
}

fn properties_text(name: &str) -> String {
    format!(
        "name={name}\n\
         version=0.0.0\n\
         author=keel\n\
         maintainer=keel\n\
         sentence=Bridge sources staged by keel.\n\
         paragraph=Generated to keep staged libraries in Arduino 1.5 format.\n\
         category=Other\n\
         url=\n\
         architectures=*\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_loose_sources_into_src() {
        let lib = tempfile::tempdir().unwrap();
        fs::write(lib.path().join("wifi.h"), "").unwrap();
        fs::write(lib.path().join("wifi.cpp"), "").unwrap();
        fs::write(lib.path().join("README.md"), "").unwrap();

        assert_eq!(normalize(lib.path()).unwrap(), 2);
        assert!(lib.path().join("src/wifi.h").is_file());
        assert!(lib.path().join("src/wifi.cpp").is_file());
        assert!(lib.path().join("README.md").is_file());
        assert!(!lib.path().join("wifi.h").exists());
    }

    #[test]
    fn existing_src_is_left_alone() {
        let lib = tempfile::tempdir().unwrap();
        fs::create_dir(lib.path().join("src")).unwrap();
        fs::write(lib.path().join("extra.h"), "").unwrap();
        assert_eq!(normalize(lib.path()).unwrap(), 0);
        assert!(lib.path().join("extra.h").is_file());
    }

    #[test]
    fn properties_written_once() {
        let lib = tempfile::tempdir().unwrap();
        assert!(ensure_properties(lib.path(), "I2C").unwrap());
        let text = fs::read_to_string(lib.path().join("library.properties")).unwrap();
        assert!(text.starts_with("name=I2C\n"));
        assert!(text.contains("architectures=*\n"));

        fs::write(lib.path().join("library.properties"), "name=custom\n").unwrap();
        assert!(!ensure_properties(lib.path(), "I2C").unwrap());
        let text = fs::read_to_string(lib.path().join("library.properties")).unwrap();
        assert_eq!(text, "name=custom\n");
    }
}
