//! Bounded Swift source argument list.

use std::path::{Path, PathBuf};

use crate::error::{Result, StageError};

/// Byte budget for the accumulated source arguments.
pub const DEFAULT_ARG_BUDGET: usize = 200_000;

/// Source files handed to `swiftc`, in the order they were added.
///
/// Each entry is charged as a quoted, space-separated argument against a fixed
/// budget. Going over the budget is an error; the list is never truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerArgs {
    sources: Vec<PathBuf>,
    used: usize,
    limit: usize,
}

impl Default for CompilerArgs {
    fn default() -> Self {
        Self::with_limit(DEFAULT_ARG_BUDGET)
    }
}

impl CompilerArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            sources: Vec::new(),
            used: 0,
            limit,
        }
    }

    /// Append one source file.
    pub fn push(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let cost = path.as_os_str().len() + 3;
        let needed = self.used + cost;
        if needed > self.limit {
            return Err(StageError::ArgumentOverflow {
                limit: self.limit,
                needed,
            });
        }
        self.used = needed;
        self.sources.push(path);
        Ok(())
    }

    /// Append every file in `paths`, stopping at the first overflow.
    pub fn extend<I, P>(&mut self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in paths {
            self.push(path)?;
        }
        Ok(())
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.sources.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn bytes_used(&self) -> usize {
        self.used
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.sources.clear();
        self.used = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charges_quoted_length() {
        let mut args = CompilerArgs::new();
        args.push("a.swift").unwrap();
        assert_eq!(args.bytes_used(), "a.swift".len() + 3);
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn overflow_is_an_error_not_truncation() {
        let mut args = CompilerArgs::with_limit(25);
        args.push("core/a.swift").unwrap();
        let err = args.push("core/b.swift").unwrap_err();
        assert!(matches!(
            err,
            StageError::ArgumentOverflow { limit: 25, needed: 30 }
        ));
        assert_eq!(args.len(), 1);
        assert_eq!(args.sources(), &[PathBuf::from("core/a.swift")]);
    }

    #[test]
    fn clear_resets_budget() {
        let mut args = CompilerArgs::with_limit(20);
        args.extend(["x.swift", "y.swift"]).unwrap();
        args.clear();
        assert!(args.is_empty());
        assert_eq!(args.bytes_used(), 0);
    }
}
