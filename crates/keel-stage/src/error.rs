//! Staging errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while resolving and staging libraries.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Swift library `{name}` not found (searched {})", display_paths(searched))]
    LibraryNotFound { name: String, searched: Vec<PathBuf> },

    #[error("Swift library `{name}` has no .swift sources in {}", path.display())]
    EmptyLibrary { name: String, path: PathBuf },

    #[error("no Swift core sources found in {}", path.display())]
    NoCoreSources { path: PathBuf },

    #[error("compiler argument list exceeds {limit} bytes (needed {needed}); too many Swift sources")]
    ArgumentOverflow { limit: usize, needed: usize },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for staging operations.
pub type Result<T> = std::result::Result<T, StageError>;
