//! Error types for configuration and target resolution.

use std::path::PathBuf;

/// Errors that can occur while loading configuration or selecting a target.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required configuration file does not exist.
    #[error("required file not found: {}", path.display())]
    MissingFile {
        /// The path that was not found.
        path: PathBuf,
    },

    /// A configuration file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// The file being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A document is not valid JSON or does not have the expected shape.
    #[error("invalid JSON in {document}: {source}")]
    InvalidJson {
        /// Which document failed ("config.json" or "boards.json").
        document: &'static str,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The project configuration does not name a board.
    #[error("config.json is missing the required `board` key")]
    MissingTargetName,

    /// The requested board is not in the catalog.
    #[error("unknown board `{name}` (not present in boards.json)")]
    UnknownTarget {
        /// The board name as written in the project configuration.
        name: String,
    },

    /// A catalog entry lacks a required field.
    #[error("boards.json entry `{target}` is missing required field `{field}`")]
    MissingField {
        /// Board whose entry is incomplete.
        target: String,
        /// Name of the missing field.
        field: &'static str,
    },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
