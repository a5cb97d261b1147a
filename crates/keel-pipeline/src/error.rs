//! Pipeline errors.

use std::path::PathBuf;

use keel_stage::StageError;
use keel_targets::ConfigError;
use thiserror::Error;

/// Errors that can stop a pipeline step.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("missing {what}: {}", path.display())]
    MissingPath { what: &'static str, path: PathBuf },

    #[error("`{tool}` not found on PATH ({hint})")]
    ToolNotFound { tool: String, hint: String },

    #[error("Arduino core `{core}` is not installed (run `arduino-cli core install {core}`)")]
    CoreNotInstalled { core: String },

    #[error("{} has no Embedded Swift runtime for `{triple}` (set SWIFTC or install a toolchain with Embedded support)", compiler.display())]
    RuntimeUnavailable { compiler: PathBuf, triple: String },

    #[error("{tool} failed ({status}); log: {}", log.display())]
    ToolFailed {
        tool: String,
        status: String,
        log: PathBuf,
        /// Last lines of the step log.
        tail: Vec<String>,
    },

    #[error("no serial port found for `{target}`; set PORT explicitly")]
    PortNotFound { target: String, listing: String },

    #[error("refusing pseudo-port `{port}` (Bluetooth/incoming/debug-console); set PORT to a USB serial device")]
    PseudoPort { port: String },

    #[error("no build artifacts (*.bin, *.hex, *.uf2, *.elf) in {}; run `keel build` first", dir.display())]
    MissingArtifacts { dir: PathBuf, listing: Vec<String> },

    #[error("{what} is not available yet (step `{needed_by}` ran before it was resolved)")]
    NotResolved {
        what: &'static str,
        needed_by: &'static str,
    },

    #[error("invalid toolchain cache {}: {message}", path.display())]
    Cache { path: PathBuf, message: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
