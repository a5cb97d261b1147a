//! `config.json` project configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Project-level configuration read from `config.json` at the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Board name to look up in the catalog (required for every command).
    #[serde(default)]
    pub board: Option<String>,
    /// Swift libraries to compile in, matched case-insensitively.
    #[serde(default)]
    pub lib: Vec<String>,
    /// Libraries expected in the user's Arduino sketchbook.
    #[serde(default)]
    pub arduino_lib: Vec<String>,
    /// Sketchbook library root; defaults to the platform location.
    #[serde(default)]
    pub arduino_lib_dir: Option<String>,
    /// Board option overrides, merged over the catalog defaults.
    #[serde(default)]
    pub board_options: BTreeMap<String, String>,
}

impl ProjectConfig {
    /// Parse a project configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| ConfigError::InvalidJson {
            document: "config.json",
            source,
        })
    }

    /// The requested board name, trimmed. Fails when absent or blank.
    pub fn board_name(&self) -> Result<&str> {
        self.board
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::MissingTargetName)
    }

    /// Declared Swift library names with blanks removed.
    pub fn swift_libs(&self) -> Vec<String> {
        non_blank(&self.lib)
    }

    /// Declared sketchbook library names with blanks removed.
    pub fn sketchbook_libs(&self) -> Vec<String> {
        non_blank(&self.arduino_lib)
    }

    /// Resolve the sketchbook library root.
    ///
    /// An explicit `arduino_lib_dir` is returned as-is. Otherwise the first
    /// existing conventional location under `home` is used.
    pub fn sketchbook_dir(&self, home: Option<&Path>) -> Option<PathBuf> {
        if let Some(dir) = self.arduino_lib_dir.as_deref().filter(|d| !d.is_empty()) {
            return Some(PathBuf::from(dir));
        }
        let home = home?;
        [
            home.join("Documents").join("Arduino").join("libraries"),
            home.join("Arduino").join("libraries"),
        ]
        .into_iter()
        .find(|candidate| candidate.is_dir())
    }
}

fn non_blank(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
