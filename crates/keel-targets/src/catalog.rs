//! Board catalog (`boards.json`) parsing and profile lookup.
//!
//! The catalog is a JSON object keyed by board name. Entries are kept as raw
//! JSON until one is selected, so a malformed entry for an unrelated board
//! never blocks a build for a board that is well-formed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

/// Swift target triple used when a profile does not name one.
pub const DEFAULT_TRIPLE: &str = "armv7-none-none-eabi";

/// CPU used when a profile does not name one.
pub const DEFAULT_CPU: &str = "cortex-m3";

/// One board entry in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetProfile {
    /// Fully qualified board name passed to the vendor tool.
    #[serde(default)]
    pub fqbn: Option<String>,
    /// Older catalogs spell the base identifier explicitly; it wins over `fqbn`.
    #[serde(default)]
    pub fqbn_base: Option<String>,
    /// Vendor core identifier (`vendor:arch`).
    #[serde(default)]
    pub core: Option<String>,
    /// Hardware API flavour used by the runtime shims.
    #[serde(default)]
    pub api: Option<String>,
    /// Swift target triple.
    #[serde(default)]
    pub swift_target: Option<String>,
    /// Target CPU for both compilers.
    #[serde(default)]
    pub cpu: Option<String>,
    /// Float ABI requested by the catalog ("soft", "softfp", "hard").
    #[serde(default)]
    pub float_abi: Option<String>,
    /// FPU variant requested by the catalog.
    #[serde(default)]
    pub fpu: Option<String>,
    /// Board option defaults, overridable per project.
    #[serde(default)]
    pub default_board_options: BTreeMap<String, String>,
}

impl TargetProfile {
    /// The base toolchain identifier. Never carries board options.
    pub fn toolchain_base(&self, target: &str) -> Result<&str> {
        self.fqbn_base
            .as_deref()
            .or(self.fqbn.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                target: target.to_string(),
                field: "fqbn",
            })
    }

    /// Swift triple with the default applied.
    pub fn triple(&self) -> &str {
        non_empty(self.swift_target.as_deref()).unwrap_or(DEFAULT_TRIPLE)
    }

    /// CPU with the default applied.
    pub fn cpu(&self) -> &str {
        non_empty(self.cpu.as_deref()).unwrap_or(DEFAULT_CPU)
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The parsed board catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Map<String, Value>,
}

impl Catalog {
    /// Parse a catalog from JSON text. The top level must be an object.
    pub fn from_json(text: &str) -> Result<Self> {
        let entries: Map<String, Value> =
            serde_json::from_str(text).map_err(|source| ConfigError::InvalidJson {
                document: "boards.json",
                source,
            })?;
        Ok(Self { entries })
    }

    /// All board names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, value)| value.is_object())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Whether the catalog has an entry for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(Value::is_object)
    }

    /// Look up and decode the profile for `name`.
    pub fn profile(&self, name: &str) -> Result<TargetProfile> {
        let entry = self
            .entries
            .get(name)
            .filter(|value| value.is_object())
            .ok_or_else(|| ConfigError::UnknownTarget {
                name: name.to_string(),
            })?;
        TargetProfile::deserialize(entry).map_err(|source| ConfigError::InvalidJson {
            document: "boards.json",
            source,
        })
    }
}
