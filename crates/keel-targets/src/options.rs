//! Board option merging.
//!
//! Options are never appended to the FQBN. They travel as a separate
//! `--board-options k=v,k=v` argument, built here from a fixed set of keys in a
//! fixed order so the rendered string is stable across runs.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

/// Option keys read from catalog defaults and project overrides, in emit order.
pub const CANONICAL_OPTION_KEYS: &[&str] = &[
    "target_core",
    "split",
    "security",
    "usb",
    "upload_method",
    "cpu_speed",
    "opt",
];

/// Resolved board options in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardOptions {
    entries: Vec<(String, String)>,
}

impl BoardOptions {
    /// Merge catalog defaults with project overrides; project values win.
    ///
    /// Only [`CANONICAL_OPTION_KEYS`] are considered, so the result can never
    /// hold a key twice. Blank values count as absent.
    pub fn merge(
        defaults: &BTreeMap<String, String>,
        overrides: &BTreeMap<String, String>,
    ) -> Self {
        for key in defaults.keys().chain(overrides.keys()) {
            if !CANONICAL_OPTION_KEYS.contains(&key.as_str()) {
                debug!(key = %key, "ignoring unrecognised board option");
            }
        }

        let pick = |map: &BTreeMap<String, String>, key: &str| {
            map.get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let entries = CANONICAL_OPTION_KEYS
            .iter()
            .filter_map(|&key| {
                pick(overrides, key)
                    .or_else(|| pick(defaults, key))
                    .map(|value| (key.to_string(), value))
            })
            .collect();

        Self { entries }
    }

    /// Value for `key`, if resolved.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// True when no option resolved.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of resolved options.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate `(key, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as `k=v,k=v`, or `None` when empty.
    pub fn to_csv(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl fmt::Display for BoardOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
