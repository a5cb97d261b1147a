//! Host toolchain probes and the toolchain cache written by `verify`.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use keel_targets::{RuntimeInventory, TargetDescriptor};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::Overrides;
use crate::error::{PipelineError, Result};
use crate::process::capture;

/// `PATH` with `~/.swiftly/bin` in front, so user-local toolchains win.
pub fn search_path(overrides: &Overrides) -> OsString {
    let mut dirs: Vec<PathBuf> = Vec::new();
    if let Some(home) = &overrides.home {
        dirs.push(home.join(".swiftly").join("bin"));
    }
    if let Some(path) = &overrides.path {
        dirs.extend(env::split_paths(path));
    }
    env::join_paths(dirs).unwrap_or_default()
}

/// Locate `tool` on the augmented search path.
pub fn find_tool(tool: &str, overrides: &Overrides, hint: &str) -> Result<PathBuf> {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    which::which_in(tool, Some(search_path(overrides)), cwd).map_err(|_| {
        PipelineError::ToolNotFound {
            tool: tool.to_string(),
            hint: hint.to_string(),
        }
    })
}

/// Persisted result of a successful `verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainCache {
    pub swiftc: PathBuf,
    pub board: String,
    pub fqbn: String,
    pub core: String,
    pub swift_target: String,
    pub cpu: String,
}

impl ToolchainCache {
    pub fn new(swiftc: &Path, target: &TargetDescriptor) -> Self {
        Self {
            swiftc: swiftc.to_path_buf(),
            board: target.name.clone(),
            fqbn: target.toolchain_id.clone(),
            core: target.core.clone(),
            swift_target: target.triple.clone(),
            cpu: target.cpu.clone(),
        }
    }

    /// Read the cache; `Ok(None)` when absent.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PipelineError::io(path, e)),
        };
        toml::from_str(&text)
            .map(Some)
            .map_err(|e| PipelineError::Cache {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    pub fn store(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).map_err(|e| PipelineError::Cache {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        write_file(path, &format!("# Written by `keel verify`\n{text}"))
    }

    /// Shell exports for sourcing into a terminal.
    pub fn env_script(&self) -> String {
        format!(
            "# Auto-generated by keel verify\n\
             export SWIFTC=\"{}\"\n\
             export KEEL_BOARD=\"{}\"\n\
             export KEEL_FQBN=\"{}\"\n\
             export KEEL_CORE=\"{}\"\n\
             export KEEL_SWIFT_TARGET=\"{}\"\n\
             export KEEL_SWIFT_CPU=\"{}\"\n",
            self.swiftc.display(),
            self.board,
            self.fqbn,
            self.core,
            self.swift_target,
            self.cpu
        )
    }
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    fs::write(path, text).map_err(|e| PipelineError::io(path, e))
}

/// Write the `env.sh` export script.
pub fn write_env_script(path: &Path, cache: &ToolchainCache) -> Result<()> {
    write_file(path, &cache.env_script())
}

/// Resolve the Swift compiler: `SWIFTC`, then the verify cache, then `swiftc`
/// on the augmented search path.
pub fn resolve_compiler(overrides: &Overrides, cache_path: &Path) -> Result<PathBuf> {
    if let Some(explicit) = overrides.swiftc.as_ref().filter(|p| !p.as_os_str().is_empty()) {
        debug!(swiftc = %explicit.display(), "using SWIFTC");
        if explicit.components().count() == 1 && !explicit.is_file() {
            let name = explicit.to_string_lossy();
            return find_tool(&name, overrides, "SWIFTC names a program that is not on PATH");
        }
        return Ok(explicit.clone());
    }
    if let Some(cache) = ToolchainCache::load(cache_path)? {
        if cache.swiftc.is_file() {
            debug!(swiftc = %cache.swiftc.display(), "using cached compiler");
            return Ok(cache.swiftc);
        }
        debug!(swiftc = %cache.swiftc.display(), "cached compiler no longer exists");
    }
    find_tool(
        "swiftc",
        overrides,
        "install a toolchain with Embedded Swift (e.g. via swiftly) or set SWIFTC",
    )
}

#[derive(Debug, Deserialize)]
struct TargetInfo {
    paths: TargetPaths,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetPaths {
    runtime_resource_path: PathBuf,
}

/// Parse `swiftc -print-target-info` output into the Embedded runtime dir.
pub fn parse_runtime_dir(target_info: &str) -> Option<PathBuf> {
    let info: TargetInfo = serde_json::from_str(target_info).ok()?;
    Some(info.paths.runtime_resource_path.join("embedded"))
}

/// The compiler's Embedded runtime directory for `triple`, if it has one.
pub fn embedded_runtime_dir(swiftc: &Path, triple: &str) -> Option<PathBuf> {
    let mut cmd = Command::new(swiftc);
    cmd.args(["-print-target-info", "-target", triple]);
    let dir = parse_runtime_dir(&capture(cmd)?)?;
    dir.is_dir().then_some(dir)
}

/// Triples with a prebuilt Embedded stdlib module under `runtime_dir`.
///
/// Returns an unknown inventory when the layout is not recognised.
pub fn runtime_inventory(runtime_dir: &Path) -> RuntimeInventory {
    let modules = runtime_dir.join("Swift.swiftmodule");
    let Ok(entries) = fs::read_dir(&modules) else {
        return RuntimeInventory::unknown();
    };
    let mut triples: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            let ext = path.extension()?.to_str()?;
            if ext != "swiftmodule" && ext != "swiftinterface" {
                return None;
            }
            path.file_stem()?.to_str().map(str::to_string)
        })
        .collect();
    if triples.is_empty() {
        return RuntimeInventory::unknown();
    }
    triples.sort();
    triples.dedup();
    RuntimeInventory::from_triples(triples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> TargetDescriptor {
        keel_targets::select_target(
            r#"{ "board": "due" }"#,
            r#"{ "due": { "fqbn": "arduino:sam:arduino_due_x", "core": "arduino:sam" } }"#,
        )
        .unwrap()
    }

    #[test]
    fn swiftly_bin_comes_first() {
        let overrides = Overrides {
            home: Some(PathBuf::from("/home/dev")),
            path: Some(OsString::from("/usr/bin")),
            ..Overrides::default()
        };
        let dirs: Vec<PathBuf> = env::split_paths(&search_path(&overrides)).collect();
        assert_eq!(
            dirs,
            vec![PathBuf::from("/home/dev/.swiftly/bin"), PathBuf::from("/usr/bin")]
        );
    }

    #[test]
    fn cache_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build").join(".keel-toolchain.toml");
        assert_eq!(ToolchainCache::load(&path).unwrap(), None);

        let cache = ToolchainCache::new(Path::new("/opt/swift/bin/swiftc"), &descriptor());
        cache.store(&path).unwrap();
        assert_eq!(ToolchainCache::load(&path).unwrap(), Some(cache));
    }

    #[test]
    fn corrupt_cache_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.toml");
        fs::write(&path, "swiftc = [").unwrap();
        assert!(matches!(
            ToolchainCache::load(&path),
            Err(PipelineError::Cache { .. })
        ));
    }

    #[test]
    fn env_script_exports_resolved_values() {
        let cache = ToolchainCache::new(Path::new("/opt/swiftc"), &descriptor());
        let script = cache.env_script();
        assert!(script.contains("export SWIFTC=\"/opt/swiftc\"\n"));
        assert!(script.contains("export KEEL_FQBN=\"arduino:sam:arduino_due_x\"\n"));
        assert!(script.contains("export KEEL_SWIFT_TARGET=\"armv7-none-none-eabi\"\n"));
    }

    #[test]
    fn explicit_compiler_wins_over_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("cache.toml");
        let cached = dir.path().join("cached-swiftc");
        fs::write(&cached, "").unwrap();
        ToolchainCache::new(&cached, &descriptor())
            .store(&cache_path)
            .unwrap();

        let overrides = Overrides {
            swiftc: Some(PathBuf::from("/explicit/swiftc")),
            ..Overrides::default()
        };
        assert_eq!(
            resolve_compiler(&overrides, &cache_path).unwrap(),
            PathBuf::from("/explicit/swiftc")
        );
        assert_eq!(
            resolve_compiler(&Overrides::default(), &cache_path).unwrap(),
            cached
        );
    }

    #[test]
    fn runtime_dir_from_target_info() {
        let info = r#"{
            "compilerVersion": "Swift version 6.1",
            "target": { "triple": "armv7em-none-none-eabi" },
            "paths": {
                "runtimeLibraryPaths": [],
                "runtimeResourcePath": "/opt/swift/usr/lib/swift"
            }
        }"#;
        assert_eq!(
            parse_runtime_dir(info),
            Some(PathBuf::from("/opt/swift/usr/lib/swift/embedded"))
        );
        assert_eq!(parse_runtime_dir("not json"), None);
    }

    #[test]
    fn inventory_lists_prebuilt_modules() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(runtime_inventory(dir.path()), RuntimeInventory::unknown());

        let modules = dir.path().join("Swift.swiftmodule");
        fs::create_dir(&modules).unwrap();
        fs::write(modules.join("armv7em-none-none-eabi.swiftmodule"), "").unwrap();
        fs::write(modules.join("armv7em-none-none-eabi.swiftinterface"), "").unwrap();
        fs::write(modules.join("armv6m-none-none-eabi.swiftmodule"), "").unwrap();

        let inventory = runtime_inventory(dir.path());
        assert!(inventory.has("armv7em-none-none-eabi"));
        assert!(inventory.has("armv6m-none-none-eabi"));
        assert!(!inventory.has("armv7em-none-none-eabihf"));
    }
}
