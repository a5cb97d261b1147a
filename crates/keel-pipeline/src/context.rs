//! The build context threaded through every pipeline step.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use keel_stage::{CompilerArgs, StagedLibrarySet};
use keel_targets::{CompilerFlagSet, ProjectConfig, TargetDescriptor};

use crate::error::{PipelineError, Result};

/// Name of the linked Swift object inside the sketch directory.
pub const OBJECT_FILE: &str = "KeelSwiftApp.o";

/// Name of the toolchain cache written by `verify`.
pub const CACHE_FILE: &str = ".keel-toolchain.toml";

/// Values supplied from the environment or the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Explicit Swift compiler (`SWIFTC`).
    pub swiftc: Option<PathBuf>,
    /// Explicit serial port (`PORT`).
    pub port: Option<String>,
    /// Explicit monitor baud rate (`BAUD`).
    pub baud: Option<String>,
    /// Home directory, for the sketchbook default and `~/.swiftly/bin`.
    pub home: Option<PathBuf>,
    /// The `PATH` the process started with.
    pub path: Option<OsString>,
}

/// All state for one command invocation.
///
/// Paths are fixed at construction; everything else is filled in by the steps
/// in order. Accessors for step-produced values fail with
/// [`PipelineError::NotResolved`] when read too early.
#[derive(Debug)]
pub struct BuildContext {
    pub project_root: PathBuf,
    pub tool_root: PathBuf,
    pub runtime_arduino: PathBuf,
    pub runtime_swift: PathBuf,
    pub config_path: PathBuf,
    pub catalog_path: PathBuf,
    pub build_dir: PathBuf,
    pub sketch_dir: PathBuf,
    pub arduino_build_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub object_path: PathBuf,
    pub entry_module: PathBuf,
    pub cache_path: PathBuf,
    pub env_script_path: PathBuf,
    pub last_log: Option<PathBuf>,

    pub verbose: bool,
    /// Let `verify` install a missing Arduino core instead of failing.
    pub install_missing_core: bool,
    pub overrides: Overrides,

    pub raw_config: String,
    pub raw_catalog: String,
    pub project: Option<ProjectConfig>,
    pub target: Option<TargetDescriptor>,
    pub flags: Option<CompilerFlagSet>,
    pub compiler: Option<PathBuf>,
    pub arduino_cli: Option<PathBuf>,
    pub sketchbook_dir: Option<PathBuf>,
    pub args: CompilerArgs,
    pub staged: Option<StagedLibrarySet>,
    pub port: Option<String>,
}

impl BuildContext {
    pub fn new(project_root: &Path, tool_root: &Path) -> Self {
        let build_dir = project_root.join("build");
        let sketch_dir = build_dir.join("sketch");
        Self {
            project_root: project_root.to_path_buf(),
            tool_root: tool_root.to_path_buf(),
            runtime_arduino: tool_root.join("arduino"),
            runtime_swift: tool_root.join("swift"),
            config_path: project_root.join(keel_targets::descriptor::CONFIG_FILE),
            catalog_path: tool_root.join(keel_targets::descriptor::CATALOG_FILE),
            arduino_build_dir: build_dir.join("arduino_build"),
            logs_dir: build_dir.join("logs"),
            object_path: sketch_dir.join(OBJECT_FILE),
            entry_module: project_root.join("main.swift"),
            cache_path: build_dir.join(CACHE_FILE),
            env_script_path: build_dir.join("env.sh"),
            sketch_dir,
            build_dir,
            last_log: None,
            verbose: false,
            install_missing_core: false,
            overrides: Overrides::default(),
            raw_config: String::new(),
            raw_catalog: String::new(),
            project: None,
            target: None,
            flags: None,
            compiler: None,
            arduino_cli: None,
            sketchbook_dir: None,
            args: CompilerArgs::new(),
            staged: None,
            port: None,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Directory holding the runtime sketch template.
    pub fn common_dir(&self) -> PathBuf {
        self.runtime_arduino.join("common")
    }

    pub fn target(&self) -> Result<&TargetDescriptor> {
        self.target.as_ref().ok_or(PipelineError::NotResolved {
            what: "target descriptor",
            needed_by: "ConfigSelect",
        })
    }

    pub fn flags(&self) -> Result<&CompilerFlagSet> {
        self.flags.as_ref().ok_or(PipelineError::NotResolved {
            what: "compiler flags",
            needed_by: "ConfigSelect",
        })
    }

    pub fn project(&self) -> Result<&ProjectConfig> {
        self.project.as_ref().ok_or(PipelineError::NotResolved {
            what: "project configuration",
            needed_by: "ConfigSelect",
        })
    }

    pub fn compiler(&self) -> Result<&Path> {
        self.compiler
            .as_deref()
            .ok_or(PipelineError::NotResolved {
                what: "Swift compiler",
                needed_by: "ConfigSelect",
            })
    }

    /// The vendor tool, or plain `arduino-cli` to be resolved by the OS.
    pub fn arduino_cli(&self) -> PathBuf {
        self.arduino_cli
            .clone()
            .unwrap_or_else(|| PathBuf::from("arduino-cli"))
    }

    /// Point the step log at `logs/<name>.log`, truncating any previous run.
    pub fn set_step_log(&mut self, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.logs_dir).map_err(|e| PipelineError::io(&self.logs_dir, e))?;
        let path = self.logs_dir.join(format!("{name}.log"));
        fs::write(&path, b"").map_err(|e| PipelineError::io(&path, e))?;
        self.last_log = Some(path.clone());
        Ok(path)
    }

    /// Fail with a named-path error unless `path` exists.
    pub fn require(&self, what: &'static str, path: &Path) -> Result<()> {
        if path.exists() {
            Ok(())
        } else {
            Err(PipelineError::MissingPath {
                what,
                path: path.to_path_buf(),
            })
        }
    }
}
