//! Target selection: fold the project configuration and the board catalog into
//! one fully populated [`TargetDescriptor`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::catalog::{non_empty, Catalog};
use crate::error::{ConfigError, Result};
use crate::options::BoardOptions;
use crate::project::ProjectConfig;

/// Project configuration file name, relative to the project root.
pub const CONFIG_FILE: &str = "config.json";

/// Board catalog file name, relative to the tool root.
pub const CATALOG_FILE: &str = "boards.json";

/// The two documents a build is configured from, as read from disk.
#[derive(Debug, Clone)]
pub struct RawSources {
    pub config_path: PathBuf,
    pub catalog_path: PathBuf,
    pub config_text: String,
    pub catalog_text: String,
}

/// Read `config.json` from the project root and `boards.json` from the tool root.
pub fn load_sources(project_root: &Path, tool_root: &Path) -> Result<RawSources> {
    let config_path = project_root.join(CONFIG_FILE);
    let catalog_path = tool_root.join(CATALOG_FILE);
    let config_text = read_required(&config_path)?;
    let catalog_text = read_required(&catalog_path)?;
    Ok(RawSources {
        config_path,
        catalog_path,
        config_text,
        catalog_text,
    })
}

fn read_required(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// A resolved build target.
///
/// Every string field is non-empty; `float_abi` and `fpu` are `None` when the
/// catalog leaves them unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDescriptor {
    /// Board name as requested by the project.
    pub name: String,
    /// Base FQBN handed to the vendor tool. Never carries options.
    pub toolchain_id: String,
    /// Vendor core (`vendor:arch`).
    pub core: String,
    /// Hardware API flavour; the board name when the catalog omits it.
    pub api: String,
    pub triple: String,
    pub cpu: String,
    pub float_abi: Option<String>,
    pub fpu: Option<String>,
    #[serde(skip)]
    pub options: BoardOptions,
}

impl TargetDescriptor {
    /// The `--board-options` value, if any option resolved.
    pub fn board_options_arg(&self) -> Option<String> {
        self.options.to_csv()
    }
}

/// Select the board named by `raw_config` from `raw_catalog`.
pub fn select_target(raw_config: &str, raw_catalog: &str) -> Result<TargetDescriptor> {
    let config = ProjectConfig::from_json(raw_config)?;
    let catalog = Catalog::from_json(raw_catalog)?;
    select_from(&config, &catalog)
}

/// Select from already-parsed documents.
pub fn select_from(config: &ProjectConfig, catalog: &Catalog) -> Result<TargetDescriptor> {
    let name = config.board_name()?;
    let profile = catalog.profile(name)?;
    let toolchain_id = profile.toolchain_base(name)?.to_string();

    let core = match non_empty(profile.core.as_deref()) {
        Some(core) => core.to_string(),
        None => core_from_fqbn(&toolchain_id).ok_or_else(|| ConfigError::MissingField {
            target: name.to_string(),
            field: "core",
        })?,
    };
    let api = non_empty(profile.api.as_deref()).unwrap_or(name).to_string();
    let options = BoardOptions::merge(&profile.default_board_options, &config.board_options);

    let descriptor = TargetDescriptor {
        name: name.to_string(),
        toolchain_id,
        core,
        api,
        triple: profile.triple().to_string(),
        cpu: profile.cpu().to_string(),
        float_abi: non_empty(profile.float_abi.as_deref()).map(str::to_string),
        fpu: non_empty(profile.fpu.as_deref()).map(str::to_string),
        options,
    };
    debug!(
        board = %descriptor.name,
        fqbn = %descriptor.toolchain_id,
        core = %descriptor.core,
        triple = %descriptor.triple,
        cpu = %descriptor.cpu,
        "target selected"
    );
    Ok(descriptor)
}

/// `vendor:arch` prefix of an FQBN, when it has at least two segments.
fn core_from_fqbn(fqbn: &str) -> Option<String> {
    let mut parts = fqbn.split(':');
    let vendor = parts.next().filter(|p| !p.is_empty())?;
    let arch = parts.next().filter(|p| !p.is_empty())?;
    Some(format!("{vendor}:{arch}"))
}
