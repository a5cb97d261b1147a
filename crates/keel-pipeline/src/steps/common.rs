//! Steps shared by several pipelines.

use keel_targets::{derive, derive_with, select_from, Catalog, ConfigError, ProjectConfig};
use tracing::{debug, info};

use crate::arduino::ArduinoCli;
use crate::context::BuildContext;
use crate::error::{PipelineError, Result};
use crate::port::{check_override, PortDetector};
use crate::toolchain::{embedded_runtime_dir, find_tool, resolve_compiler, runtime_inventory};

/// Check the tool runtime tree and the project configuration exist, and find
/// `arduino-cli`.
pub fn init(ctx: &mut BuildContext) -> Result<()> {
    ctx.require("runtime Arduino dir", &ctx.runtime_arduino)?;
    ctx.require("runtime Swift dir", &ctx.runtime_swift)?;
    ctx.require("project configuration", &ctx.config_path)?;
    locate_arduino_cli(ctx)
}

pub(crate) fn locate_arduino_cli(ctx: &mut BuildContext) -> Result<()> {
    let cli = find_tool(
        "arduino-cli",
        &ctx.overrides,
        "install it from https://arduino.github.io/arduino-cli/",
    )?;
    debug!(arduino_cli = %cli.display(), "found vendor tool");
    ctx.arduino_cli = Some(cli);
    Ok(())
}

/// Load both documents and resolve the target descriptor and base flags.
pub fn config_select(ctx: &mut BuildContext) -> Result<()> {
    let raw = keel_targets::load_sources(&ctx.project_root, &ctx.tool_root)?;
    let project = ProjectConfig::from_json(&raw.config_text)?;
    let catalog = Catalog::from_json(&raw.catalog_text)?;
    let target = select_from(&project, &catalog).inspect_err(|e| {
        if matches!(e, ConfigError::UnknownTarget { .. }) {
            info!(available = ?catalog.names(), "boards in catalog");
        }
    })?;

    info!(
        board = %target.name,
        fqbn = %target.toolchain_id,
        core = %target.core,
        api = %target.api,
        swift_target = %target.triple,
        cpu = %target.cpu,
        "board selected"
    );
    if let Some(options) = target.board_options_arg() {
        info!(board_options = %options);
    }

    ctx.sketchbook_dir = project.sketchbook_dir(ctx.overrides.home.as_deref());
    ctx.flags = Some(derive(&target));
    ctx.target = Some(target);
    ctx.project = Some(project);
    ctx.raw_config = raw.config_text;
    ctx.raw_catalog = raw.catalog_text;
    Ok(())
}

/// [`config_select`] plus the environment checks a build depends on.
pub fn config_select_validated(ctx: &mut BuildContext) -> Result<()> {
    config_select(ctx)?;
    require_core(ctx)?;
    validate_swift_toolchain(ctx)
}

/// Fail unless the target's Arduino core is installed.
pub(crate) fn require_core(ctx: &BuildContext) -> Result<()> {
    let core = &ctx.target()?.core;
    let cli = ArduinoCli::new(ctx.arduino_cli());
    if cli.core_installed(core) {
        info!(core = %core, "Arduino core installed");
        Ok(())
    } else {
        Err(PipelineError::CoreNotInstalled { core: core.clone() })
    }
}

/// Resolve the compiler, confirm it has an Embedded runtime, and derive the
/// final flags against its runtime inventory.
pub(crate) fn validate_swift_toolchain(ctx: &mut BuildContext) -> Result<()> {
    let compiler = resolve_compiler(&ctx.overrides, &ctx.cache_path)?;
    let target = ctx.target()?;

    let runtime_dir = embedded_runtime_dir(&compiler, &target.triple).ok_or_else(|| {
        PipelineError::RuntimeUnavailable {
            compiler: compiler.clone(),
            triple: target.triple.clone(),
        }
    })?;
    let inventory = runtime_inventory(&runtime_dir);
    let flags = derive_with(target, &inventory);
    if !inventory.has(&flags.triple) {
        return Err(PipelineError::RuntimeUnavailable {
            compiler,
            triple: flags.triple,
        });
    }

    info!(
        swiftc = %compiler.display(),
        runtime = %runtime_dir.display(),
        swift_target = %flags.triple,
        cpu = %flags.cpu,
        extra_flags = %flags.extra_flags_string(),
        "Embedded Swift toolchain ready"
    );
    ctx.flags = Some(flags);
    ctx.compiler = Some(compiler);
    Ok(())
}

/// Pick the serial port: a checked `PORT` override, else detection.
pub(crate) fn select_port(ctx: &mut BuildContext) -> Result<String> {
    let port = match ctx.overrides.port.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(explicit) => {
            let port = check_override(explicit)?;
            info!(port = %port, "using PORT override");
            port
        }
        None => {
            let cli = ArduinoCli::new(ctx.arduino_cli());
            PortDetector::new(&cli).detect(&ctx.target()?.toolchain_id)?
        }
    };
    ctx.port = Some(port.clone());
    Ok(port)
}
