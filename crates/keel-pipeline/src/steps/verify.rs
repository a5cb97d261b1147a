//! Verify steps: check the host can build the selected board and record the
//! resolved toolchain.

use std::fs;

use tracing::info;

use crate::arduino::ArduinoCli;
use crate::context::BuildContext;
use crate::error::{PipelineError, Result};
use crate::steps::common::{locate_arduino_cli, validate_swift_toolchain};
use crate::toolchain::{write_env_script, ToolchainCache};

/// Both configuration documents exist; the build dir is created.
pub fn layout(ctx: &mut BuildContext) -> Result<()> {
    ctx.require("project configuration", &ctx.config_path)?;
    ctx.require("board catalog", &ctx.catalog_path)?;
    fs::create_dir_all(&ctx.build_dir).map_err(|e| PipelineError::io(&ctx.build_dir, e))?;
    info!(project = %ctx.project_root.display(), tool = %ctx.tool_root.display(), "layout ok");
    Ok(())
}

/// `arduino-cli` is present and the board's core is installed.
pub fn host_deps(ctx: &mut BuildContext) -> Result<()> {
    locate_arduino_cli(ctx)?;
    let cli = ArduinoCli::new(ctx.arduino_cli());
    cli.update_index();

    let core = ctx.target()?.core.clone();
    if cli.core_installed(&core) {
        info!(core = %core, "Arduino core installed");
        return Ok(());
    }
    if !ctx.install_missing_core {
        return Err(PipelineError::CoreNotInstalled { core });
    }
    cli.install_core(&core)?;
    if cli.core_installed(&core) {
        Ok(())
    } else {
        Err(PipelineError::CoreNotInstalled { core })
    }
}

/// The compiler resolves to a real path and ships the Embedded runtime.
pub fn swift_toolchain(ctx: &mut BuildContext) -> Result<()> {
    validate_swift_toolchain(ctx)?;
    let compiler = ctx.compiler()?;
    let absolute = fs::canonicalize(compiler).map_err(|e| PipelineError::io(compiler, e))?;
    ctx.compiler = Some(absolute);
    Ok(())
}

/// Persist the toolchain cache and `env.sh`.
pub fn write_exports(ctx: &mut BuildContext) -> Result<()> {
    let cache = ToolchainCache::new(ctx.compiler()?, ctx.target()?);
    cache.store(&ctx.cache_path)?;
    write_env_script(&ctx.env_script_path, &cache)?;
    info!(
        cache = %ctx.cache_path.display(),
        env = %ctx.env_script_path.display(),
        "toolchain exports written; `source build/env.sh` to use them"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use keel_targets::select_target;

    use super::*;

    #[test]
    fn layout_requires_catalog() {
        let project = tempfile::tempdir().unwrap();
        let tool = tempfile::tempdir().unwrap();
        fs::write(project.path().join("config.json"), "{}").unwrap();

        let mut ctx = BuildContext::new(project.path(), tool.path());
        match layout(&mut ctx).unwrap_err() {
            PipelineError::MissingPath { what, .. } => assert_eq!(what, "board catalog"),
            other => panic!("unexpected error: {other}"),
        }

        fs::write(tool.path().join("boards.json"), "{}").unwrap();
        layout(&mut ctx).unwrap();
        assert!(ctx.build_dir.is_dir());
    }

    #[test]
    fn exports_are_written_from_context() {
        let project = tempfile::tempdir().unwrap();
        let mut ctx = BuildContext::new(project.path(), project.path());
        ctx.target = Some(
            select_target(
                r#"{ "board": "minima" }"#,
                r#"{ "minima": {
                    "fqbn": "arduino:renesas_uno:minima",
                    "swift_target": "armv7em-none-none-eabi",
                    "cpu": "cortex-m4"
                } }"#,
            )
            .unwrap(),
        );
        ctx.compiler = Some(PathBuf::from("/opt/swift/bin/swiftc"));

        write_exports(&mut ctx).unwrap();

        let cache = ToolchainCache::load(&ctx.cache_path).unwrap().unwrap();
        assert_eq!(cache.core, "arduino:renesas_uno");
        assert_eq!(cache.swiftc, PathBuf::from("/opt/swift/bin/swiftc"));
        let env = fs::read_to_string(&ctx.env_script_path).unwrap();
        assert!(env.contains("export KEEL_BOARD=\"minima\""));
    }
}
