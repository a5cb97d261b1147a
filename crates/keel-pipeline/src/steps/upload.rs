//! Upload step.

use std::path::PathBuf;
use std::process::Command;

use keel_stage::walk::{list_files, list_tree};
use tracing::info;

use crate::arduino::ArduinoCli;
use crate::context::BuildContext;
use crate::error::{PipelineError, Result};
use crate::process::{describe_status, run_tee, tail_lines, ARDUINO_TAIL_LINES};
use crate::steps::common::select_port;

/// Firmware image extensions `arduino-cli upload` can consume.
pub const ARTIFACT_EXTS: &[&str] = &["bin", "hex", "uf2", "elf"];

/// Firmware images under the vendor build dir.
pub fn find_artifacts(ctx: &BuildContext) -> Result<Vec<PathBuf>> {
    if !ctx.arduino_build_dir.is_dir() {
        return Ok(Vec::new());
    }
    Ok(list_files(&ctx.arduino_build_dir, ARTIFACT_EXTS)?)
}

fn require_artifacts(ctx: &BuildContext) -> Result<()> {
    let artifacts = find_artifacts(ctx)?;
    if let Some(first) = artifacts.first() {
        info!(artifacts = artifacts.len(), first = %first.display(), "build artifacts found");
        return Ok(());
    }
    let listing = if ctx.arduino_build_dir.is_dir() {
        list_tree(&ctx.arduino_build_dir, 8)?
            .into_iter()
            .map(|path| path.display().to_string())
            .collect()
    } else {
        Vec::new()
    };
    Err(PipelineError::MissingArtifacts {
        dir: ctx.arduino_build_dir.clone(),
        listing,
    })
}

pub fn upload_command(ctx: &BuildContext, port: &str) -> Result<Command> {
    let target = ctx.target()?;
    let mut cmd = ArduinoCli::new(ctx.arduino_cli()).command("upload");
    cmd.args(["-p", port, "--fqbn", &target.toolchain_id]);
    if let Some(options) = target.board_options_arg() {
        cmd.args(["--board-options", &options]);
    }
    cmd.arg("--input-dir")
        .arg(&ctx.arduino_build_dir)
        .arg(&ctx.sketch_dir);
    Ok(cmd)
}

/// Check the build produced firmware, find the port, and flash the board.
pub fn detect_port_and_upload(ctx: &mut BuildContext) -> Result<()> {
    require_artifacts(ctx)?;
    let port = select_port(ctx)?;
    info!(
        fqbn = %ctx.target()?.toolchain_id,
        port = %port,
        input = %ctx.arduino_build_dir.display(),
        "uploading"
    );

    let cmd = upload_command(ctx, &port)?;
    let log = ctx.set_step_log("upload_arduino_cli")?;
    let status = run_tee(cmd, &log, true)?;
    if !status.success() {
        info!("on DFU boards, double-tap RESET to re-enter the bootloader, or set PORT explicitly");
        return Err(PipelineError::ToolFailed {
            tool: "arduino-cli upload".to_string(),
            status: describe_status(status),
            tail: tail_lines(&log, ARDUINO_TAIL_LINES),
            log,
        });
    }
    info!("upload complete");
    Ok(())
}
