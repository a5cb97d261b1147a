//! Build steps: prepare the sketch workspace, stage sources, compile and link.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use keel_stage::walk::list_tree;
use keel_stage::{resolve_and_stage, StageRequest};
use tracing::{debug, info};

use crate::arduino::ArduinoCli;
use crate::context::BuildContext;
use crate::error::{PipelineError, Result};
use crate::process::{describe_status, run_tee, tail_lines, ARDUINO_TAIL_LINES, SWIFTC_TAIL_LINES};

const SHIM_HEADER: &str = "KeelShim.h";
const SHIM_HEADER_CANDIDATES: &[&str] = &[
    "KeelShim.h",
    "KeelShimBase.h",
    "KeelShim.hpp",
    "KeelShimBase.hpp",
];

const SHIM_SOURCE: &str = "KeelShim.cpp";
const SHIM_SOURCE_CANDIDATES: &[&str] = &["KeelShim.cpp", "KeelShimBase.cpp"];

const RUNTIME_SUPPORT_C: &[&str] = &["SwiftRuntimeSupport.c", "SwiftRuntimeSupportBase.c"];
const RUNTIME_SUPPORT_CPP: &[&str] = &[
    "SwiftRuntimeSupport.cpp",
    "SwiftRuntimeSupportBase.cpp",
    "SwiftRuntimeSupport.cxx",
    "SwiftRuntimeSupportBase.cxx",
];

/// Clean and recreate the workspace, then copy the runtime sketch template.
pub fn workspace_prep(ctx: &mut BuildContext) -> Result<()> {
    for dir in [&ctx.sketch_dir, &ctx.arduino_build_dir] {
        if dir.exists() {
            fs::remove_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
        }
    }
    for dir in [
        ctx.sketch_dir.join("libraries"),
        ctx.arduino_build_dir.clone(),
        ctx.logs_dir.clone(),
    ] {
        fs::create_dir_all(&dir).map_err(|e| PipelineError::io(&dir, e))?;
    }
    info!(sketch = %ctx.sketch_dir.display(), "preparing sketch workspace");

    let common = template_dir(ctx);
    debug!(template = %common.display(), "runtime sketch template");

    copy_required(&common, "sketch.ino", &ctx.sketch_dir)?;
    copy_first_as(&common, SHIM_HEADER_CANDIDATES, &ctx.sketch_dir, SHIM_HEADER)?;
    copy_first_as(&common, SHIM_SOURCE_CANDIDATES, &ctx.sketch_dir, SHIM_SOURCE)?;
    copy_required(&common, "Bridge.cpp", &ctx.sketch_dir)?;
    stage_runtime_support(ctx, &common)?;

    ctx.args.clear();
    ctx.staged = None;
    Ok(())
}

/// The template lives in `arduino/common`; older runtimes keep it directly
/// in `arduino/`.
fn template_dir(ctx: &BuildContext) -> PathBuf {
    let common = ctx.common_dir();
    if !common.is_dir() && ctx.runtime_arduino.join("sketch.ino").is_file() {
        return ctx.runtime_arduino.clone();
    }
    common
}

fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)
        .map(|_| ())
        .map_err(|e| PipelineError::io(dst, e))
}

fn copy_required(src_dir: &Path, name: &str, dst_dir: &Path) -> Result<()> {
    let src = src_dir.join(name);
    if !src.is_file() {
        return Err(PipelineError::MissingPath {
            what: "runtime template file",
            path: src,
        });
    }
    copy_file(&src, &dst_dir.join(name))?;
    info!(file = name, "using template file");
    Ok(())
}

/// Copy the first existing candidate to `dst_dir/dst_name`. `Ok(false)` when
/// none exists.
fn try_copy_first_as(src_dir: &Path, candidates: &[&str], dst_dir: &Path, dst_name: &str) -> Result<bool> {
    let Some(name) = candidates.iter().find(|name| src_dir.join(name).is_file()) else {
        return Ok(false);
    };
    copy_file(&src_dir.join(name), &dst_dir.join(dst_name))?;
    if *name == dst_name {
        info!(file = dst_name, "using template file");
    } else {
        info!(file = dst_name, from = *name, "using template file");
    }
    Ok(true)
}

fn copy_first_as(src_dir: &Path, candidates: &[&str], dst_dir: &Path, dst_name: &str) -> Result<()> {
    if try_copy_first_as(src_dir, candidates, dst_dir, dst_name)? {
        return Ok(());
    }
    if let Ok(listing) = list_tree(src_dir, 1) {
        debug!(dir = %src_dir.display(), files = ?listing, "template listing");
    }
    Err(PipelineError::MissingPath {
        what: "runtime template file",
        path: src_dir.join(dst_name),
    })
}

/// Optional runtime support source; a `.c` variant anywhere wins over `.cpp`.
fn stage_runtime_support(ctx: &BuildContext, common: &Path) -> Result<()> {
    let search: Vec<PathBuf> = [
        common.to_path_buf(),
        ctx.runtime_arduino.clone(),
        ctx.runtime_swift.clone(),
        ctx.runtime_swift.join("common"),
        ctx.runtime_swift.join("support"),
    ]
    .into_iter()
    .filter(|dir| dir.is_dir())
    .collect();

    for (candidates, dst_name) in [
        (RUNTIME_SUPPORT_C, "SwiftRuntimeSupport.c"),
        (RUNTIME_SUPPORT_CPP, "SwiftRuntimeSupport.cpp"),
    ] {
        for dir in &search {
            if try_copy_first_as(dir, candidates, &ctx.sketch_dir, dst_name)? {
                return Ok(());
            }
        }
    }
    debug!("no runtime support source in the tool runtime");
    Ok(())
}

/// Resolve and stage core and library sources into the sketch.
pub fn stage_sources(ctx: &mut BuildContext) -> Result<()> {
    let project = ctx.project()?;
    let request = StageRequest::new(&ctx.tool_root, &ctx.project_root, &ctx.sketch_dir)
        .with_libraries(project.swift_libs())
        .with_sketchbook(ctx.sketchbook_dir.clone(), project.sketchbook_libs());

    let staged = resolve_and_stage(&request, &mut ctx.args)?;
    info!(
        core_files = staged.core_files,
        libraries = staged.libraries.len(),
        shims = staged.shims.len(),
        promoted = staged.promoted.len(),
        sources = ctx.args.len(),
        fingerprint = %staged.fingerprint,
        "sources staged"
    );
    if tracing::enabled!(tracing::Level::DEBUG) {
        if let Ok(tree) = list_tree(&ctx.sketch_dir, 4) {
            for path in tree {
                debug!(path = %path.display(), "staged");
            }
        }
    }
    ctx.staged = Some(staged);
    Ok(())
}

/// The Embedded Swift compile of every accumulated source into one object.
pub fn swiftc_command(ctx: &BuildContext) -> Result<Command> {
    let flags = ctx.flags()?;
    let mut cmd = Command::new(ctx.compiler()?);
    cmd.args(["-target", &flags.triple, "-O", "-wmo", "-parse-as-library"])
        .args(["-Xfrontend", "-enable-experimental-feature", "-Xfrontend", "Embedded"])
        .args(["-Xfrontend", "-target-cpu", "-Xfrontend", &flags.cpu])
        .args(["-Xfrontend", "-disable-stack-protector"])
        .args(["-Xcc", &format!("-mcpu={}", flags.cpu)])
        .args(["-Xcc", "-mthumb", "-Xcc", "-ffreestanding", "-Xcc", "-fno-builtin"])
        .args(["-Xcc", "-fdata-sections", "-Xcc", "-ffunction-sections"])
        .args(flags.swiftc_xcc_args())
        .args(ctx.args.iter())
        .arg("-c")
        .arg("-o")
        .arg(&ctx.object_path);
    Ok(cmd)
}

/// The vendor compile that links the Swift object into the firmware.
pub fn arduino_compile_command(ctx: &BuildContext) -> Result<Command> {
    let target = ctx.target()?;
    let flags = ctx.flags()?;
    let extra = flags.extra_flags_string();

    let mut cmd = ArduinoCli::new(ctx.arduino_cli()).command("compile");
    cmd.args(["--clean", "--fqbn", &target.toolchain_id]);
    if let Some(options) = target.board_options_arg() {
        cmd.args(["--board-options", &options]);
    }
    if let Some(dir) = &ctx.sketchbook_dir {
        if ctx.project.as_ref().is_some_and(|p| !p.sketchbook_libs().is_empty()) {
            cmd.arg("--libraries").arg(dir);
        }
    }
    cmd.arg("--build-path")
        .arg(&ctx.arduino_build_dir)
        .args(["--build-property", &format!("compiler.c.extra_flags={extra}")])
        .args(["--build-property", &format!("compiler.cpp.extra_flags={extra}")])
        .args([
            "--build-property",
            &format!(
                "compiler.c.elf.extra_flags=\"{}\" -Wl,--defsym=end=_end",
                ctx.object_path.display()
            ),
        ])
        .arg(&ctx.sketch_dir);
    Ok(cmd)
}

fn run_logged(ctx: &mut BuildContext, log_name: &str, tool: &str, cmd: Command, tail: usize) -> Result<()> {
    let log = ctx.set_step_log(log_name)?;
    let status = run_tee(cmd, &log, ctx.verbose)?;
    if status.success() {
        return Ok(());
    }
    Err(PipelineError::ToolFailed {
        tool: tool.to_string(),
        status: describe_status(status),
        tail: tail_lines(&log, tail),
        log,
    })
}

/// Compile the Swift sources, then let `arduino-cli` build and link the sketch.
pub fn compile_and_link(ctx: &mut BuildContext) -> Result<()> {
    ctx.require("entry module", &ctx.entry_module)?;
    let entry = ctx.entry_module.clone();
    ctx.args.push(entry)?;

    let swiftc = swiftc_command(ctx)?;
    run_logged(ctx, "build_swiftc", "swiftc", swiftc, SWIFTC_TAIL_LINES)?;
    info!(object = %ctx.object_path.display(), "Swift object built");

    let compile = arduino_compile_command(ctx)?;
    run_logged(ctx, "build_arduino_cli", "arduino-cli compile", compile, ARDUINO_TAIL_LINES)?;
    info!(artifacts = %ctx.arduino_build_dir.display(), "build complete");
    Ok(())
}
