//! Step functions and the pipelines built from them.

pub mod build;
pub mod common;
pub mod monitor;
pub mod upload;
pub mod verify;

use crate::pipeline::{Pipeline, Step};

/// `Init` → `ConfigSelect` → `WorkspacePrep` → `StageSources` → `CompileAndLink`.
pub fn build_pipeline() -> Pipeline {
    Pipeline::new(
        "build",
        vec![
            Step::new("Init", common::init),
            Step::new("ConfigSelect", common::config_select_validated),
            Step::new("WorkspacePrep", build::workspace_prep),
            Step::new("StageSources", build::stage_sources),
            Step::new("CompileAndLink", build::compile_and_link),
        ],
    )
}

pub fn verify_pipeline() -> Pipeline {
    Pipeline::new(
        "verify",
        vec![
            Step::new("Layout", verify::layout),
            Step::new("ConfigSelect", common::config_select),
            Step::new("HostDeps", verify::host_deps),
            Step::new("SwiftToolchain", verify::swift_toolchain),
            Step::new("WriteExports", verify::write_exports),
        ],
    )
}

pub fn upload_pipeline() -> Pipeline {
    Pipeline::new(
        "upload",
        vec![
            Step::new("Init", common::init),
            Step::new("ConfigSelect", common::config_select),
            Step::new("DetectPortAndUpload", upload::detect_port_and_upload),
        ],
    )
}

pub fn monitor_pipeline() -> Pipeline {
    Pipeline::new(
        "monitor",
        vec![
            Step::new("Init", common::init),
            Step::new("ConfigSelect", common::config_select),
            Step::new("OpenMonitor", monitor::open_monitor),
        ],
    )
}
