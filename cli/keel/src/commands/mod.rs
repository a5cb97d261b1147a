//! CLI command implementations.

pub mod build;
pub mod monitor;
pub mod upload;
pub mod verify;

use anyhow::{anyhow, Result};
use keel_pipeline::{BuildContext, Pipeline, PipelineError, PipelineFailure, PipelineReport};

/// Run `pipeline` and print its report. On failure, the useful part of the
/// error (log tail, port listing, build dir listing) goes to stderr first.
pub fn execute(pipeline: &Pipeline, ctx: &mut BuildContext) -> Result<PipelineReport> {
    match pipeline.run(ctx) {
        Ok(report) => {
            println!("{report}");
            Ok(report)
        }
        Err(failure) => {
            print_failure(&failure);
            Err(anyhow!(failure))
        }
    }
}

const SEPARATOR: &str = "----------------------------------------";

fn print_failure(failure: &PipelineFailure) {
    match &failure.source {
        PipelineError::ToolFailed { tail, .. } if !tail.is_empty() => {
            eprintln!("{SEPARATOR}");
            for line in tail {
                eprintln!("{line}");
            }
            eprintln!("{SEPARATOR}");
        }
        PipelineError::PortNotFound { listing, .. } => {
            eprintln!("--- arduino-cli board list ---");
            eprintln!("{}", listing.trim_end());
            eprintln!("Set PORT explicitly, e.g. PORT=/dev/cu.usbmodemXXXX keel upload");
        }
        PipelineError::MissingArtifacts { listing, .. } => {
            eprintln!("--- arduino_build contents ---");
            for path in listing {
                eprintln!("{path}");
            }
        }
        _ => {}
    }
    eprint!("{}", failure.report);
}
