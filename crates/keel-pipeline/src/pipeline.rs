//! Step-by-step pipeline driver.

use std::time::Instant;

use thiserror::Error;
use tracing::{error, info};

use crate::context::BuildContext;
use crate::error::{PipelineError, Result};
use crate::report::{PipelineReport, PipelineStatus, StepRecord};

/// A named step over the shared context.
#[derive(Clone, Copy)]
pub struct Step {
    pub name: &'static str,
    pub run: fn(&mut BuildContext) -> Result<()>,
}

impl Step {
    pub const fn new(name: &'static str, run: fn(&mut BuildContext) -> Result<()>) -> Self {
        Self { name, run }
    }
}

/// A pipeline run stopped at a step.
#[derive(Debug, Error)]
#[error("step `{step}` failed")]
pub struct PipelineFailure {
    pub step: &'static str,
    pub report: PipelineReport,
    #[source]
    pub source: PipelineError,
}

/// An ordered list of steps for one command.
pub struct Pipeline {
    name: &'static str,
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(name: &'static str, steps: Vec<Step>) -> Self {
        Self { name, steps }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name).collect()
    }

    /// Run every step in order, stopping at the first failure. Nothing is
    /// rolled back; the workspace is left as the failing step found it.
    pub fn run(&self, ctx: &mut BuildContext) -> std::result::Result<PipelineReport, PipelineFailure> {
        let start = Instant::now();
        let mut records = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            info!(
                pipeline = self.name,
                stage = step.name,
                step = index + 1,
                of = self.steps.len(),
                status = "start"
            );
            let step_start = Instant::now();
            let outcome = (step.run)(ctx);
            let elapsed_ms = step_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => {
                    info!(pipeline = self.name, stage = step.name, status = "ok", elapsed_ms);
                    records.push(StepRecord {
                        name: step.name,
                        elapsed_ms,
                        ok: true,
                    });
                }
                Err(source) => {
                    error!(pipeline = self.name, stage = step.name, status = "failed", elapsed_ms, "{source}");
                    records.push(StepRecord {
                        name: step.name,
                        elapsed_ms,
                        ok: false,
                    });
                    let report = PipelineReport {
                        pipeline: self.name,
                        board: ctx.target.as_ref().map(|t| t.name.clone()),
                        duration_ms: start.elapsed().as_millis() as u64,
                        steps: records,
                        status: PipelineStatus::Failed { step: step.name },
                        log: ctx.last_log.clone(),
                    };
                    return Err(PipelineFailure {
                        step: step.name,
                        report,
                        source,
                    });
                }
            }
        }

        Ok(PipelineReport {
            pipeline: self.name,
            board: ctx.target.as_ref().map(|t| t.name.clone()),
            duration_ms: start.elapsed().as_millis() as u64,
            steps: records,
            status: PipelineStatus::Success,
            log: ctx.last_log.clone(),
        })
    }
}
