//! Pipeline run report.

use std::fmt;
use std::path::PathBuf;

/// Terminal state of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStatus {
    Success,
    Failed { step: &'static str },
}

/// Timing for one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: &'static str,
    pub elapsed_ms: u64,
    pub ok: bool,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub pipeline: &'static str,
    /// Selected board, once known.
    pub board: Option<String>,
    pub duration_ms: u64,
    pub steps: Vec<StepRecord>,
    pub status: PipelineStatus,
    /// Log of the last step that wrote one.
    pub log: Option<PathBuf>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.status == PipelineStatus::Success
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== keel {} ===", self.pipeline)?;
        if let Some(board) = &self.board {
            writeln!(f, "Board: {board}")?;
        }
        writeln!(f, "Duration: {} ms", self.duration_ms)?;
        writeln!(f)?;

        writeln!(f, "--- Steps ---")?;
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(
                f,
                "  {}. {:<20} {:>6} ms  {}",
                i + 1,
                step.name,
                step.elapsed_ms,
                if step.ok { "ok" } else { "FAILED" }
            )?;
        }

        writeln!(f)?;
        match &self.status {
            PipelineStatus::Success => writeln!(f, "--- Result: SUCCESS ---")?,
            PipelineStatus::Failed { step } => writeln!(f, "--- Result: FAILED at {step} ---")?,
        }
        if let Some(log) = &self.log {
            writeln!(f, "Last log: {}", log.display())?;
        }
        Ok(())
    }
}
