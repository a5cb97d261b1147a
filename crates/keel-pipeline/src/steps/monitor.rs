//! Monitor step.

use std::process::Command;

use tracing::info;

use crate::arduino::ArduinoCli;
use crate::context::BuildContext;
use crate::error::{PipelineError, Result};
use crate::process::{describe_status, run_attached};
use crate::steps::common::select_port;

pub const DEFAULT_BAUD: &str = "115200";

pub fn baud_rate(ctx: &BuildContext) -> &str {
    ctx.overrides
        .baud
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(DEFAULT_BAUD)
}

pub fn monitor_command(ctx: &BuildContext, port: &str) -> Command {
    let mut cmd = ArduinoCli::new(ctx.arduino_cli()).command("monitor");
    cmd.args(["-p", port, "-c", &format!("baudrate={}", baud_rate(ctx))]);
    cmd
}

/// Open the serial monitor attached to the terminal until the user quits.
pub fn open_monitor(ctx: &mut BuildContext) -> Result<()> {
    let port = select_port(ctx)?;
    info!(port = %port, baud = baud_rate(ctx), "opening serial monitor (Ctrl-C to exit)");
    let status = run_attached(monitor_command(ctx, &port))?;
    if status.success() {
        Ok(())
    } else {
        Err(PipelineError::ToolFailed {
            tool: "arduino-cli monitor".to_string(),
            status: describe_status(status),
            log: Default::default(),
            tail: Vec::new(),
        })
    }
}
