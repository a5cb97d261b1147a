//! Thin wrapper over the `arduino-cli` executable.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::port::DeviceLister;
use crate::process::{capture, describe_status, run_attached};

/// The vendor build tool.
#[derive(Debug, Clone)]
pub struct ArduinoCli {
    program: PathBuf,
}

impl ArduinoCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// A fresh command for one `arduino-cli` subcommand.
    pub fn command(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(subcommand);
        cmd
    }

    /// Refresh the platform index. Failures are only logged.
    pub fn update_index(&self) {
        let mut cmd = self.command("core");
        cmd.arg("update-index");
        if capture(cmd).is_none() {
            warn!("`arduino-cli core update-index` failed; continuing with the cached index");
        }
    }

    /// Installed core identifiers.
    pub fn installed_cores(&self) -> Vec<String> {
        let mut cmd = self.command("core");
        cmd.arg("list");
        capture(cmd)
            .map(|text| parse_core_list(&text))
            .unwrap_or_default()
    }

    pub fn core_installed(&self, core: &str) -> bool {
        self.installed_cores().iter().any(|c| c == core)
    }

    /// Install `core`, attached to the terminal.
    pub fn install_core(&self, core: &str) -> Result<()> {
        info!(core, "installing Arduino core");
        let mut cmd = self.command("core");
        cmd.args(["install", core]);
        let status = run_attached(cmd)?;
        if status.success() {
            Ok(())
        } else {
            Err(PipelineError::ToolFailed {
                tool: "arduino-cli core install".to_string(),
                status: describe_status(status),
                log: PathBuf::new(),
                tail: Vec::new(),
            })
        }
    }
}

impl DeviceLister for ArduinoCli {
    fn list_json(&self) -> Option<String> {
        let mut cmd = self.command("board");
        cmd.args(["list", "--format", "json"]);
        capture(cmd)
    }

    fn list_table(&self) -> Option<String> {
        let mut cmd = self.command("board");
        cmd.arg("list");
        capture(cmd)
    }

    fn device_nodes(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir("/dev") else {
            return Vec::new();
        };
        let mut nodes: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path().to_string_lossy().into_owned())
            .collect();
        nodes.sort();
        nodes
    }
}

/// First column of every data row of `arduino-cli core list`.
pub fn parse_core_list(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|id| *id != "ID" && id.contains(':'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_list_first_column() {
        let text = "\
ID                Installed Latest Name
arduino:mbed_giga 4.1.5     4.2.1  Arduino Mbed OS Giga Boards
arduino:sam       1.6.12    1.6.12 Arduino SAM Boards (32-bits ARM Cortex-M3)
";
        assert_eq!(
            parse_core_list(text),
            vec!["arduino:mbed_giga".to_string(), "arduino:sam".to_string()]
        );
        assert!(parse_core_list("No platforms installed.\n").is_empty());
    }

    #[test]
    fn commands_use_configured_program() {
        let cli = ArduinoCli::new("/opt/arduino-cli");
        let cmd = cli.command("compile");
        assert_eq!(cmd.get_program(), "/opt/arduino-cli");
        assert_eq!(cmd.get_args().collect::<Vec<_>>(), vec!["compile"]);
    }
}
