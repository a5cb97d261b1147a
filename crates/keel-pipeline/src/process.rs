//! Child process helpers: tee to a step log, capture, tail.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

use crate::error::{PipelineError, Result};

/// Lines of the compiler log echoed on failure.
pub const SWIFTC_TAIL_LINES: usize = 120;

/// Lines of the vendor tool log echoed on failure.
pub const ARDUINO_TAIL_LINES: usize = 160;

/// Render a command line for logs.
pub fn display_command(cmd: &Command) -> String {
    let mut line = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        let arg = arg.to_string_lossy();
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('"') {
            line.push('\'');
            line.push_str(&arg);
            line.push('\'');
        } else {
            line.push_str(&arg);
        }
    }
    line
}

/// Run `cmd` with stdout and stderr merged into one pipe, appending every
/// line to `log` and echoing it to stdout when `echo` is set. Blocks until the
/// child exits.
pub fn run_tee(mut cmd: Command, log: &Path, echo: bool) -> Result<ExitStatus> {
    if let Some(parent) = log.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let mut log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log)
        .map_err(|e| PipelineError::io(log, e))?;

    let rendered = display_command(&cmd);
    debug!(command = %rendered, log = %log.display(), "spawning");
    writeln!(log_file, "$ {rendered}").map_err(|e| PipelineError::io(log, e))?;

    let (reader, writer) = io::pipe().map_err(|e| PipelineError::io(log, e))?;
    let writer_err = writer.try_clone().map_err(|e| PipelineError::io(log, e))?;
    cmd.stdin(Stdio::null()).stdout(writer).stderr(writer_err);

    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut child = cmd
        .spawn()
        .map_err(|e| PipelineError::io(program.as_str(), e))?;
    // The command still owns the write ends; the reader only sees EOF once
    // every copy is closed.
    drop(cmd);

    copy_lines(reader, &mut log_file, echo).map_err(|e| PipelineError::io(log, e))?;
    child.wait().map_err(|e| PipelineError::io(program.as_str(), e))
}

fn copy_lines(reader: impl io::Read, log: &mut File, echo: bool) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    let stdout = io::stdout();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        log.write_all(&line)?;
        if echo {
            let mut out = stdout.lock();
            out.write_all(&line)?;
            out.flush()?;
        }
    }
    Ok(())
}

/// Run `cmd` to completion and return its stdout, or `None` if it could not
/// be spawned or exited non-zero.
pub fn capture(mut cmd: Command) -> Option<String> {
    debug!(command = %display_command(&cmd), "capturing");
    let output = cmd.stdin(Stdio::null()).stderr(Stdio::null()).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run `cmd` attached to the terminal (for interactive sessions).
pub fn run_attached(mut cmd: Command) -> Result<ExitStatus> {
    debug!(command = %display_command(&cmd), "running attached");
    let program = cmd.get_program().to_string_lossy().into_owned();
    cmd.status().map_err(|e| PipelineError::io(program.as_str(), e))
}

/// The last `max` lines of `path`; empty if the file cannot be read.
pub fn tail_lines(path: &Path, max: usize) -> Vec<String> {
    let Ok(bytes) = fs::read(path) else {
        return Vec::new();
    };
    let text = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

/// Human-readable exit status.
pub fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
