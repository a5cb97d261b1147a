//! keel: build Embedded Swift sketches for Arduino boards through arduino-cli.

mod commands;
mod logging;

use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use keel_pipeline::{BuildContext, Overrides};

#[derive(Parser)]
#[command(name = "keel", version, about = "Embedded Swift build orchestrator for arduino-cli boards")]
struct Cli {
    /// Project directory holding config.json and main.swift (default: current directory)
    #[arg(long, global = true, env = "KEEL_ROOT")]
    project_root: Option<PathBuf>,

    /// Tool directory holding boards.json and the arduino/ and swift/ runtime trees
    /// (default: the directory of the keel executable)
    #[arg(long, global = true, env = "KEEL_TOOL_ROOT")]
    tool_root: Option<PathBuf>,

    /// Debug logging, and echo child tool output to the terminal
    #[arg(long, short, global = true, env = "KEEL_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the host toolchain and write build/env.sh
    Verify {
        /// Install the board's Arduino core when it is missing
        #[arg(long)]
        install_core: bool,
    },
    /// Stage sources, compile the Swift object and link the sketch
    #[command(alias = "compile")]
    Build,
    /// Flash the last build to the detected serial port
    Upload,
    /// Open a serial monitor on the detected port
    Monitor,
    /// verify, build, upload and monitor in sequence
    All,
}

/// Launch settings shared by every command.
pub struct Invocation {
    pub project_root: PathBuf,
    pub tool_root: PathBuf,
    pub verbose: bool,
    pub overrides: Overrides,
}

impl Invocation {
    /// A fresh context for one pipeline run.
    pub fn context(&self) -> BuildContext {
        BuildContext::new(&self.project_root, &self.tool_root)
            .with_verbose(self.verbose)
            .with_overrides(self.overrides.clone())
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let project_root = match cli.project_root {
        Some(dir) => dir,
        None => env::current_dir().context("reading current directory")?,
    };
    let tool_root = match cli.tool_root {
        Some(dir) => dir,
        None => default_tool_root()?,
    };
    let invocation = Invocation {
        project_root,
        tool_root,
        verbose: cli.verbose,
        overrides: overrides_from_env(),
    };

    match cli.command {
        Commands::Verify { install_core } => commands::verify::run(&invocation, install_core),
        Commands::Build => commands::build::run(&invocation),
        Commands::Upload => commands::upload::run(&invocation),
        Commands::Monitor => commands::monitor::run(&invocation),
        Commands::All => {
            commands::verify::run(&invocation, false)?;
            commands::build::run(&invocation)?;
            commands::upload::run(&invocation)?;
            commands::monitor::run(&invocation)
        }
    }
}

fn default_tool_root() -> anyhow::Result<PathBuf> {
    let exe = env::current_exe().context("locating the keel executable")?;
    let exe = exe.canonicalize().unwrap_or(exe);
    exe.parent()
        .map(PathBuf::from)
        .context("the keel executable has no parent directory")
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn overrides_from_env() -> Overrides {
    Overrides {
        swiftc: non_empty("SWIFTC").map(PathBuf::from),
        port: non_empty("PORT"),
        baud: non_empty("BAUD"),
        home: env::var_os("HOME").map(PathBuf::from),
        path: env::var_os("PATH"),
    }
}
