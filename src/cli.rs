// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::parse_duration;

const EXAMPLES: &str = "\
It is required to specify either the primary or the secondary command (or both).

The secondary command runs in the background and is killed and restarted the
next time the primary command succeeds.

Examples:
  watchrun -rc 'cargo build' src/
  watchrun -rc 'cargo build' src/ -k 5m
  watchrun -ric 'cargo build' -u 'cargo run' src/
";

/// Command-line arguments for `watchrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchrun",
    version,
    about = "Run commands when watched files change.",
    after_help = EXAMPLES
)]
pub struct CliArgs {
    /// Files and directories to watch.
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Primary command to execute when a watched file or folder changes.
    #[arg(short = 'c', long = "command", value_name = "CMD")]
    pub primary: Option<String>,

    /// Secondary command to run in the background after the primary command
    /// succeeds.
    #[arg(short = 'u', long = "run", value_name = "CMD")]
    pub secondary: Option<String>,

    /// Kill the primary command after this duration (e.g. 500ms, 5s, 2m).
    /// By default it is never killed.
    #[arg(short = 'k', long = "timeout", value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// If a directory is supplied, also watch all its sub-directories.
    #[arg(short = 'r', long = "recurse")]
    pub recurse: bool,

    /// Run the primary command once on the first event and exit.
    #[arg(short = 'n', long = "once")]
    pub once: bool,

    /// Run the commands immediately, before watching for events.
    #[arg(short = 'i', long = "immediate")]
    pub immediate: bool,

    /// Append the stdout of the secondary command to a file.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
