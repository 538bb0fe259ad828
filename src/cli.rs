// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `testwatch`.
///
/// Every watch/runner flag overrides the matching value from the config
/// file.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "testwatch",
    version,
    about = "Watch a source tree and re-run the tests affected by each change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML). A missing file is fine when
    /// `--path` is given.
    #[arg(long, value_name = "PATH", default_value = "Testwatch.toml")]
    pub config: PathBuf,

    /// Directory to watch (repeatable). Replaces `watch.paths`.
    #[arg(long = "path", value_name = "DIR")]
    pub paths: Vec<PathBuf>,

    /// Which tests a change triggers (all, changed, related).
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Quiet period in milliseconds before a batch of changes is handled.
    #[arg(long, value_name = "MS", allow_negative_numbers = true)]
    pub debounce_ms: Option<i64>,

    /// Test command template; `{targets}` is replaced by the packages.
    #[arg(long, value_name = "CMD")]
    pub command: Option<String>,

    /// Clear the screen before each run.
    #[arg(long)]
    pub clear: bool,

    /// Run the whole suite once at startup.
    #[arg(long)]
    pub run_on_start: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TESTWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate and print the effective configuration, then exit.
    #[arg(long)]
    pub dry_run: bool,
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
