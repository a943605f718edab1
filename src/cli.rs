// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `dotgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dotgraph",
    version,
    about = "Bootstrap a machine by running a dependency graph of setup stages.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Dotgraph.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Dotgraph.toml")]
    pub config: String,

    /// Walk the graph, but only log what each stage would install or run.
    #[arg(long)]
    pub dry_run: bool,

    /// Parse + validate, print the stage plan, but don't execute anything.
    #[arg(long)]
    pub check: bool,

    /// Shorthand for `--log-level debug`.
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `--verbose`, `DOTGRAPH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Treat the machine as running this platform (e.g. `darwin`, `linux`).
    #[arg(long, value_name = "OS")]
    pub platform: Option<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
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
