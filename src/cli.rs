// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `cdrwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cdrwatch",
    version,
    about = "Watch a CDR spool directory and feed well-formed files to the record importer.",
    long_about = None
)]
pub struct CliArgs {
    /// Spool directory to watch for incoming `*.cdr.xml` files.
    #[arg(long, value_name = "DIR")]
    pub spool_dir: PathBuf,

    /// PostgreSQL connection URL for the record store.
    #[arg(long, value_name = "URL", env = "DATABASE_URL")]
    pub database_url: String,

    /// Skip kernel change notification and poll the directory instead.
    #[arg(long)]
    pub poll: bool,

    /// Drain the spool once and exit (no watching).
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CDRWATCH_LOG` or a default level will be used.
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
