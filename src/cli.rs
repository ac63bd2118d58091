// src/cli.rs

//! CLI argument parsing using `clap`.

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

/// Command-line arguments for `siteplan`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "siteplan",
    version,
    about = "Schedule a construction project from its dependency graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the project file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Siteplan.toml")]
    pub config: String,

    /// Date to schedule from (YYYY-MM-DD). Defaults to the project start date.
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,

    /// Apply a workflow action before scheduling, e.g. `task:3=start` or
    /// `step:7=progress=40`. May be repeated; applied in order, all-or-nothing.
    #[arg(long, value_name = "NODE=ACTION")]
    pub apply: Vec<String>,

    /// Recorded as the actor of every applied action.
    #[arg(long, value_name = "NAME")]
    pub actor: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPLAN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse and validate, print the project, but don't schedule it.
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

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
