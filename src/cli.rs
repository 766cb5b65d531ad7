// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `autoscripts`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "autoscripts",
    version,
    about = "Run scripts matched by configured globs and re-run them when they change.",
    long_about = None
)]
pub struct CliArgs {
    /// Workspace root. Relative globs resolve against it and the workspace
    /// scope is read from `<workspace>/.autoscripts/settings.toml`.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub workspace: PathBuf,

    /// Active workspace folder; its `.autoscripts/settings.toml` is the most
    /// specific scope.
    #[arg(long, value_name = "DIR")]
    pub folder: Option<PathBuf>,

    /// Override the location of the user (global) settings file.
    ///
    /// Default: `<config dir>/autoscripts/settings.toml`.
    #[arg(long, value_name = "PATH")]
    pub user_config: Option<PathBuf>,

    /// Default-scope glob; used only when no other scope sets `scripts`.
    #[arg(long = "default", value_name = "GLOB")]
    pub defaults: Vec<String>,

    /// Run one reconciliation cycle, then stop watching and exit.
    #[arg(long)]
    pub once: bool,

    /// Print effective patterns and matched files without executing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `AUTOSCRIPTS_LOG` or a default level will be used.
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
