// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::CompileStrategy;

/// Command-line arguments for `devreload`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "devreload",
    version,
    about = "Recompile sources on change and front a dev server for hot reload.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `DevReload.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "DevReload.toml")]
    pub config: String,

    /// Override `[supervisor].strategy` from the config file.
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub strategy: Option<CompileStrategy>,

    /// Never probe for or launch the dev server; serve everything locally.
    #[arg(long)]
    pub no_dev_server: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEVRELOAD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved setup, but don't start anything.
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
