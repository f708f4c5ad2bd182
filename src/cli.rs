// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::TaskId;

/// Command-line arguments for `sitepipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build a static site from src/ into dist/, or serve it with live reload.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Sitepipe.toml` in the current working directory. When the
    /// default file is absent the built-in path table is used.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve config and print the task graph, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    /// The invocation this command line asks for; no subcommand means the
    /// production build.
    pub fn invocation(&self) -> Invocation {
        match self.command.unwrap_or(Command::Build) {
            Command::Build => Invocation::Build,
            Command::Dev => Invocation::Dev,
            Command::Clean => Invocation::Single(TaskId::Clean),
            Command::Html => Invocation::Single(TaskId::Html),
            Command::Scss => Invocation::Single(TaskId::Scss),
            Command::ScssMin => Invocation::Single(TaskId::ScssMin),
            Command::Js => Invocation::Single(TaskId::Js),
            Command::Images => Invocation::Single(TaskId::Images),
            Command::Vendor => Invocation::Single(TaskId::Vendor),
            Command::Fonts => Invocation::Single(TaskId::Fonts),
            Command::Others => Invocation::Single(TaskId::Others),
        }
    }
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Command {
    /// Production build: clean, html, styles + scripts, then static assets.
    Build,
    /// Development build followed by watchers and the live-reload server.
    Dev,
    /// Empty the output directory.
    Clean,
    /// Render pages with partials.
    Html,
    /// Compile stylesheets (expanded).
    Scss,
    /// Compile stylesheets (minified).
    ScssMin,
    /// Minify scripts.
    Js,
    /// Copy images.
    Images,
    /// Copy vendor files.
    Vendor,
    /// Copy fonts.
    Fonts,
    /// Copy other top-level static files.
    Others,
}

/// What the process was asked to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    Build,
    Dev,
    Single(TaskId),
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
