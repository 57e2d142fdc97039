//! CLI argument parsing and command dispatch

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use repolish::output::OutputConfig;

/// Repolish - Keep a repository in line with its template providers
#[derive(Parser, Debug)]
#[command(name = "repolish")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply the provider templates to the project (or check it with --check)
    Apply(commands::apply::ApplyArgs),

    /// Run the link command of every `cli` provider and create its links
    Link(commands::link::LinkArgs),

    /// Run the text merge engine on a debug file and print the result
    Preview(commands::preview::PreviewArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<ExitCode> {
        init_logging(&self.log_level);
        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Apply(args) => commands::apply::execute(args, &output),
            Commands::Link(args) => commands::link::execute(args, &output),
            Commands::Preview(args) => commands::preview::execute(args, &output),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A second initialisation (tests driving `execute` twice) is harmless.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
