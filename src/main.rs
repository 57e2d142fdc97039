//! # Repolish CLI
//!
//! This is the binary entry point for the `repolish` command-line tool.
//!
//! It parses arguments with `clap`, runs the selected command and turns the
//! command's outcome into the process exit code. The core logic lives in the
//! `repolish` library crate.

mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<ExitCode> {
    let cli = cli::Cli::parse();
    cli.execute()
}
