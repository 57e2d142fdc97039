//! Link command implementation
//!
//! Runs the link command of every `cli` provider in `repolish.yaml`, saves
//! what each reports under `.repolish/_/` and creates the configured links
//! into the project. A failing provider stops the run with exit code 1.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use log::{info, warn};

use repolish::config::{self, CONFIG_FILE};
use repolish::link;
use repolish::output::{emoji, OutputConfig};
use repolish::suggestions;

/// Arguments for the link command
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Path to the repolish configuration file
    #[arg(short, long, value_name = "PATH", env = "REPOLISH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the link command
pub fn execute(args: LinkArgs, output: &OutputConfig) -> Result<ExitCode> {
    let config_path = args.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    if !config_path.exists() {
        return Err(suggestions::config_not_found(&config_path));
    }
    info!("Loading {}", config_path.display());
    let file = config::parse(&std::fs::read_to_string(&config_path)?)?;
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));

    if file.providers.is_empty() {
        warn!("No providers configured; nothing to link");
        return Ok(ExitCode::SUCCESS);
    }

    let linked = link::link_all(&file, config_dir)?;
    if !args.quiet {
        println!(
            "{} Linked {} provider(s)",
            emoji(output, "🔗", "[OK]"),
            linked.len()
        );
    }
    Ok(ExitCode::SUCCESS)
}
