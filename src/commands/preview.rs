//! # Preview Command Implementation
//!
//! Runs the text merge engine on a YAML debug file and prints the merged
//! text, without touching any project. The debug file looks like:
//!
//! ```yaml
//! template: |
//!   ## repolish-regex[version]: version = "(.+)"
//!   version = "0.0.0"
//! target: |
//!   version = "1.4.2"
//! config:
//!   anchors:
//!     intro: "Replacement text"
//! ```
//!
//! With `--show-patterns` the markers extracted from the template are
//! printed as YAML before the result.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use log::info;
use serde::Deserialize;

use repolish::error::Error;
use repolish::merge;
use repolish::output::{heading, OutputConfig};
use repolish::suggestions;

/// Preview how a template merges with a target file
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Path to the YAML debug file
    #[arg(value_name = "DEBUG_FILE")]
    pub debug_file: PathBuf,

    /// Show the patterns extracted from the template
    #[arg(long)]
    pub show_patterns: bool,
}

#[derive(Debug, Deserialize)]
struct DebugFile {
    template: String,
    #[serde(default)]
    target: String,
    #[serde(default)]
    config: DebugConfig,
}

#[derive(Debug, Default, Deserialize)]
struct DebugConfig {
    #[serde(default)]
    anchors: BTreeMap<String, String>,
}

/// Execute the `preview` command.
pub fn execute(args: PreviewArgs, output: &OutputConfig) -> Result<ExitCode> {
    let content = fs::read_to_string(&args.debug_file)
        .map_err(|e| suggestions::invalid_debug_file(&args.debug_file, &e.to_string()))?;
    let debug: DebugFile = serde_yaml::from_str(&content)
        .map_err(|e| suggestions::invalid_debug_file(&args.debug_file, &e.to_string()))?;

    info!(
        "Previewing template ({} bytes) against target ({} bytes), anchors: {:?}",
        debug.template.len(),
        debug.target.len(),
        debug.config.anchors.keys().collect::<Vec<_>>()
    );

    if args.show_patterns {
        let patterns = merge::extract_patterns(&debug.template);
        println!("{}", heading(output, "Extracted Patterns"));
        print!("{}", serde_yaml::to_string(&patterns)?);
        println!();
    }

    let result = merge::merge(&debug.template, &debug.target, &debug.config.anchors).map_err(|e| match e {
        Error::Pattern { name, message, .. } => suggestions::invalid_pattern(&name, &message),
        other => other.into(),
    })?;

    println!("{}", heading(output, "Result"));
    print!("{}", result);
    Ok(ExitCode::SUCCESS)
}
