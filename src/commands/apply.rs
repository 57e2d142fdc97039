//! Apply command implementation
//!
//! Runs the whole pipeline for a `repolish.yaml`:
//! 1. Load and resolve the configuration
//! 2. Run the provider orchestrator and overlay the project configuration
//! 3. Stage, preprocess and render the provider templates
//! 4. Run the `post_process` commands over the rendered output; a failure
//!    exits with code 3
//! 5. Write the output into the project directory, or with `--check`
//!    compare it and exit with code 2 when anything differs
//!
//! The project directory is the directory containing the config file.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use log::{debug, info};

use repolish::config::{load_config, CONFIG_FILE};
use repolish::error::Error;
use repolish::hydration::{self, apply, check, post_process};
use repolish::output::{diff_text, difference_line, emoji, OutputConfig};
use repolish::phases::OrchestratorOptions;
use repolish::resolver::build_final_providers;
use repolish::suggestions;

/// Exit code reported by `--check` when the project differs.
pub const EXIT_DIFFERENCES: u8 = 2;

/// Exit code when a `post_process` command fails.
pub const EXIT_POST_PROCESS: u8 = 3;

/// Arguments for the apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to the repolish configuration file
    #[arg(short, long, value_name = "PATH", env = "REPOLISH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only compare the generated output with the project; make no changes
    #[arg(long)]
    pub check: bool,

    /// Fail when a module-style provider declares no file mappings
    #[arg(long)]
    pub strict: bool,

    /// Suppress all output except errors and differences
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the apply command
pub fn execute(args: ApplyArgs, output: &OutputConfig) -> Result<ExitCode> {
    let start_time = Instant::now();
    info!("Running repolish {}", env!("CARGO_PKG_VERSION"));

    let config_path = args.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    if !config_path.exists() {
        return Err(suggestions::config_not_found(&config_path));
    }
    let config = load_config(&config_path)?;
    let project_dir = config.config_dir.clone();

    let options = OrchestratorOptions {
        require_file_mappings: args.strict,
        ..OrchestratorOptions::default()
    };
    let result = build_final_providers(&config, options)?;
    info!(
        "Final providers: {} location(s), {} delete path(s)",
        config.locations.len(),
        result.delete_files.len()
    );
    debug!("Delete history: {}", serde_json::to_string(&result.provenance)?);

    let mut rendered = hydration::prepare(&config.locations, &result, &project_dir)?;
    match post_process::execute(&config.post_process, &mut rendered) {
        Ok(()) => {}
        Err(e @ Error::PostProcess { .. }) => {
            log::error!("{}", e);
            return Ok(ExitCode::from(EXIT_POST_PROCESS));
        }
        Err(e) => return Err(e.into()),
    }

    if args.check {
        let differences = check::execute(&rendered, &result, &project_dir, check::CheckOptions::from_env())?;
        if differences.is_empty() {
            if !args.quiet {
                println!("{} Project is up to date", emoji(output, "✅", "[OK]"));
            }
            return Ok(ExitCode::SUCCESS);
        }
        log::error!("Project differs from the templates; run `repolish apply` to apply changes");
        for difference in &differences {
            println!("{}", difference_line(output, difference));
            if let check::Difference::Modified { diff, .. } = difference {
                print!("{}", diff_text(output, diff));
            }
        }
        return Ok(ExitCode::from(EXIT_DIFFERENCES));
    }

    let report = apply::execute(&rendered, &result, &project_dir)?;
    if !args.quiet {
        println!(
            "{} Applied in {:.2}s",
            emoji(output, "✅", "[OK]"),
            start_time.elapsed().as_secs_f64()
        );
        println!("   {} file(s) written", report.written.len());
        if !report.deleted.is_empty() {
            println!("   {} path(s) deleted", report.deleted.len());
        }
        for dest in &report.missing_sources {
            println!("   {} mapping source missing for {}", emoji(output, "⚠️ ", "[WARN]"), dest);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(config: PathBuf, check: bool) -> ApplyArgs {
        ApplyArgs {
            config: Some(config),
            check,
            strict: false,
            quiet: true,
        }
    }

    fn project() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let templates = temp_dir.path().join("base/templates/repolish");
        fs::create_dir_all(&templates).unwrap();
        fs::write(templates.join("README.md"), "# {{ cookiecutter.name }}\n").unwrap();
        fs::write(
            temp_dir.path().join("base/templates/repolish.yaml"),
            "context:\n  name: demo\n",
        )
        .unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE),
            "providers:\n  base: base\nproviders_order: [base]\n",
        )
        .unwrap();
        temp_dir
    }

    #[test]
    fn test_execute_missing_config() {
        let result = execute(
            args(PathBuf::from("/nonexistent/repolish.yaml"), false),
            &OutputConfig::without_color(),
        );
        let message = result.unwrap_err().to_string();
        assert!(message.contains("Configuration file not found"));
        assert!(message.contains("hint:"));
    }

    #[test]
    fn test_check_then_apply() {
        let temp_dir = project();
        let config = temp_dir.path().join(CONFIG_FILE);
        let output = OutputConfig::without_color();

        let code = execute(args(config.clone(), true), &output).unwrap();
        assert_eq!(code, ExitCode::from(EXIT_DIFFERENCES));
        assert!(!temp_dir.path().join("README.md").exists());

        let code = execute(args(config.clone(), false), &output).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("README.md")).unwrap(),
            "# demo\n"
        );

        let code = execute(args(config, true), &output).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[cfg(unix)]
    #[test]
    fn test_post_process_failure_exits_3() {
        let temp_dir = project();
        let config = temp_dir.path().join(CONFIG_FILE);
        fs::write(
            &config,
            "providers:\n  base: base\npost_process:\n  - sh -c 'exit 5'\n",
        )
        .unwrap();

        for check in [true, false] {
            let code = execute(args(config.clone(), check), &OutputConfig::without_color()).unwrap();
            assert_eq!(code, ExitCode::from(EXIT_POST_PROCESS));
        }
        assert!(!temp_dir.path().join("README.md").exists());
    }
}
