//! # Output Configuration
//!
//! Controls CLI output appearance: color and symbol support based on
//! terminal capabilities and user preferences, plus the styled report
//! lines printed by `apply` and `apply --check`.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;

use console::style;

use crate::hydration::check::Difference;

/// Output configuration for controlling colors and symbols.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and symbols should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is the value of `--color`: `always` forces colors on
    /// (overriding `NO_COLOR`), `never` forces them off and anything else
    /// detects support from the environment.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        console::set_colors_enabled(use_color);
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    /// Colors on regardless of the terminal.
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Plain output, as with `--color=never`.
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the symbol when colors are enabled, else the plain alternative.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Format one check difference for the terminal.
pub fn difference_line(config: &OutputConfig, difference: &Difference) -> String {
    let line = difference.to_string();
    if !config.use_color {
        return line;
    }
    match difference {
        Difference::Missing { .. } => style(line).green().to_string(),
        Difference::Modified { .. } => style(line).yellow().to_string(),
        Difference::MappingSourceMissing { .. } => style(line).red().to_string(),
        Difference::PresentButShouldBeDeleted { .. } => style(line).red().bold().to_string(),
    }
}

/// Format a unified diff, coloring added, removed and hunk header lines.
pub fn diff_text(config: &OutputConfig, diff: &str) -> String {
    if !config.use_color {
        return diff.to_string();
    }
    diff.lines()
        .map(|line| {
            if line.starts_with("+++") || line.starts_with("---") {
                style(line).bold().to_string()
            } else if line.starts_with('+') {
                style(line).green().to_string()
            } else if line.starts_with('-') {
                style(line).red().to_string()
            } else if line.starts_with("@@") {
                style(line).cyan().to_string()
            } else {
                line.to_string()
            }
        })
        .map(|line| line + "\n")
        .collect()
}

/// Format a section heading such as `Result` in `repolish preview`.
pub fn heading(config: &OutputConfig, title: &str) -> String {
    let rule = format!("── {} ──", title);
    if config.use_color {
        style(rule).bold().to_string()
    } else {
        format!("== {} ==", title)
    }
}
