//! Check: compare rendered output with the project directory
//!
//! Reports what apply would change without writing anything. Text is
//! compared with CRLF normalized to LF unless line endings are preserved,
//! and a modified text file carries a unified diff from the project copy to
//! the rendered one. Binary files are compared byte for byte.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;
use similar::TextDiff;

use super::{local_path, targets, Rendered, Target};
use crate::error::Result;
use crate::filesystem::File;
use crate::phases::MergedResult;

/// Environment variable that disables CRLF normalization when truthy.
pub const PRESERVE_LINE_ENDINGS_ENV: &str = "REPOLISH_PRESERVE_LINE_ENDINGS";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckOptions {
    pub preserve_line_endings: bool,
}

impl CheckOptions {
    /// Read options from the environment (`1`, `true` or `yes`).
    pub fn from_env() -> Self {
        let preserve_line_endings = std::env::var(PRESERVE_LINE_ENDINGS_ENV)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self {
            preserve_line_endings,
        }
    }
}

/// One way the project differs from the rendered output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difference {
    Missing { path: String },
    /// `diff` is a unified diff from the project file to the rendered file
    Modified { path: String, diff: String },
    MappingSourceMissing { path: String, source: String },
    PresentButShouldBeDeleted { path: String },
}

impl Difference {
    pub fn path(&self) -> &str {
        match self {
            Difference::Missing { path }
            | Difference::Modified { path, .. }
            | Difference::MappingSourceMissing { path, .. }
            | Difference::PresentButShouldBeDeleted { path } => path,
        }
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difference::Missing { path } => write!(f, "MISSING: {}", path),
            Difference::Modified { path, .. } => write!(f, "MODIFIED: {}", path),
            Difference::MappingSourceMissing { path, source } => {
                write!(f, "MAPPING_SOURCE_MISSING: {} (source {})", path, source)
            }
            Difference::PresentButShouldBeDeleted { path } => {
                write!(f, "PRESENT_BUT_SHOULD_BE_DELETED: {}", path)
            }
        }
    }
}

/// Execute check.
pub fn execute(
    rendered: &Rendered,
    result: &MergedResult,
    project_dir: &Path,
    options: CheckOptions,
) -> Result<Vec<Difference>> {
    let mut differences = Vec::new();

    for target in targets(rendered, result, project_dir)? {
        match target {
            Target::Write { dest, file } => {
                let path = local_path(project_dir, &dest);
                if !path.is_file() {
                    differences.push(Difference::Missing { path: dest });
                } else if let Some(diff) = compare(&dest, &file, &fs::read(&path)?, options) {
                    differences.push(Difference::Modified { path: dest, diff });
                }
            }
            Target::SourceMissing { dest, source } => {
                differences.push(Difference::MappingSourceMissing { path: dest, source });
            }
            Target::Delete { dest } => {
                differences.push(Difference::PresentButShouldBeDeleted { path: dest });
            }
        }
    }
    Ok(differences)
}

/// `None` when `actual` matches `expected`, else the diff to report.
fn compare(path: &str, expected: &File, actual: &[u8], options: CheckOptions) -> Option<String> {
    let actual_text = std::str::from_utf8(actual).ok().filter(|t| !t.contains('\0'));
    let (Some(expected), Some(actual)) = (expected.as_text(), actual_text) else {
        return (expected.content != actual).then(|| "Binary files differ\n".to_string());
    };

    let (expected, actual) = if options.preserve_line_endings {
        (expected.to_string(), actual.to_string())
    } else {
        (expected.replace("\r\n", "\n"), actual.replace("\r\n", "\n"))
    };
    if expected == actual {
        return None;
    }
    let rendered_name = format!("{} (rendered)", path);
    let diff = TextDiff::from_lines(&actual, &expected);
    Some(diff.unified_diff().header(path, &rendered_name).to_string())
}
