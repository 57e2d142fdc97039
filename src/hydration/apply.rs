//! Apply: write rendered output into the project directory
//!
//! The full list of [`Target`]s is computed and validated first; only then
//! are files written (regular files, then mappings) and deletions performed.

use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::Serialize;

use super::{local_path, targets, Rendered, Target};
use crate::error::{Error, Result};
use crate::phases::MergedResult;

/// What an apply run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub written: Vec<String>,
    pub deleted: Vec<String>,
    /// Mapped destinations whose source was not found
    pub missing_sources: Vec<String>,
}

/// Execute apply.
pub fn execute(rendered: &Rendered, result: &MergedResult, project_dir: &Path) -> Result<ApplyReport> {
    let planned = targets(rendered, result, project_dir)?;
    validate(&planned, project_dir)?;
    let mut report = ApplyReport::default();

    for target in planned {
        match target {
            Target::Write { dest, file } => {
                let path = local_path(project_dir, &dest);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, &file.content)?;
                report.written.push(dest);
            }
            Target::SourceMissing { dest, source } => {
                warn!("Skipping {}: mapping source {} not found", dest, source);
                report.missing_sources.push(dest);
            }
            Target::Delete { dest } => {
                let path = local_path(project_dir, &dest);
                if path.is_dir() {
                    fs::remove_dir_all(&path)?;
                } else {
                    fs::remove_file(&path)?;
                }
                report.deleted.push(dest);
            }
        }
    }

    info!(
        "Applied {} file(s), deleted {} path(s)",
        report.written.len(),
        report.deleted.len()
    );
    Ok(report)
}

/// Reject plans that would write a file over an existing directory.
fn validate(planned: &[Target], project_dir: &Path) -> Result<()> {
    for target in planned {
        if let Target::Write { dest, .. } = target {
            if local_path(project_dir, dest).is_dir() {
                return Err(Error::Filesystem {
                    message: format!("cannot write {}: a directory exists at that path", dest),
                });
            }
        }
    }
    Ok(())
}
