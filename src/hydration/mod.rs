//! Hydration pipeline
//!
//! Turns a [`MergedResult`] plus the provider template trees into files in
//! the project directory:
//!
//! 1. Staging - Load every provider's `repolish/` tree into one [`MemoryFS`]
//! 2. Preprocess - Run the text merge engine against the existing local files
//! 3. Render - Substitute `{{ cookiecutter.KEY }}` placeholders
//! 4. Post-process - Run the configured `post_process` commands over the output
//! 5. Apply / Check - Write the results, or compare them with the project
//!
//! Steps 1-4 never touch the project directory except to read local files,
//! and [`targets`] computes every output before apply writes anything.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::filesystem::{File, MemoryFS};
use crate::path::{is_conditional, normalize_posix};
use crate::phases::MergedResult;

pub mod apply;
pub mod check;
pub mod post_process;
pub mod preprocess;
pub mod render;
pub mod staging;

/// Rendered template output, ready to be applied or checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rendered {
    /// Every rendered template file, keyed by rendered path
    pub files: MemoryFS,
    /// Mapped destinations; `None` when the mapping's source was not found
    pub mapped: BTreeMap<String, Option<File>>,
}

/// One expected outcome in the project directory.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Write { dest: String, file: File },
    SourceMissing { dest: String, source: String },
    Delete { dest: String },
}

/// Stage, preprocess and render the templates for `result`.
pub fn prepare<P: AsRef<Path>>(locations: &[P], result: &MergedResult, project_dir: &Path) -> Result<Rendered> {
    let staged = staging::execute(locations)?;
    let merged = preprocess::execute(&staged, result, project_dir)?;
    render::execute(&merged, result)
}

/// Normalized sources referenced by any file mapping.
pub fn mapped_sources(result: &MergedResult) -> BTreeSet<String> {
    result
        .file_mappings
        .values()
        .filter_map(|descriptor| descriptor.source())
        .map(normalize_posix)
        .collect()
}

/// Compute every write and delete the project directory should receive.
///
/// Regular files skip conditional (`_repolish.`) files, mapping sources,
/// paths marked for deletion and create-only files that already exist.
/// Mapped destinations skip deleted paths and existing create-only files.
/// Deletions are listed last, and only for paths that exist.
///
/// Every destination must stay inside `project_dir`; an absolute path or
/// one that climbs out with `..` fails with [`Error::Path`].
pub fn targets(rendered: &Rendered, result: &MergedResult, project_dir: &Path) -> Result<Vec<Target>> {
    let sources = mapped_sources(result);
    let existing_create_only =
        |dest: &str| result.create_only_files.contains(dest) && local_path(project_dir, dest).exists();
    let mut out = Vec::new();

    for (path, file) in rendered.files.files() {
        if is_conditional(path)
            || sources.contains(path)
            || result.delete_files.contains(path)
            || existing_create_only(path)
        {
            continue;
        }
        ensure_contained(path)?;
        out.push(Target::Write {
            dest: path.to_string(),
            file: file.clone(),
        });
    }

    for (dest, output) in &rendered.mapped {
        if result.delete_files.contains(dest) || existing_create_only(dest) {
            continue;
        }
        ensure_contained(dest)?;
        match output {
            Some(file) => out.push(Target::Write {
                dest: dest.clone(),
                file: file.clone(),
            }),
            None => out.push(Target::SourceMissing {
                dest: dest.clone(),
                source: result
                    .file_mappings
                    .get(dest)
                    .and_then(|d| d.source())
                    .unwrap_or_default()
                    .to_string(),
            }),
        }
    }

    for dest in &result.delete_files {
        ensure_contained(dest)?;
        if local_path(project_dir, dest).exists() {
            out.push(Target::Delete { dest: dest.clone() });
        }
    }
    Ok(out)
}

pub(crate) fn local_path(project_dir: &Path, dest: &str) -> PathBuf {
    project_dir.join(dest)
}

/// Fail unless `path` is a non-empty relative path without `..` segments.
pub fn ensure_contained(path: &str) -> Result<()> {
    let components: Vec<Component> = Path::new(path).components().collect();
    let inside = components
        .iter()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && components.iter().any(|c| matches!(c, Component::Normal(_)));
    if inside {
        Ok(())
    } else {
        Err(Error::Path {
            message: format!("'{}' is outside the project directory", path),
        })
    }
}
