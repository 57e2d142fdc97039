//! Preprocess: merge templates with existing local files
//!
//! Every staged text file that carries merge markers is run through the text
//! merge engine against its local counterpart: the mapped destination when
//! the file is a mapping source, else the file at the same relative path. A
//! missing local file merges against empty text. Files are independent, so
//! the work is spread across threads with `rayon`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use rayon::prelude::*;

use super::local_path;
use super::render::Renderer;
use crate::error::Result;
use crate::filesystem::{File, MemoryFS};
use crate::merge::{self, MARKER_PREFIX};
use crate::path::normalize_posix;
use crate::phases::MergedResult;

/// Map each normalized mapping source to the destination it is read from.
///
/// When several destinations share a source, the last one wins.
pub fn source_destinations(result: &MergedResult) -> BTreeMap<String, String> {
    result
        .file_mappings
        .iter()
        .filter_map(|(dest, descriptor)| {
            descriptor
                .source()
                .map(|source| (normalize_posix(source), dest.clone()))
        })
        .collect()
}

/// Execute preprocessing over the staged tree.
pub fn execute(staged: &MemoryFS, result: &MergedResult, project_dir: &Path) -> Result<MemoryFS> {
    let renderer = Renderer::new()?;
    let destinations = source_destinations(result);
    let anchors = &result.anchors;

    let entries: Vec<(&str, &File)> = staged.files().collect();
    let merged = entries
        .into_par_iter()
        .map(|(path, file)| {
            let Some(template) = file.as_text().filter(|t| t.contains(MARKER_PREFIX)) else {
                return Ok((path.to_string(), file.clone()));
            };

            let rendered_path = normalize_posix(&renderer.render_text(path, &result.context));
            let local_rel = destinations
                .get(&rendered_path)
                .map_or(rendered_path.as_str(), String::as_str);
            let local = read_local(&local_path(project_dir, local_rel));

            debug!("Merging {} against local {}", path, local_rel);
            let content = merge::merge(template, &local, anchors)?;
            Ok((
                path.to_string(),
                File {
                    content: content.into_bytes(),
                    provider: file.provider.clone(),
                },
            ))
        })
        .collect::<Result<Vec<(String, File)>>>()?;

    Ok(merged.into_iter().collect())
}

/// Local text, or empty when the file is missing, unreadable or binary.
fn read_local(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) if !text.contains('\0') => text,
            _ => {
                debug!("Local file {} is binary, merging against empty text", path.display());
                String::new()
            }
        },
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::SourceDescriptor;

    #[test]
    fn test_merges_against_same_path_and_mapped_destination() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("pyproject.toml"), "version = \"2.0\"\n").unwrap();
        fs::create_dir_all(dir.path().join(".github")).unwrap();
        fs::write(dir.path().join(".github/ci.yml"), "runs-on: macos\n").unwrap();

        let mut staged = MemoryFS::new();
        staged.add_file_string(
            "pyproject.toml",
            "## repolish-regex[v]: version = \"(.+)\"\nversion = \"0.0.0\"\n",
        );
        staged.add_file_string(
            "ci/base.yml",
            "## repolish-regex[os]: runs-on: (.+)\nruns-on: ubuntu\n",
        );
        staged.add_file_string("plain.txt", "no markers\n");

        let mut result = MergedResult::default();
        result.file_mappings.insert(
            ".github/ci.yml".to_string(),
            SourceDescriptor::Path("ci/base.yml".to_string()),
        );

        let merged = execute(&staged, &result, dir.path()).unwrap();
        assert_eq!(
            merged.get_file("pyproject.toml").unwrap().as_text(),
            Some("version = \"2.0\"\n")
        );
        assert_eq!(merged.get_file("ci/base.yml").unwrap().as_text(), Some("runs-on: macos\n"));
        assert_eq!(merged.get_file("plain.txt").unwrap().as_text(), Some("no markers\n"));
    }

    #[test]
    fn test_missing_local_keeps_defaults_and_applies_anchors() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut staged = MemoryFS::new();
        staged.add_file_string(
            "README.md",
            "# Title\n<!-- repolish-start[intro] -->\ndefault\n<!-- repolish-end[intro] -->\n",
        );
        let mut result = MergedResult::default();
        result
            .anchors
            .insert("intro".to_string(), "Configured intro".to_string());

        let merged = execute(&staged, &result, dir.path()).unwrap();
        assert_eq!(
            merged.get_file("README.md").unwrap().as_text(),
            Some("# Title\nConfigured intro\n")
        );
    }

    #[test]
    fn test_malformed_marker_pattern_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut staged = MemoryFS::new();
        staged.add_file_string("bad.txt", "## repolish-regex[x]: (unclosed\nbody\n");
        let err = execute(&staged, &MergedResult::default(), dir.path()).unwrap_err();
        assert!(matches!(err, crate::error::Error::Pattern { .. }));
    }
}
