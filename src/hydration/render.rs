//! Placeholder rendering
//!
//! Substitutes `{{ cookiecutter.KEY }}` and `{{ KEY }}` placeholders (dotted
//! paths allowed) in file contents and paths. Strings are inserted verbatim,
//! other values as JSON. Unknown placeholders are left untouched. This is
//! plain substitution: there is no control flow and there are no filters.

use std::collections::BTreeMap;

use log::{debug, warn};
use regex::{Captures, Regex};
use serde_json::Value;

use super::Rendered;
use crate::context::{lookup, merged, Context};
use crate::error::{Error, Result};
use crate::filesystem::{File, MemoryFS};
use crate::path::normalize_posix;
use crate::phases::MergedResult;

const PLACEHOLDER: &str =
    r"\{\{\s*(?:cookiecutter\.)?([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\s*\}\}";

/// Compiled placeholder matcher.
#[derive(Debug, Clone)]
pub struct Renderer {
    placeholder: Regex,
}

impl Renderer {
    pub fn new() -> Result<Self> {
        let placeholder = Regex::new(PLACEHOLDER).map_err(|e| Error::Pattern {
            kind: "placeholder".to_string(),
            name: "cookiecutter".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { placeholder })
    }

    /// Render one string against `context`.
    pub fn render_text(&self, text: &str, context: &Context) -> String {
        self.placeholder
            .replace_all(text, |caps: &Captures| match lookup(context, &caps[1]) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) => String::new(),
                Some(other) => other.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a file; binary content is passed through unchanged.
    pub fn render_file(&self, file: &File, context: &Context) -> File {
        match file.as_text() {
            Some(text) => File {
                content: self.render_text(text, context).into_bytes(),
                provider: file.provider.clone(),
            },
            None => file.clone(),
        }
    }
}

/// Execute rendering over a preprocessed tree.
///
/// Every file renders with its provider's context (see
/// [`MergedResult::render_context`]); mapped destinations additionally
/// overlay the mapping's `extra_context`.
pub fn execute(tree: &MemoryFS, result: &MergedResult) -> Result<Rendered> {
    let renderer = Renderer::new()?;
    let mut files = MemoryFS::new();
    let mut unrendered: BTreeMap<String, &File> = BTreeMap::new();

    for (path, file) in tree.files() {
        let context = result.render_context(file.provider.as_deref());
        let rendered_path = normalize_posix(&renderer.render_text(path, &context));
        files.add_file(&rendered_path, renderer.render_file(file, &context));
        unrendered.insert(rendered_path, file);
    }

    let mut mapped = BTreeMap::new();
    for (dest, descriptor) in &result.file_mappings {
        let Some(source) = descriptor.source().map(normalize_posix) else {
            continue;
        };
        let output = match unrendered.get(&source) {
            Some(file) => {
                let owner = descriptor.source_provider().or(file.provider.as_deref());
                let mut context = result.render_context(owner);
                if let Some(extra) = descriptor.extra_context() {
                    context = merged(&context, extra);
                }
                debug!("Rendering {} from {}", dest, source);
                Some(renderer.render_file(file, &context))
            }
            None => {
                warn!("Source {} for mapped file {} was not found in any provider", source, dest);
                None
            }
        };
        mapped.insert(dest.clone(), output);
    }

    Ok(Rendered { files, mapped })
}
