//! Staging: load provider template trees into memory
//!
//! Each provider location contributes the files under its `repolish/`
//! directory. Locations are processed in order and later providers overwrite
//! earlier files at the same path. Every file remembers which provider
//! staged it, so migrated providers can render with their own context.

use std::fs;
use std::path::Path;

use log::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::filesystem::{File, MemoryFS};
use crate::path::normalize_path;
use crate::providers::manifest::TEMPLATE_DIR;

/// Load one provider's template tree.
pub fn load_tree(location: &Path) -> Result<MemoryFS> {
    let root = location.join(TEMPLATE_DIR);
    let mut tree = MemoryFS::new();
    if !root.is_dir() {
        debug!("Provider {} has no {} tree", location.display(), TEMPLATE_DIR);
        return Ok(tree);
    }

    let provider = normalize_path(location);
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(&root).map_err(|e| Error::Path {
            message: format!("{}: {}", entry.path().display(), e),
        })?;
        let content = fs::read(entry.path())?;
        tree.add_file(
            &normalize_path(relative),
            File::new(content).with_provider(&provider),
        );
    }
    debug!("Staged {} file(s) from {}", tree.len(), provider);
    Ok(tree)
}

/// Execute staging over every location, last write wins.
pub fn execute<P: AsRef<Path>>(locations: &[P]) -> Result<MemoryFS> {
    let mut staged = MemoryFS::new();
    for location in locations {
        staged.merge(&load_tree(location.as_ref())?);
    }
    Ok(staged)
}
