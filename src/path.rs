//! Path normalization utilities for repolish
//!
//! Every destination, delete and create-only path goes through
//! [`normalize_posix`] before it is used as a key, so `a\b.txt`, `./a/b.txt`
//! and `a//b.txt` all refer to the same entry.

use std::path::Path;

/// Prefix marking a template file that is only materialized through an
/// explicit file mapping.
pub const CONDITIONAL_PREFIX: &str = "_repolish.";

/// Normalize a path into the platform-neutral POSIX form used for lookups.
///
/// Backslashes become forward slashes, empty and `.` components are dropped,
/// and `..` pops the previous component when there is one. A leading `/` is
/// preserved. An input with no remaining components normalizes to `.`.
pub fn normalize_posix(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Normalize a filesystem path (as produced by `walkdir` or `Path::join`).
pub fn normalize_path(path: &Path) -> String {
    normalize_posix(&path.to_string_lossy())
}

/// Split a raw delete/create-only entry into `(negated, normalized_path)`.
///
/// A leading `!` negates the entry: `"!docs/old.md"` yields
/// `(true, "docs/old.md")`.
pub fn parse_negation(entry: &str) -> (bool, String) {
    match entry.strip_prefix('!') {
        Some(rest) => (true, normalize_posix(rest)),
        None => (false, normalize_posix(entry)),
    }
}

/// Whether the file name of `path` carries the conditional prefix.
pub fn is_conditional(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .is_some_and(|name| name.starts_with(CONDITIONAL_PREFIX))
}
