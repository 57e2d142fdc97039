//! Text merge engine
//!
//! Combines a freshly rendered template with the local file it would replace.
//! Templates declare provider-owned regions with line-oriented markers; any
//! comment prefix or suffix around a marker is tolerated.
//!
//! | Marker | Meaning |
//! |---|---|
//! | `repolish-start[name]` ... `repolish-end[name]` | tag block with default text |
//! | `repolish-regex[name]: PATTERN` | span imported from the local file |
//! | `repolish-multiregex-block[name]: PATTERN` | local section (group 1) |
//! | `repolish-multiregex[name]: PATTERN` | `key = "value"` pairs in that section |
//!
//! [`merge`] runs three pure stages over one buffer, always in the same order:
//! tags ([`tags`]), single regexes ([`regex`]), then multiregex sections
//! ([`multiregex`]). Every "not found" condition is a silent no-op that keeps
//! the template default; only a malformed pattern is an error.
//!
//! ## Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use repolish::merge::merge;
//!
//! let template = "## repolish-regex[v]: version = \"(.+)\"\nversion = \"0.0.0\"\n";
//! let local = "version = \"9.9.9\"\n";
//! let out = merge(template, local, &BTreeMap::new()).unwrap();
//! assert_eq!(out, "version = \"9.9.9\"\n");
//! ```

pub mod multiregex;
pub mod regex;
pub mod tags;

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};

/// Common prefix of every marker; text without it has nothing to merge.
pub const MARKER_PREFIX: &str = "repolish-";
pub const TAG_START: &str = "repolish-start";
pub const TAG_END: &str = "repolish-end";
pub const REGEX: &str = "repolish-regex";
pub const MULTIREGEX_BLOCK: &str = "repolish-multiregex-block";
pub const MULTIREGEX: &str = "repolish-multiregex";

/// Name to pattern (or default text) pairs in first-declaration order.
///
/// A name declared twice keeps its first position and its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedPatterns(Vec<(String, String)>);

impl NamedPatterns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String, value: String) {
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for NamedPatterns {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Every marker declared in a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Patterns {
    /// Tag name to default inner text (leading/trailing newlines stripped)
    pub tag_blocks: NamedPatterns,
    pub regexes: NamedPatterns,
    pub multiregex_blocks: NamedPatterns,
    pub multiregexes: NamedPatterns,
}

/// Extract all four marker kinds from `content` in one pass over its lines.
pub fn extract_patterns(content: &str) -> Patterns {
    let mut patterns = Patterns {
        tag_blocks: tags::extract_tag_blocks(content),
        ..Patterns::default()
    };

    for line in content.lines() {
        if let Some((name, pattern)) = parse_declaration(line, MULTIREGEX_BLOCK) {
            patterns.multiregex_blocks.insert(name, pattern);
        } else if let Some((name, pattern)) = parse_declaration(line, MULTIREGEX) {
            patterns.multiregexes.insert(name, pattern);
        } else if let Some((name, pattern)) = parse_declaration(line, REGEX) {
            patterns.regexes.insert(name, pattern);
        }
    }

    debug!(
        "Extracted patterns: tags={:?} regexes={:?} multiregexes={:?}",
        patterns.tag_blocks.names(),
        patterns.regexes.names(),
        patterns.multiregexes.names()
    );
    patterns
}

/// Parse a `<prefix>MARKER[name]: PATTERN` declaration line.
///
/// The last occurrence of the marker on the line wins. The name runs up to
/// the first `]: ` and must be non-empty; the pattern is the rest of the line.
pub(crate) fn parse_declaration(line: &str, marker: &str) -> Option<(String, String)> {
    let opener = format!("{}[", marker);
    let at = line.rfind(&opener)?;
    let rest = &line[at + opener.len()..];
    let close = rest.find("]: ")?;
    if close == 0 {
        return None;
    }
    let name = &rest[..close];
    let pattern = rest[close + 3..].trim_end_matches('\r');
    Some((name.to_string(), pattern.to_string()))
}

/// Whether `line` carries a declaration of `marker`, optionally for one name.
///
/// Unlike [`parse_declaration`] this also matches a declaration with an
/// empty pattern (`repolish-regex[name]:`).
pub(crate) fn is_declaration(line: &str, marker: &str, name: Option<&str>) -> bool {
    let opener = format!("{}[", marker);
    let Some(at) = line.rfind(&opener) else {
        return false;
    };
    let rest = &line[at + opener.len()..];
    match rest.find("]:") {
        Some(0) | None => false,
        Some(close) => name.is_none_or(|n| n == &rest[..close]),
    }
}

pub(crate) fn pattern_error(kind: &str, name: &str, message: impl std::fmt::Display) -> Error {
    Error::Pattern {
        kind: kind.to_string(),
        name: name.to_string(),
        message: message.to_string(),
    }
}

/// Compile a declared marker pattern with inline `flags` (for example `m`).
///
/// Marker patterns use the `fancy_regex` dialect, so look-around and
/// backreferences are available. `\Z` means end of text, as `\z` does.
pub(crate) fn compile_pattern(kind: &str, name: &str, pattern: &str, flags: &str) -> Result<fancy_regex::Regex> {
    let source = format!("(?{}){}", flags, strict_end_anchor(pattern));
    fancy_regex::Regex::new(&source).map_err(|e| pattern_error(kind, name, e))
}

/// Rewrite every unescaped `\Z` as `\z`.
fn strict_end_anchor(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('Z') => out.push_str("\\z"),
            Some(escaped) => {
                out.push('\\');
                out.push(escaped);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Remove every whole line (with its newline) for which `predicate` holds.
pub(crate) fn strip_lines(content: &str, predicate: impl Fn(&str) -> bool) -> String {
    content
        .split_inclusive('\n')
        .filter(|line| !predicate(line.trim_end_matches('\n')))
        .collect()
}

/// Merge `template` with `local`, using `overrides` for tag blocks.
///
/// Tag values come from `overrides` when present, else from the tag's own
/// default text. Regex and multiregex spans are imported from `local` where
/// their patterns match. All declared patterns are compiled before any
/// rewriting starts, so a malformed pattern never yields partial output.
pub fn merge(template: &str, local: &str, overrides: &BTreeMap<String, String>) -> Result<String> {
    let patterns = extract_patterns(template);

    let compiled_regexes = regex::compile(&patterns.regexes)?;
    let compiled_sections = multiregex::compile(&patterns.multiregex_blocks, &patterns.multiregexes)?;

    let mut tag_values = NamedPatterns::new();
    for (name, default) in patterns.tag_blocks.iter() {
        let value = overrides.get(name).map(String::as_str).unwrap_or(default);
        tag_values.insert(name.to_string(), value.to_string());
    }

    let content = tags::replace_tags(template, &tag_values);
    let content = regex::apply(&content, &compiled_regexes, local)?;
    let content = multiregex::apply(&content, &compiled_sections, local)?;

    debug!(
        "Text merge completed: {} tag(s), {} regex(es), {} multiregex(es)",
        patterns.tag_blocks.len(),
        patterns.regexes.len(),
        patterns.multiregexes.len()
    );
    Ok(content)
}
