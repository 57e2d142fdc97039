//! Multiregex stage
//!
//! A multiregex pair lets a template keep its own key list while importing
//! values from the local file:
//!
//! ```text
//! [tools]
//! ## repolish-multiregex-block[tools]: ^\[tools\](.*?)(?=\n\[|\Z)
//! ## repolish-multiregex[tools]: ^(")?([^"=\s]+)(")?\s*=\s*"([^"]+)"$
//! uv = "0.0.0"
//! ```
//!
//! The block pattern (multi-line, `.` matching newlines) extracts the local
//! section from its group 1. The value pattern is then applied repeatedly
//! inside that section; 4-group matches read as `(quote, key, quote, value)`,
//! 2-group matches as `(key, value)`. Inside the template's `[name]` section
//! only `key = "value"` lines whose key was found locally are rewritten.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::{compile_pattern, is_declaration, pattern_error, strip_lines, NamedPatterns, MULTIREGEX, MULTIREGEX_BLOCK};
use crate::error::Result;

static SECTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]").expect("section header pattern is valid"));
static KEY_VALUE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(")?([^"=\s]+)(")?\s*=\s*"([^"]*)""#).expect("key-value line pattern is valid")
});

/// A compiled block/value pattern pair for one section name.
#[derive(Debug, Clone)]
pub struct CompiledSection {
    pub name: String,
    pub block: fancy_regex::Regex,
    pub values: fancy_regex::Regex,
}

/// Compile every multiregex that has a matching block declaration.
///
/// A multiregex without a block declaration is skipped. A block pattern
/// without a capture group is rejected, since group 1 is the section body.
pub fn compile(blocks: &NamedPatterns, multiregexes: &NamedPatterns) -> Result<Vec<CompiledSection>> {
    let mut compiled = Vec::new();
    for (name, value_pattern) in multiregexes.iter() {
        let Some(block_pattern) = blocks.get(name) else {
            debug!("Multiregex '{}' has no block declaration", name);
            continue;
        };
        let block = compile_pattern(MULTIREGEX_BLOCK, name, block_pattern, "ms")?;
        if block.captures_len() < 2 {
            return Err(pattern_error(
                MULTIREGEX_BLOCK,
                name,
                "block pattern must declare a capture group for the section body",
            ));
        }
        let values = compile_pattern(MULTIREGEX, name, value_pattern, "m")?;
        compiled.push(CompiledSection {
            name: name.to_string(),
            block,
            values,
        });
    }
    Ok(compiled)
}

/// Rewrite each declared section of `content` with values found in `local`.
///
/// A section whose block is not found in `local` is left untouched,
/// declaration lines included.
pub fn apply(content: &str, sections: &[CompiledSection], local: &str) -> Result<String> {
    let mut content = content.to_string();
    for section in sections {
        let caps = section
            .block
            .captures(local)
            .map_err(|e| pattern_error(MULTIREGEX_BLOCK, &section.name, e))?;
        let Some(body) = caps.as_ref().and_then(|caps| caps.get(1)).map(|m| m.as_str()) else {
            debug!("Multiregex block '{}' not found in local file", section.name);
            continue;
        };

        let values = extract_values(&section.values, body);
        debug!(
            "Multiregex '{}' extracted keys {:?}",
            section.name,
            values.keys().collect::<Vec<_>>()
        );

        content = strip_lines(&content, |line| {
            is_declaration(line, MULTIREGEX_BLOCK, Some(&section.name))
                || is_declaration(line, MULTIREGEX, Some(&section.name))
        });
        content = replace_in_section(&content, &section.name, &values);
    }
    Ok(content)
}

/// Collect `key -> value` pairs from every match of `pattern` in `body`.
///
/// Matches that fail with a backtracking error are skipped.
pub fn extract_values(pattern: &fancy_regex::Regex, body: &str) -> BTreeMap<String, String> {
    let groups = pattern.captures_len() - 1;
    let (key_group, value_group) = match groups {
        n if n >= 4 => (2, 4),
        n if n >= 2 => (1, 2),
        _ => return BTreeMap::new(),
    };

    pattern
        .captures_iter(body)
        .filter_map(|caps| {
            let caps = caps.ok()?;
            let key = caps.get(key_group)?.as_str().trim();
            let value = caps.get(value_group).map_or("", |m| m.as_str());
            (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

fn section_name(line: &str) -> Option<&str> {
    SECTION_HEADER
        .captures(line.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn replace_in_section(content: &str, name: &str, values: &BTreeMap<String, String>) -> String {
    let mut in_section = false;
    let lines: Vec<String> = content
        .split('\n')
        .map(|line| match section_name(line) {
            Some(found) if found == name => {
                in_section = true;
                line.to_string()
            }
            Some(_) if in_section => {
                in_section = false;
                line.to_string()
            }
            _ if in_section => replace_value(line, values),
            _ => line.to_string(),
        })
        .collect();
    lines.join("\n")
}

/// Substitute the quoted value of a `key = "value"` line when the key is known.
fn replace_value(line: &str, values: &BTreeMap<String, String>) -> String {
    let Some(caps) = KEY_VALUE_LINE.captures(line) else {
        return line.to_string();
    };
    let (Some(key), Some(old)) = (caps.get(2), caps.get(4)) else {
        return line.to_string();
    };
    match values.get(key.as_str()) {
        Some(new) => format!("{}{}{}", &line[..old.start()], new, &line[old.end()..]),
        None => line.to_string(),
    }
}
