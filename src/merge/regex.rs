//! Single-regex stage
//!
//! Each `repolish-regex[name]: PATTERN` declaration is searched in the local
//! file. On a match, the selected text (capture group 1 when it participated,
//! else the whole match) replaces the same pattern's span in the template.
//! Both sides are scoped with [`trim_by_indent`] first so a greedy pattern
//! cannot swallow the sections that follow it.

use fancy_regex::{Captures, Match, Regex};
use log::debug;

use super::{compile_pattern, is_declaration, pattern_error, strip_lines, NamedPatterns, REGEX};
use crate::error::Result;

/// A declared pattern compiled in multi-line mode.
#[derive(Debug, Clone)]
pub struct CompiledRegex {
    pub name: String,
    pub regex: Regex,
}

impl CompiledRegex {
    /// Search `haystack`; a backtracking failure is reported as a pattern error.
    fn captures<'h>(&self, haystack: &'h str) -> Result<Option<Captures<'h>>> {
        self.regex
            .captures(haystack)
            .map_err(|e| pattern_error(REGEX, &self.name, e))
    }
}

/// Compile every declared pattern, failing on the first malformed one.
pub fn compile(regexes: &NamedPatterns) -> Result<Vec<CompiledRegex>> {
    regexes
        .iter()
        .map(|(name, pattern)| {
            Ok(CompiledRegex {
                name: name.to_string(),
                regex: compile_pattern(REGEX, name, pattern, "m")?,
            })
        })
        .collect()
}

/// Strip declaration lines, then import each matching span from `local`.
pub fn apply(content: &str, regexes: &[CompiledRegex], local: &str) -> Result<String> {
    let mut content = strip_lines(content, |line| is_declaration(line, REGEX, None));

    for compiled in regexes {
        let Some(local_match) = compiled.captures(local)?.as_ref().and_then(selected) else {
            debug!("Regex '{}' has no match in local file", compiled.name);
            continue;
        };
        let local_text = trim_by_indent(local_match.as_str());

        let Some(span) = compiled.captures(&content)?.as_ref().and_then(selected) else {
            debug!("Regex '{}' has no match in template", compiled.name);
            continue;
        };
        let (start, raw_end) = (span.start(), span.end());
        let trimmed_len = trim_by_indent(span.as_str()).len();
        let end = extend_over_whitespace(&content, start + trimmed_len, raw_end);

        debug!("Regex '{}' imported {} byte(s)", compiled.name, local_text.len());
        content = format!("{}{}{}", &content[..start], local_text, &content[end..]);
    }
    Ok(content)
}

/// Capture group 1 when it participated, else the whole match.
fn selected<'h>(caps: &Captures<'h>) -> Option<Match<'h>> {
    caps.get(1).or_else(|| caps.get(0))
}

/// Keep the first line plus following lines that are blank or indented at
/// least as deep (in spaces) as the first; stop at the first shallower line.
///
/// This is a heuristic for indentation-structured text, not a block grammar:
/// tab-indented or mixed-indentation content is only scoped by leading
/// spaces. Prefer explicit capture groups for precise control.
pub fn trim_by_indent(block: &str) -> &str {
    let mut lines = block.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return block;
    };
    let anchor = indent_of(first);
    let mut kept = first.len();

    for line in lines {
        if line.trim().is_empty() || indent_of(line) >= anchor {
            kept += line.len();
        } else {
            break;
        }
    }
    &block[..kept]
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Extend a trimmed end to the untrimmed capture end when the gap is only
/// whitespace and contains a newline.
fn extend_over_whitespace(content: &str, trimmed_end: usize, raw_end: usize) -> usize {
    if trimmed_end < raw_end {
        let between = &content[trimmed_end..raw_end];
        if between.trim().is_empty() && between.contains('\n') {
            return raw_end;
        }
    }
    trimmed_end
}
