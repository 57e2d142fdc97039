//! Tag block stage
//!
//! A tag block is a `repolish-start[name]` line, any inner text, and the
//! first following line containing `repolish-end[name]`. The end marker may
//! share a line with inner text (`inner## repolish-end[name]`); the inner
//! text then stops at the start of that line.

use log::debug;

use super::{NamedPatterns, TAG_END, TAG_START};

/// Byte offsets of one tag block inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block {
    /// First byte of the start-marker line
    line_start: usize,
    /// Byte after the start-marker line's newline
    inner_start: usize,
    /// First byte of the end-marker line
    inner_end: usize,
    /// End of the end-marker line, excluding its newline
    line_end: usize,
}

fn line_bounds(content: &str, at: usize, floor: usize) -> (usize, usize) {
    let start = content[floor..at].rfind('\n').map_or(floor, |i| floor + i + 1);
    let end = content[at..].find('\n').map_or(content.len(), |i| at + i);
    (start, end)
}

/// Locate the block whose start marker is at byte `marker_at`.
fn block_at(content: &str, marker_at: usize, name: &str, floor: usize) -> Option<Block> {
    let (line_start, start_line_end) = line_bounds(content, marker_at, floor);
    if start_line_end >= content.len() {
        return None;
    }
    let inner_start = start_line_end + 1;
    let end_marker = format!("{}[{}]", TAG_END, name);
    let end_at = inner_start + content[inner_start..].find(&end_marker)?;
    let (inner_end, line_end) = line_bounds(content, end_at, inner_start);
    Some(Block {
        line_start,
        inner_start,
        inner_end,
        line_end,
    })
}

/// Extract every tag block as `name -> default text`.
///
/// Defaults have leading and trailing newlines stripped. Blocks do not
/// overlap: scanning resumes after each block's end line.
pub fn extract_tag_blocks(content: &str) -> NamedPatterns {
    let opener = format!("{}[", TAG_START);
    let mut blocks = NamedPatterns::new();
    let mut pos = 0;

    while pos < content.len() {
        let line_end = content[pos..].find('\n').map_or(content.len(), |i| pos + i);
        let line = &content[pos..line_end];
        let found = line.rfind(&opener).and_then(|at| {
            let name_start = at + opener.len();
            let close = line[name_start..].find(']')?;
            (close > 0).then(|| (pos + at, line[name_start..name_start + close].to_string()))
        });

        if let Some((marker_at, name)) = found {
            if let Some(block) = block_at(content, marker_at, &name, pos) {
                let inner = &content[block.inner_start..block.inner_end];
                blocks.insert(name, inner.trim_matches('\n').to_string());
                pos = block.line_end + 1;
                continue;
            }
        }
        pos = line_end + 1;
    }
    blocks
}

/// Replace every block of every tag in `tags` with `\n<value>\n`.
///
/// Each replacement consumes the newline before the start line (when it is
/// not already part of a previous replacement) and the newline after the
/// end line.
pub fn replace_tags(content: &str, tags: &NamedPatterns) -> String {
    let mut content = content.to_string();
    for (name, value) in tags.iter() {
        content = replace_tag(&content, name, value);
    }
    content
}

fn replace_tag(content: &str, name: &str, value: &str) -> String {
    let start_marker = format!("{}[{}]", TAG_START, name);
    let mut out = String::with_capacity(content.len());
    let mut pos = 0;
    let mut replaced = 0;

    while let Some(offset) = content[pos..].find(&start_marker) {
        let Some(block) = block_at(content, pos + offset, name, pos) else {
            break;
        };
        let match_start = if block.line_start > pos {
            block.line_start - 1
        } else {
            block.line_start
        };
        let match_end = if block.line_end < content.len() {
            block.line_end + 1
        } else {
            block.line_end
        };

        out.push_str(&content[pos..match_start]);
        out.push('\n');
        out.push_str(value);
        out.push('\n');
        pos = match_end;
        replaced += 1;
    }
    out.push_str(&content[pos..]);

    if replaced == 0 {
        debug!("Tag '{}' has no complete block in template", name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> NamedPatterns {
        let mut named = NamedPatterns::new();
        for (k, v) in pairs {
            named.insert(k.to_string(), v.to_string());
        }
        named
    }

    fn apply_defaults(template: &str) -> String {
        replace_tags(template, &extract_tag_blocks(template))
    }

    #[test]
    fn test_extract_strips_newlines_and_accepts_any_comment_syntax() {
        let template = "\
<!-- repolish-start[header] -->

  Old header

<!-- repolish-end[header] -->
/* repolish-start[empty] */
/* repolish-end[empty] */
";
        let blocks = extract_tag_blocks(template);
        assert_eq!(blocks.get("header"), Some("  Old header"));
        assert_eq!(blocks.get("empty"), Some(""));
    }

    #[test]
    fn test_only_tags_keeps_defaults_and_strips_markers() {
        let template = "\
Header:
<!-- repolish-start[header] -->
  Old header
<!-- repolish-end[header] -->
Footer:
  ## repolish-start[footer]
  Old footer
  ## repolish-end[footer]
";
        let expected = "Header:\n  Old header\nFooter:\n  Old footer\n";
        assert_eq!(apply_defaults(template), expected);
    }

    #[test]
    fn test_explicit_empty_anchor_deletes_block() {
        let template = "Start.\n/* repolish-start[empty] */\nThis should be removed.\n/* repolish-end[empty] */\nEnd.\n";
        assert_eq!(
            replace_tags(template, &tags(&[("empty", "")])),
            "Start.\n\nEnd.\n"
        );
    }

    #[test]
    fn test_inline_between() {
        let template = "Hello\n## repolish-start[tag]\ninner\n## repolish-end[tag]\nWorld\n";
        assert_eq!(
            replace_tags(template, &tags(&[("tag", "X")])),
            "Hello\nX\nWorld\n"
        );
    }

    #[test]
    fn test_end_marker_on_inner_line() {
        let template = "A\n## repolish-start[tag]\ninner## repolish-end[tag]\nB\n";
        assert_eq!(extract_tag_blocks(template).get("tag"), Some(""));
        assert_eq!(replace_tags(template, &tags(&[("tag", "Y")])), "A\nY\nB\n");
    }

    #[test]
    fn test_indented_block_is_promoted_to_column_zero() {
        let template = "Header\n    ## repolish-start[indented]\n        some default\n    ## repolish-end[indented]\nFooter\n";
        let out = replace_tags(template, &tags(&[("indented", "REPLACED")]));
        assert_eq!(out, "Header\nREPLACED\nFooter\n");
    }

    #[test]
    fn test_multiline_values_are_verbatim() {
        let template = "Top\n    ## repolish-start[b]\n    default\n    ## repolish-end[b]\nBottom\n";
        let out = replace_tags(template, &tags(&[("b", "\nLINE1\nLINE2\n")]));
        assert_eq!(out, "Top\n\nLINE1\nLINE2\n\nBottom\n");
    }

    #[test]
    fn test_block_at_start_of_text() {
        let template = "## repolish-start[h]\nold\n## repolish-end[h]\nrest\n";
        assert_eq!(replace_tags(template, &tags(&[("h", "new")])), "\nnew\nrest\n");
    }

    #[test]
    fn test_repeated_block_is_replaced_each_time() {
        let template = "a\n# repolish-start[x]\n1\n# repolish-end[x]\n# repolish-start[x]\n2\n# repolish-end[x]\nb\n";
        let out = replace_tags(template, &tags(&[("x", "V")]));
        assert_eq!(out, "a\nV\n\nV\nb\n");
    }

    #[test]
    fn test_unterminated_block_is_left_alone() {
        let template = "a\n## repolish-start[open]\nbody\n";
        assert!(extract_tag_blocks(template).is_empty());
        assert_eq!(replace_tags(template, &tags(&[("open", "V")])), template);
    }

    #[test]
    fn test_other_names_do_not_close_a_block() {
        let template = "## repolish-start[a]\nx\n## repolish-end[b]\ny\n## repolish-end[a]\n";
        assert_eq!(extract_tag_blocks(template).get("a"), Some("x\n## repolish-end[b]\ny"));
    }
}
