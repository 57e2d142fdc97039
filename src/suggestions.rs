//! # Error Suggestions
//!
//! This module provides helper functions for generating helpful error
//! messages and warnings with hints and suggestions. Following CLI
//! recommendations, messages should tell users what went wrong AND how to
//! fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crate::suggestions;
//!
//! // Instead of:
//! anyhow::bail!("Configuration file not found: {}", path.display());
//!
//! // Use:
//! return Err(suggestions::config_not_found(path));
//! ```

use std::path::Path;

/// Operation names recognised on module-style providers.
pub const KNOWN_FUNCTIONS: &[&str] = &[
    "create_context",
    "create_delete_files",
    "create_file_mappings",
    "create_create_only_files",
    "create_anchors",
];

/// Attribute names recognised on module-style providers.
pub const KNOWN_VARIABLES: &[&str] = &[
    "context",
    "delete_files",
    "file_mappings",
    "create_only_files",
    "anchors",
];

/// Generate an error for when the configuration file is not found.
///
/// Includes hints about:
/// - Creating a new config file
/// - Using the -c/--config flag
/// - Using the REPOLISH_CONFIG environment variable
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Configuration file not found: {path}\n\n\
         hint: Create a repolish.yaml file in your project root\n\
         hint: Use -c/--config to specify a different path\n\
         hint: Set REPOLISH_CONFIG environment variable",
        path = path.display()
    )
}

/// Generate an error for a preview debug file that cannot be used.
pub fn invalid_debug_file(path: &Path, reason: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Invalid preview file {path}: {reason}\n\n\
         hint: The file must be YAML with 'template' and 'target' string keys\n\
         hint: Anchor overrides go under 'config: {{ anchors: {{ name: text }} }}'",
        path = path.display()
    )
}

/// Generate an error for an invalid marker pattern.
///
/// Includes hints about the regex dialect supported in markers.
pub fn invalid_pattern(name: &str, error: &str) -> anyhow::Error {
    let hint = if error.contains("backtrack") {
        "hint: The pattern backtracks too much; anchor it or replace nested quantifiers"
    } else if error.contains("unclosed") || error.contains("without closing") {
        "hint: Check for unclosed brackets, parentheses, or braces"
    } else {
        "hint: Run 'repolish preview --show-patterns' to inspect extracted patterns"
    };

    anyhow::anyhow!(
        "Invalid marker pattern for '{name}'\n\
         error: {error}\n\n\
         {hint}\n\
         hint: Test patterns at https://regex101.com (select Python flavor)"
    )
}

/// Build the warning for a `create_*` callable that is not a known operation.
pub fn unknown_function(provider: &str, name: &str) -> String {
    let hint = if name.contains("create_only") || name.contains("createonly") {
        "Did you mean create_create_only_files?".to_string()
    } else {
        match find_similar(name, KNOWN_FUNCTIONS) {
            Some(canonical) => format!("Did you mean {}?", canonical),
            None => format!("Valid functions: {}", KNOWN_FUNCTIONS.join(", ")),
        }
    };
    format!("Provider {provider} defines unknown function '{name}'\n  hint: {hint}")
}

/// Build the warning for an attribute that looks like a misspelled one.
pub fn suspicious_variable(provider: &str, name: &str) -> String {
    let hint = match find_similar(name, KNOWN_VARIABLES) {
        Some(canonical) => format!("Did you mean {}?", canonical),
        None => format!("Valid variables: {}", KNOWN_VARIABLES.join(", ")),
    };
    format!("Provider {provider} defines suspicious variable '{name}'\n  hint: {hint}")
}

/// Build the migration hint for a provider still using the module style.
pub fn module_migration(provider: &str, methods: &[&str]) -> String {
    format!(
        "Provider {provider} uses module-style symbols\n  \
         hint: Implement the Provider trait ({}) and set provider_migrated: true",
        methods.join(", ")
    )
}

/// Hint attached to the strict-mode error for providers without mappings.
pub fn missing_file_mappings() -> String {
    "Define file_mappings (or create_file_mappings), or run without strict file mappings"
        .to_string()
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
pub fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Single rolling row instead of the full matrix.
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_includes_hints() {
        let path = Path::new("/some/path/repolish.yaml");
        let message = config_not_found(path).to_string();

        assert!(message.contains("Configuration file not found"));
        assert!(message.contains("/some/path/repolish.yaml"));
        assert!(message.contains("hint:"));
        assert!(message.contains("-c/--config"));
        assert!(message.contains("REPOLISH_CONFIG"));
    }

    #[test]
    fn test_invalid_pattern_hints() {
        let message = invalid_pattern("v", "Parsing error at position 9: Opening parenthesis without closing parenthesis")
            .to_string();
        assert!(message.contains("Invalid marker pattern for 'v'"));
        assert!(message.contains("unclosed brackets"));

        let message = invalid_pattern("v", "Error executing regex: Max limit for backtracking count exceeded").to_string();
        assert!(message.contains("backtracks too much"));
    }

    #[test]
    fn test_unknown_function_hints() {
        let warning = unknown_function("p", "create_contxt");
        assert!(warning.contains("'create_contxt'"));
        assert!(warning.contains("Did you mean create_context?"));

        let warning = unknown_function("p", "create_creat_only_files");
        assert!(warning.contains("Did you mean create_create_only_files?"));

        let warning = unknown_function("p", "create_everything");
        assert!(warning.contains("Valid functions: create_context"));
    }

    #[test]
    fn test_suspicious_variable_hints() {
        assert!(suspicious_variable("p", "file_mapping").contains("Did you mean file_mappings?"));
        assert!(suspicious_variable("p", "extra_files").contains("Valid variables:"));
    }

    #[test]
    fn test_module_migration_mentions_provider() {
        let message = module_migration("providers/legacy", &["create_anchors", "create_context"]);
        assert!(message.contains("providers/legacy"));
        assert!(message.contains("hint:"));
        assert!(message.contains("create_anchors, create_context"));
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("anchors", "anchors"), 0);
        assert_eq!(edit_distance("anchor", "anchors"), 1);
        assert_eq!(edit_distance("contxt", "context"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_find_similar() {
        assert_eq!(find_similar("file_mapping", KNOWN_VARIABLES), Some("file_mappings"));
        assert_eq!(find_similar("delete_file", KNOWN_VARIABLES), Some("delete_files"));
        assert_eq!(find_similar("foobar", KNOWN_VARIABLES), None);
    }
}
