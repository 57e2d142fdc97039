//! Property-based tests for path normalization and deletion provenance.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{normalize_posix, parse_negation};
    use crate::provenance::{Action, DeleteLedger};
    use proptest::prelude::*;

    // ============================================================================
    // normalize_posix property tests
    // ============================================================================

    proptest! {
        /// Property: normalizing twice gives the same result as normalizing once
        #[test]
        fn normalize_is_idempotent(input in "[a-z./\\\\]{0,24}") {
            let once = normalize_posix(&input);
            prop_assert_eq!(normalize_posix(&once), once);
        }

        /// Property: normalized output never contains backslashes or empty segments
        #[test]
        fn normalize_output_is_clean(input in "[a-z./\\\\]{0,24}") {
            let result = normalize_posix(&input);
            prop_assert!(!result.contains('\\'));
            prop_assert!(!result.contains("//"));
            prop_assert!(result == "." || !result.split('/').skip(1).any(|p| p == "."));
        }

        /// Property: backslash and forward slash separators are interchangeable
        #[test]
        fn normalize_separator_agnostic(parts in prop::collection::vec("[a-z]{1,5}", 1..5)) {
            let posix = parts.join("/");
            let windows = parts.join("\\");
            prop_assert_eq!(normalize_posix(&posix), normalize_posix(&windows));
        }

        /// Property: negation strips exactly one leading '!'
        #[test]
        fn negation_roundtrip(path in "[a-z]{1,8}(/[a-z]{1,8}){0,3}") {
            prop_assert_eq!(parse_negation(&path), (false, path.clone()));
            prop_assert_eq!(parse_negation(&format!("!{}", path)), (true, path));
        }
    }

    // ============================================================================
    // DeleteLedger property tests
    // ============================================================================

    fn entry_strategy() -> impl Strategy<Value = String> {
        (any::<bool>(), "[a-c]\\.txt").prop_map(|(neg, path)| {
            if neg {
                format!("!{}", path)
            } else {
                path
            }
        })
    }

    proptest! {
        /// Property: the final set always agrees with the last decision per path
        #[test]
        fn ledger_is_always_consistent(entries in prop::collection::vec(entry_strategy(), 0..32)) {
            let mut ledger = DeleteLedger::new();
            for (i, entry) in entries.iter().enumerate() {
                ledger.apply_raw(entry, &format!("source-{}", i % 3));
            }
            prop_assert!(ledger.is_consistent());
            for (path, decisions) in ledger.history() {
                let last = decisions.last().map(|d| d.action);
                prop_assert_eq!(last == Some(Action::Delete), ledger.contains(path));
            }
        }

        /// Property: `p` followed by `!p` leaves p out of the set
        #[test]
        fn delete_then_negate_is_absent(path in "[a-z]{1,8}\\.md") {
            let mut ledger = DeleteLedger::new();
            ledger.apply_raw(&path, "a");
            ledger.apply_raw(&format!("!{}", path), "b");
            prop_assert!(!ledger.contains(&path));
            prop_assert_eq!(ledger.paths().len(), 0);
        }

        /// Property: `!p` followed by `p` is the same as only adding p
        #[test]
        fn negate_then_delete_is_present(path in "[a-z]{1,8}\\.md") {
            let mut negated_first = DeleteLedger::new();
            negated_first.apply_raw(&format!("!{}", path), "a");
            negated_first.apply_raw(&path, "b");

            let mut plain = DeleteLedger::new();
            plain.apply_raw(&path, "b");

            prop_assert_eq!(negated_first.paths(), plain.paths());
        }
    }
}
