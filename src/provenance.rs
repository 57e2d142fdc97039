//! Deletion provenance
//!
//! Every delete/keep determination is recorded as a [`Decision`] on a
//! per-path, append-only history. [`DeleteLedger`] owns both the history and
//! the resulting delete set and updates them together, so the last recorded
//! action for a path always agrees with set membership.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::path::parse_negation;

/// Outcome of a single provenance decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Delete,
    Keep,
}

/// One entry in a path's provenance history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Provider id or config directory that produced the decision
    pub source: String,
    pub action: Action,
}

/// Delete set plus the provenance log that explains it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteLedger {
    paths: BTreeSet<String>,
    history: BTreeMap<String, Vec<Decision>>,
}

impl DeleteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a decision for an already-normalized path.
    pub fn record(&mut self, path: &str, source: &str, action: Action) {
        match action {
            Action::Delete => {
                self.paths.insert(path.to_string());
            }
            Action::Keep => {
                self.paths.remove(path);
            }
        }
        self.history
            .entry(path.to_string())
            .or_default()
            .push(Decision {
                source: source.to_string(),
                action,
            });
    }

    /// Record a raw entry, where a leading `!` means keep.
    pub fn apply_raw(&mut self, entry: &str, source: &str) {
        let (negated, path) = parse_negation(entry);
        let action = if negated { Action::Keep } else { Action::Delete };
        self.record(&path, source, action);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn paths(&self) -> &BTreeSet<String> {
        &self.paths
    }

    pub fn history(&self) -> &BTreeMap<String, Vec<Decision>> {
        &self.history
    }

    pub fn into_parts(self) -> (BTreeSet<String>, BTreeMap<String, Vec<Decision>>) {
        (self.paths, self.history)
    }

    /// Rebuild a ledger from a previously split result.
    pub fn from_parts(
        paths: BTreeSet<String>,
        history: BTreeMap<String, Vec<Decision>>,
    ) -> Self {
        Self { paths, history }
    }

    /// Whether the last recorded action of every path agrees with the set.
    pub fn is_consistent(&self) -> bool {
        let history_ok = self.history.iter().all(|(path, decisions)| {
            match decisions.last().map(|d| d.action) {
                Some(Action::Delete) => self.paths.contains(path),
                Some(Action::Keep) | None => !self.paths.contains(path),
            }
        });
        history_ok && self.paths.iter().all(|p| self.history.contains_key(p))
    }
}
