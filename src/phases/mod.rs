//! Implementation of the 4 phases of provider evaluation.
//!
//! ## Overview
//!
//! A run evaluates an ordered list of provider units in 4 phases:
//! 1. Context Collection - Build each provider's context, chaining the merged context
//! 2. Input Routing - Providers with a later recipient send payloads forward
//! 3. Finalization - Recipients recompute their context from routed payloads
//! 4. Contribution Merge - Merge anchors, file mappings, deletions and create-only paths
//!
//! Between phases 3 and 4 the merged context is recomputed from the project
//! base context, the finalized snapshots and the context overrides.
//!
//! Provider order is the only precedence source: no phase reorders units, and
//! later providers win every key conflict.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::context::Context;
use crate::provenance::{Decision, DeleteLedger};
use crate::providers::{Anchors, SourceDescriptor};

// Phase modules
pub mod collection;
pub mod contribution;
pub mod finalization;
pub mod orchestrator;
pub mod routing;

pub use collection as phase1;
pub use contribution as phase4;
pub use finalization as phase3;
pub use routing as phase2;

pub use orchestrator::{create_providers, Orchestrator, OrchestratorOptions};

/// Everything a run produced, consumed by the rendering and apply layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedResult {
    pub context: Context,
    pub anchors: Anchors,
    /// Concrete normalized paths to delete
    pub delete_files: BTreeSet<String>,
    pub file_mappings: BTreeMap<String, SourceDescriptor>,
    pub create_only_files: BTreeSet<String>,
    /// Per-path delete/keep history in evaluation order
    pub provenance: BTreeMap<String, Vec<Decision>>,
    /// Finalized context snapshot of each provider, keyed by provider id
    pub provider_contexts: BTreeMap<String, Context>,
    pub provider_migrated: BTreeMap<String, bool>,
}

impl MergedResult {
    /// Apply raw delete entries (with `!` negation) after every provider,
    /// keeping the delete set and provenance log in step.
    pub fn apply_deletes<S: AsRef<str>>(&mut self, entries: &[S], source: &str) {
        let mut ledger = DeleteLedger::from_parts(
            std::mem::take(&mut self.delete_files),
            std::mem::take(&mut self.provenance),
        );
        for entry in entries {
            ledger.apply_raw(entry.as_ref(), source);
        }
        let (paths, history) = ledger.into_parts();
        self.delete_files = paths;
        self.provenance = history;
    }

    /// Whether the last decision of every logged path agrees with the delete set.
    pub fn is_consistent(&self) -> bool {
        DeleteLedger::from_parts(self.delete_files.clone(), self.provenance.clone()).is_consistent()
    }

    /// Context templates from `provider_id` render with: the merged context,
    /// overlaid with the provider's own snapshot when it has migrated.
    pub fn render_context(&self, provider_id: Option<&str>) -> Context {
        let own = provider_id
            .filter(|id| self.provider_migrated.get(*id).copied().unwrap_or(false))
            .and_then(|id| self.provider_contexts.get(id));
        match own {
            Some(own) => crate::context::merged(&self.context, own),
            None => self.context.clone(),
        }
    }
}
