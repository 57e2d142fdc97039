//! Phase 4: Contribution Merge
//!
//! With the final merged context in hand, each provider in order contributes
//! anchors, file mappings, deletions and create-only paths. Every path is
//! normalized before it is used as a key.
//!
//! Deletions come from two places: the raw `delete_files` list (which may
//! carry `!` negations) and `delete`-mode file mappings. When a provider has
//! raw entries they are used exclusively; otherwise its `delete`-mode
//! mappings are. Each applied entry appends a provenance decision.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::context::Context;
use crate::error::Result;
use crate::path::{normalize_posix, parse_negation};
use crate::provenance::{Action, DeleteLedger};
use crate::providers::{Anchors, FileMode, ProviderUnit, SourceDescriptor};

/// Accumulated contributions of every provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulators {
    pub anchors: Anchors,
    pub file_mappings: BTreeMap<String, SourceDescriptor>,
    pub create_only: BTreeSet<String>,
    pub ledger: DeleteLedger,
}

/// Execute Phase 4.
pub fn execute(units: &[ProviderUnit], context: &Context) -> Result<Accumulators> {
    let mut acc = Accumulators::default();
    for unit in units {
        contribute(unit, context, &mut acc)?;
    }
    Ok(acc)
}

fn contribute(unit: &ProviderUnit, context: &Context, acc: &mut Accumulators) -> Result<()> {
    let provider = unit.provider();

    acc.anchors.extend(provider.create_anchors(context)?);

    let mut delete_fallback = Vec::new();
    let mut create_only = Vec::new();

    for (dest, descriptor) in provider.create_file_mappings(context)? {
        let dest = normalize_posix(&dest);
        let Some(descriptor) = descriptor else {
            debug!("Provider {} opted out of {}", unit.id, dest);
            acc.file_mappings.remove(&dest);
            continue;
        };

        match descriptor.mode() {
            FileMode::Delete => {
                delete_fallback.push(dest);
                continue;
            }
            FileMode::CreateOnly => create_only.push(dest.clone()),
            FileMode::Regular => {}
        }

        if descriptor.source().is_some() {
            acc.file_mappings
                .insert(dest, descriptor.owned_by(&unit.id));
        } else if descriptor.mode() == FileMode::Regular {
            warn!("Provider {} maps {} without a source, ignoring", unit.id, dest);
        }
    }

    let raw_deletes = provider.delete_files();
    if raw_deletes.is_empty() {
        for path in &delete_fallback {
            acc.ledger.record(path, &unit.id, Action::Delete);
        }
    } else {
        if !delete_fallback.is_empty() {
            debug!(
                "Provider {} has raw delete entries; ignoring {} delete-mode mapping(s)",
                unit.id,
                delete_fallback.len()
            );
        }
        for entry in &raw_deletes {
            acc.ledger.apply_raw(entry, &unit.id);
        }
    }

    acc.create_only.extend(create_only);
    for entry in provider.create_only_files() {
        let (negated, path) = parse_negation(&entry);
        if negated {
            acc.create_only.remove(&path);
        } else {
            acc.create_only.insert(path);
        }
    }
    Ok(())
}
