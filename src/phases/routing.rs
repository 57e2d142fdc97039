//! Phase 2: Input Routing
//!
//! A provider that declares an inputs schema is a recipient. Every provider
//! with a recipient somewhere after it is asked for payloads, keyed by the
//! recipient's canonical name or provider id. Payloads are queued per target
//! provider id in production order. Keys that match no provider are logged
//! and dropped.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::error::Result;
use crate::providers::{Payload, ProviderContexts, ProviderUnit};

/// Queued payloads per recipient provider id.
pub type Queued = BTreeMap<String, Vec<Payload>>;

/// For each index, whether any later provider accepts inputs.
///
/// One backward pass over `accepts_inputs`.
pub fn recipient_flags(accepts_inputs: &[bool]) -> Vec<bool> {
    let mut flags = vec![false; accepts_inputs.len()];
    let mut found = false;
    for index in (0..accepts_inputs.len()).rev() {
        flags[index] = found;
        found |= accepts_inputs[index];
    }
    flags
}

/// Map canonical provider names to provider ids.
///
/// When two providers share a name the later one wins.
pub fn recipient_index(units: &[ProviderUnit]) -> BTreeMap<String, String> {
    units
        .iter()
        .filter_map(|unit| {
            unit.provider()
                .provider_name()
                .map(|name| (name, unit.id.clone()))
        })
        .collect()
}

/// Execute Phase 2.
///
/// `all` holds the Phase 1 snapshot of every provider, index-aligned with
/// `units`; `flags` comes from [`recipient_flags`].
pub fn execute(units: &[ProviderUnit], all: &ProviderContexts, flags: &[bool]) -> Result<Queued> {
    let names = recipient_index(units);
    let mut queued = Queued::new();

    for (index, unit) in units.iter().enumerate() {
        if !flags[index] {
            continue;
        }
        let own = &all[index].1;
        let produced = unit.provider().collect_inputs(own, all, index)?;

        for (recipient, payload) in produced {
            let target = match names.get(&recipient) {
                Some(pid) => pid.clone(),
                None if units.iter().any(|u| u.id == recipient) => recipient,
                None => {
                    warn!(
                        "Provider {} sent inputs to unknown recipient '{}', dropping",
                        unit.id, recipient
                    );
                    continue;
                }
            };
            debug!("Routing payload from {} to {}", unit.id, target);
            queued.entry(target).or_default().push(payload);
        }
    }

    Ok(queued)
}
