//! Load-time checks for module providers
//!
//! Module providers are duck-typed, so a misspelled symbol silently
//! contributes nothing. Before evaluation every module unit is scanned for
//! names that look like near-misses of the known vocabulary; each one yields a
//! warning. Strict mode additionally rejects modules that declare no file
//! mappings at all.

use std::collections::BTreeSet;

use log::warn;

use super::{ModuleProvider, Provider, ProviderUnit, UnitKind};
use crate::error::{Error, Result};
use crate::suggestions::{self, KNOWN_FUNCTIONS, KNOWN_VARIABLES};

/// Trait method recommended for each legacy symbol.
const MIGRATION_MAP: &[(&str, &str)] = &[
    ("create_context", "create_context"),
    ("context", "create_context"),
    ("create_file_mappings", "create_file_mappings"),
    ("file_mappings", "create_file_mappings"),
    ("create_delete_files", "create_file_mappings"),
    ("delete_files", "create_file_mappings"),
    ("create_create_only_files", "create_file_mappings"),
    ("create_only_files", "create_file_mappings"),
    ("create_anchors", "create_anchors"),
    ("anchors", "create_anchors"),
];

/// Validate one unit, warning about suspicious symbols.
pub fn validate_unit(unit: &ProviderUnit, require_file_mappings: bool) -> Result<()> {
    let UnitKind::Module(module) = &unit.kind else {
        return Ok(());
    };

    if !module.migrated() {
        emit_migration_hint(&unit.id, module);
    }
    warn_suspicious_symbols(&unit.id, module);

    if require_file_mappings && !module.has_mapping_symbol() {
        return Err(Error::Runtime {
            provider: unit.id.clone(),
            message: "provider declares no file mappings".to_string(),
            hint: Some(suggestions::missing_file_mappings()),
        });
    }
    Ok(())
}

fn emit_migration_hint(provider: &str, module: &ModuleProvider) {
    let methods: BTreeSet<&str> = module
        .symbols()
        .iter()
        .filter_map(|(name, _)| {
            MIGRATION_MAP
                .iter()
                .find(|(legacy, _)| *legacy == name.as_str())
                .map(|(_, method)| *method)
        })
        .collect();
    if !methods.is_empty() {
        let methods: Vec<&str> = methods.into_iter().collect();
        warn!("{}", suggestions::module_migration(provider, &methods));
    }
}

fn warn_suspicious_symbols(provider: &str, module: &ModuleProvider) {
    for (name, is_callable) in module.symbols() {
        if name.starts_with('_') {
            continue;
        }
        if *is_callable {
            if name.starts_with("create_") && !KNOWN_FUNCTIONS.contains(&name.as_str()) {
                warn!("{}", suggestions::unknown_function(provider, name));
            }
        } else if is_suspicious_variable(name) {
            warn!("{}", suggestions::suspicious_variable(provider, name));
        }
    }
}

/// Whether an attribute name looks like a misspelled provider variable.
pub fn is_suspicious_variable(name: &str) -> bool {
    if matches!(name, "create_only_file" | "createonly_files" | "create_files") {
        return true;
    }
    if KNOWN_VARIABLES.contains(&name) {
        return false;
    }
    (name.ends_with("_files") || name.ends_with("_mappings")) && !name.starts_with("create_")
}
