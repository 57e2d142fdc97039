//! Config/delete resolution
//!
//! Runs the orchestrator over the configured provider locations and layers
//! the project configuration on top of its result: project context and
//! anchors override provider values, and the project `delete_files` list is
//! applied after every provider with the config directory as the decision
//! source.

use log::debug;

use crate::config::RepolishConfig;
use crate::context::merge_into;
use crate::error::Result;
use crate::path::normalize_path;
use crate::phases::{create_providers, MergedResult, OrchestratorOptions};

/// Build the final merged result for a resolved configuration.
pub fn build_final_providers(config: &RepolishConfig, options: OrchestratorOptions) -> Result<MergedResult> {
    let mut result = create_providers(
        &config.locations,
        &config.context,
        &config.context_overrides,
        options,
    )?;
    apply_config(&mut result, config);
    Ok(result)
}

/// Overlay project context, anchors and deletions onto a merged result.
pub fn apply_config(result: &mut MergedResult, config: &RepolishConfig) {
    merge_into(&mut result.context, &config.context);
    result
        .anchors
        .extend(config.anchors.iter().map(|(k, v)| (k.clone(), v.clone())));

    if !config.delete_files.is_empty() {
        let source = normalize_path(&config.config_dir);
        debug!("Applying {} config delete entries from {}", config.delete_files.len(), source);
        result.apply_deletes(&config.delete_files, &source);
    }
}
