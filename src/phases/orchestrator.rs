//! Orchestrator for a complete provider run
//!
//! This module coordinates all phases to provide a clean API: load units,
//! validate them, run Phases 1-4 and assemble the [`MergedResult`].

use std::path::Path;

use log::{debug, info};

use super::{phase1, phase2, phase3, phase4, MergedResult};
use crate::context::{apply_overrides, merge_into, Context};
use crate::error::Result;
use crate::providers::{manifest, validation, InputsSchema, ProviderUnit};

/// Knobs for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Fail when a module provider declares no file mappings
    pub require_file_mappings: bool,
    /// Accept a provider returning no context (deprecated)
    pub allow_none_context: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            require_file_mappings: false,
            allow_none_context: true,
        }
    }
}

/// Owns the provider units of one run.
///
/// Each [`run`](Orchestrator::run) starts from fresh accumulators, so the
/// same orchestrator can be run repeatedly with different base contexts.
#[derive(Debug)]
pub struct Orchestrator {
    units: Vec<ProviderUnit>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    pub fn new(units: Vec<ProviderUnit>, options: OrchestratorOptions) -> Self {
        Self { units, options }
    }

    /// Load units from provider locations; unresolvable locations are skipped.
    pub fn from_locations<P: AsRef<Path>>(locations: &[P], options: OrchestratorOptions) -> Result<Self> {
        Ok(Self::new(manifest::load_units(locations)?, options))
    }

    pub fn units(&self) -> &[ProviderUnit] {
        &self.units
    }

    /// Execute the complete run (validation, then Phases 1-4).
    ///
    /// `base` is the project context: it seeds Phase 1 and is re-applied last
    /// so project values win. `overrides` (dot-notation keys or nested
    /// mappings) are applied in between.
    pub fn run(&self, base: &Context, overrides: &Context) -> Result<MergedResult> {
        info!("Evaluating {} provider(s)", self.units.len());

        for unit in &self.units {
            validation::validate_unit(unit, self.options.require_file_mappings)?;
        }

        // Phase 1: Context Collection
        let collected = phase1::execute(&self.units, base, self.options.allow_none_context)?;
        let mut snapshots = collected.snapshots;

        // Phase 2: Input Routing
        let all: Vec<(String, Context)> = self
            .units
            .iter()
            .map(|unit| unit.id.clone())
            .zip(snapshots.iter().cloned())
            .collect();
        let schemas: Vec<Option<InputsSchema>> = self
            .units
            .iter()
            .map(|unit| unit.provider().inputs_schema())
            .collect();
        let accepts: Vec<bool> = schemas.iter().map(Option::is_some).collect();
        let flags = phase2::recipient_flags(&accepts);
        let queued = phase2::execute(&self.units, &all, &flags)?;

        // Phase 3: Finalization
        phase3::execute(&self.units, &schemas, &queued, &all, &mut snapshots)?;

        let mut context = base.clone();
        for snapshot in &snapshots {
            merge_into(&mut context, snapshot);
        }
        apply_overrides(&mut context, overrides);
        merge_into(&mut context, base);
        debug!("Merged context has {} key(s)", context.len());

        // Phase 4: Contribution Merge
        let acc = phase4::execute(&self.units, &context)?;
        let (delete_files, provenance) = acc.ledger.into_parts();

        Ok(MergedResult {
            context,
            anchors: acc.anchors,
            delete_files,
            file_mappings: acc.file_mappings,
            create_only_files: acc.create_only,
            provenance,
            provider_migrated: self
                .units
                .iter()
                .map(|unit| (unit.id.clone(), unit.provider().migrated()))
                .collect(),
            provider_contexts: self
                .units
                .iter()
                .map(|unit| unit.id.clone())
                .zip(snapshots)
                .collect(),
        })
    }
}

/// Load providers from `locations` and run them.
pub fn create_providers<P: AsRef<Path>>(
    locations: &[P],
    base: &Context,
    overrides: &Context,
    options: OrchestratorOptions,
) -> Result<MergedResult> {
    Orchestrator::from_locations(locations, options)?.run(base, overrides)
}
