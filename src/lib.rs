//! # Repolish Library
//!
//! Reconciles a project against an ordered list of template providers. The
//! `repolish` command-line tool is a thin wrapper over this library.
//!
//! ## Quick Example
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! let template = "## repolish-regex[version]: version = \"(.+)\"\nversion = \"0.0.0\"\n";
//! let local = "version = \"1.4.2\"\n";
//!
//! let merged = repolish::merge::merge(template, local, &BTreeMap::new()).unwrap();
//! assert_eq!(merged, "version = \"1.4.2\"\n");
//! ```
//!
//! ## Core Concepts
//!
//! - **Providers (`providers`)**: Template sources, either implementing the
//!   [`providers::Provider`] trait or described by a `repolish.yaml` manifest
//!   of symbols (the module style).
//! - **Phases (`phases`)**: The provider orchestrator. Four phases turn the
//!   ordered providers into one [`phases::MergedResult`]: context collection,
//!   input routing, context finalization and contribution merge.
//! - **Text Merge Engine (`merge`)**: Preserves project-local content inside
//!   marker-delimited regions of template text.
//! - **Provenance (`provenance`)**: Records every delete/keep decision with
//!   the provider that made it.
//! - **Configuration (`config`, `resolver`)**: Loads `repolish.yaml` and
//!   layers project settings on top of the orchestrator's result.
//! - **Hydration (`hydration`)**: Stages, merges, renders, post-processes and
//!   finally writes (or checks) the template output in the project directory.
//! - **Linking (`link`)**: Installs `cli` providers and links their
//!   resources into the project (`repolish link`).
//!
//! ## Execution Flow
//!
//! 1.  **Config**: [`config::load_config`] resolves provider locations.
//! 2.  **Orchestrate**: [`resolver::build_final_providers`] runs the four
//!     phases and overlays the project configuration.
//! 3.  **Hydrate**: [`hydration::prepare`] stages, preprocesses and renders.
//! 4.  **Apply / Check**: [`hydration::apply::execute`] writes the result, or
//!     [`hydration::check::execute`] reports the differences.

pub mod config;
pub mod context;
pub mod error;
pub mod filesystem;
pub mod hydration;
pub mod link;
pub mod merge;
pub mod output;
pub mod path;
pub mod phases;
pub mod provenance;
pub mod providers;
pub mod resolver;
pub mod suggestions;

#[cfg(test)]
mod path_proptest;
