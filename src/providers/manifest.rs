//! Provider manifests
//!
//! A provider location on disk is a directory holding a `repolish.yaml`
//! manifest next to a `repolish/` template tree. The manifest is the
//! declarative form of a module provider: each top-level key becomes a
//! value symbol of the provider's [`Namespace`].
//!
//! ```yaml
//! provider_name: python
//! provider_migrated: true
//! context:
//!   python_version: "3.12"
//! anchors:
//!   readme-intro: "Managed by the python provider."
//! file_mappings:
//!   .github/workflows/ci.yml: ci/python.yml
//!   setup.cfg: null
//! delete_files:
//!   - setup.py
//! ```

use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde_json::Value;

use super::{Namespace, ProviderUnit};
use crate::context::type_name;
use crate::error::{Error, Result};
use crate::path::normalize_path;

/// Manifest file name inside a provider location.
pub const MANIFEST_FILE: &str = "repolish.yaml";

/// Template tree directory inside a provider location.
pub const TEMPLATE_DIR: &str = "repolish";

/// Read the manifest at `location`.
///
/// Returns `Ok(None)` when the location or its manifest does not exist; this
/// is an absence condition and only logged.
pub fn load_namespace(location: &Path) -> Result<Option<Namespace>> {
    if !location.is_dir() {
        warn!("Provider location {} does not exist, skipping", location.display());
        return Ok(None);
    }
    let manifest = location.join(MANIFEST_FILE);
    if !manifest.is_file() {
        warn!(
            "Provider location {} has no {}, skipping",
            location.display(),
            MANIFEST_FILE
        );
        return Ok(None);
    }

    let content = fs::read_to_string(&manifest)?;
    let value: Value = serde_yaml::from_str(&content).map_err(|e| Error::ConfigParse {
        message: format!("{}: {}", manifest.display(), e),
        hint: Some("Provider manifests must be a YAML mapping of symbol names".to_string()),
    })?;

    match value {
        Value::Null => Ok(Some(Namespace::new())),
        Value::Object(map) => {
            debug!("Loaded {} symbol(s) from {}", map.len(), manifest.display());
            Ok(Some(Namespace::from_values(map)))
        }
        other => Err(Error::ContractViolation {
            provider: normalize_path(location),
            message: format!("{} must be a mapping, found {}", MANIFEST_FILE, type_name(&other)),
        }),
    }
}

/// Load one provider unit, identified by its normalized location.
pub fn load_unit(location: &Path) -> Result<Option<ProviderUnit>> {
    let Some(namespace) = load_namespace(location)? else {
        return Ok(None);
    };
    ProviderUnit::module(&normalize_path(location), namespace).map(Some)
}

/// Load every resolvable location, preserving order.
pub fn load_units<P: AsRef<Path>>(locations: &[P]) -> Result<Vec<ProviderUnit>> {
    let mut units = Vec::with_capacity(locations.len());
    for location in locations {
        if let Some(unit) = load_unit(location.as_ref())? {
            units.push(unit);
        }
    }
    Ok(units)
}
