//! # Provider Units
//!
//! A provider unit is one source of contributions to a run: context
//! variables, anchor text, file mappings, deletions and create-only paths.
//! Units come in two flavours, resolved once at load time into
//! [`UnitKind`]:
//!
//! - **Structured** providers implement the [`Provider`] trait directly.
//! - **Module** providers are a loose [`Namespace`](module::Namespace) of
//!   attributes and callables (usually read from a `repolish.yaml`
//!   manifest) wrapped by [`ModuleProvider`](module::ModuleProvider), which
//!   itself implements [`Provider`].
//!
//! The orchestrator only ever talks to `&dyn Provider`; the module/structured
//! distinction survives solely for validation warnings and strict mode.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Context;
use crate::error::Result;
use crate::path::normalize_posix;

pub mod manifest;
pub mod module;
pub mod schema;
pub mod validation;

pub use module::{Callable, ModuleProvider, Namespace, Symbol};
pub use schema::{FieldKind, FieldSpec, InputsSchema};

/// How a mapped destination is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileMode {
    /// Always rendered and written
    #[default]
    Regular,
    /// Written only when the destination does not exist yet
    #[serde(alias = "create_only")]
    CreateOnly,
    /// The destination is marked for deletion
    Delete,
}

/// Structured source descriptor for one destination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub mode: FileMode,
    /// Context overlaid on the merged context when rendering this destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_context: Option<Context>,
    /// Id of the provider that declared the mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_provider: Option<String>,
}

impl TemplateMapping {
    pub fn marker(mode: FileMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// Where a destination's content comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceDescriptor {
    /// Template-relative source path, rendered in regular mode
    Path(String),
    Mapping(TemplateMapping),
}

impl SourceDescriptor {
    pub fn source(&self) -> Option<&str> {
        match self {
            SourceDescriptor::Path(path) => Some(path),
            SourceDescriptor::Mapping(mapping) => mapping.source.as_deref(),
        }
    }

    pub fn mode(&self) -> FileMode {
        match self {
            SourceDescriptor::Path(_) => FileMode::Regular,
            SourceDescriptor::Mapping(mapping) => mapping.mode,
        }
    }

    pub fn extra_context(&self) -> Option<&Context> {
        match self {
            SourceDescriptor::Path(_) => None,
            SourceDescriptor::Mapping(mapping) => mapping.extra_context.as_ref(),
        }
    }

    pub fn source_provider(&self) -> Option<&str> {
        match self {
            SourceDescriptor::Path(_) => None,
            SourceDescriptor::Mapping(mapping) => mapping.source_provider.as_deref(),
        }
    }

    /// Stamp the declaring provider onto structured descriptors that lack one.
    pub fn owned_by(self, provider_id: &str) -> Self {
        match self {
            SourceDescriptor::Mapping(mut mapping) => {
                if mapping.source_provider.is_none() {
                    mapping.source_provider = Some(provider_id.to_string());
                }
                SourceDescriptor::Mapping(mapping)
            }
            other => other,
        }
    }
}

/// Destination path to source descriptor; `None` opts the destination out.
pub type FileMappings = BTreeMap<String, Option<SourceDescriptor>>;

/// Anchor name to replacement text.
pub type Anchors = BTreeMap<String, String>;

/// `(provider id, context snapshot)` for every provider, in evaluation order.
pub type ProviderContexts = [(String, Context)];

/// Data sent from one provider to a later one during input routing.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Already conforms to the named inputs schema
    Typed { schema: String, data: Context },
    /// Unvalidated data, coerced against the recipient's schema
    Raw(Value),
}

impl Payload {
    /// View the payload as plain data for callers that do not care about
    /// its typing.
    pub fn to_value(&self) -> Value {
        match self {
            Payload::Typed { data, .. } => Value::Object(data.clone()),
            Payload::Raw(value) => value.clone(),
        }
    }
}

/// The structured provider interface.
///
/// Only [`create_context`](Provider::create_context) is required; every other
/// operation defaults to "no contribution".
pub trait Provider {
    /// Canonical name other providers use to address inputs to this one.
    fn provider_name(&self) -> Option<String> {
        None
    }

    /// Produce this provider's context. `merged` is the context accumulated
    /// from every earlier provider. `Ok(None)` is the deprecated empty return.
    fn create_context(&self, merged: &Context) -> Result<Option<Context>>;

    /// Schema this provider accepts inputs with; `None` accepts no input.
    fn inputs_schema(&self) -> Option<InputsSchema> {
        None
    }

    /// Produce payloads keyed by recipient name or provider id.
    fn collect_inputs(
        &self,
        _own: &Context,
        _all: &ProviderContexts,
        _index: usize,
    ) -> Result<BTreeMap<String, Payload>> {
        Ok(BTreeMap::new())
    }

    /// Recompute this provider's context from the inputs routed to it.
    fn finalize_context(
        &self,
        own: &Context,
        _inputs: &[Payload],
        _all: &ProviderContexts,
        _index: usize,
    ) -> Result<Context> {
        Ok(own.clone())
    }

    fn create_file_mappings(&self, _context: &Context) -> Result<FileMappings> {
        Ok(FileMappings::new())
    }

    fn create_anchors(&self, _context: &Context) -> Result<Anchors> {
        Ok(Anchors::new())
    }

    /// Raw delete entries; a leading `!` keeps a previously deleted path.
    fn delete_files(&self) -> Vec<String> {
        Vec::new()
    }

    /// Raw create-only entries; a leading `!` removes a path.
    fn create_only_files(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether templates from this provider render with its own context.
    fn migrated(&self) -> bool {
        false
    }
}

/// How a unit's capabilities were resolved at load time.
pub enum UnitKind {
    Structured(Box<dyn Provider>),
    Module(ModuleProvider),
}

impl fmt::Debug for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Structured(_) => f.write_str("Structured"),
            UnitKind::Module(module) => f.debug_tuple("Module").field(module).finish(),
        }
    }
}

/// One loaded provider, identified by its normalized location.
#[derive(Debug)]
pub struct ProviderUnit {
    pub id: String,
    pub kind: UnitKind,
}

impl ProviderUnit {
    pub fn structured(id: &str, provider: Box<dyn Provider>) -> Self {
        Self {
            id: normalize_posix(id),
            kind: UnitKind::Structured(provider),
        }
    }

    /// Resolve a module namespace into a unit, failing on bad signatures or
    /// attribute types.
    pub fn module(id: &str, namespace: Namespace) -> Result<Self> {
        let id = normalize_posix(id);
        let module = ModuleProvider::from_namespace(&id, namespace)?;
        Ok(Self {
            id,
            kind: UnitKind::Module(module),
        })
    }

    pub fn provider(&self) -> &dyn Provider {
        match &self.kind {
            UnitKind::Structured(provider) => provider.as_ref(),
            UnitKind::Module(module) => module,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self.kind, UnitKind::Structured(_))
    }

    /// Canonical recipient name, falling back to the id.
    pub fn name(&self) -> String {
        self.provider()
            .provider_name()
            .unwrap_or_else(|| self.id.clone())
    }
}
