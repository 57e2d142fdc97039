//! Module-style providers
//!
//! A module provider is a flat namespace of named symbols: plain values
//! (`context`, `anchors`, `file_mappings`, `delete_files`, ...) and callables
//! (`create_context`, `create_file_mappings`, ...). Capabilities are detected
//! once in [`ModuleProvider::from_namespace`] and frozen into closed enums;
//! after loading, nothing inspects the namespace again. Attribute values are
//! copied into the adapter, so later changes to the namespace are invisible.
//!
//! Recognised symbols:
//!
//! | symbol | kind | arity |
//! |---|---|---|
//! | `provider_name` / `get_provider_name` | string / callable | 0 |
//! | `provider_migrated` | boolean | |
//! | `context` / `create_context` | mapping / callable | 0 or 1 |
//! | `file_mappings` / `create_file_mappings` | mapping / callable | 0 or 1 |
//! | `anchors` / `create_anchors` | mapping / callable | 0 or 1 |
//! | `create_delete_files`, `create_create_only_files` | callable | 0 or 1 |
//! | `delete_files`, `create_only_files` | list | |
//! | `inputs_schema` / `get_inputs_schema` | mapping / callable | 0 |
//! | `collect_provider_inputs` | callable | 3 |
//! | `finalize_context` | callable | 4 |

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::{
    Anchors, FileMappings, FileMode, InputsSchema, Payload, Provider, ProviderContexts,
    SourceDescriptor, TemplateMapping,
};
use crate::context::{type_name, Context};
use crate::error::{Error, Result};

/// Native implementation of a module callable.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// A callable symbol with a declared arity.
#[derive(Clone)]
pub struct Callable {
    arity: usize,
    func: Arc<NativeFn>,
}

impl Callable {
    pub fn new<F>(arity: usize, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            arity,
            func: Arc::new(func),
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable(arity={})", self.arity)
    }
}

#[derive(Debug, Clone)]
pub enum Symbol {
    Value(Value),
    Callable(Callable),
}

/// Named symbols exposed by one module provider.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    symbols: BTreeMap<String, Symbol>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a namespace of plain values from a mapping.
    pub fn from_values(values: Context) -> Self {
        let symbols = values
            .into_iter()
            .map(|(name, value)| (name, Symbol::Value(value)))
            .collect();
        Self { symbols }
    }

    pub fn insert_value(&mut self, name: &str, value: Value) {
        self.symbols.insert(name.to_string(), Symbol::Value(value));
    }

    pub fn insert_callable(&mut self, name: &str, callable: Callable) {
        self.symbols
            .insert(name.to_string(), Symbol::Callable(callable));
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.symbols.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Resolved source of the provider context.
#[derive(Debug, Clone)]
enum ContextSource {
    Static(Context),
    Nullary(Callable),
    Unary(Callable),
    Absent,
}

/// Resolved source of a contribution that may depend on the context.
#[derive(Debug, Clone)]
enum Factory<T> {
    Static(T),
    Call { func: Callable, takes_context: bool },
    Absent,
}

type Convert<T> = fn(&str, &str, Value) -> Result<T>;

impl<T: Clone + Default> Factory<T> {
    fn produce(&self, provider: &str, operation: &str, context: &Context, convert: Convert<T>) -> Result<T> {
        match self {
            Factory::Static(value) => Ok(value.clone()),
            Factory::Call {
                func,
                takes_context,
            } => {
                let returned = if *takes_context {
                    func.call(&[Value::Object(context.clone())])?
                } else {
                    func.call(&[])?
                };
                convert(provider, operation, returned)
            }
            Factory::Absent => Ok(T::default()),
        }
    }
}

/// Adapter exposing a module namespace through the [`Provider`] trait.
#[derive(Debug, Clone)]
pub struct ModuleProvider {
    id: String,
    name: Option<String>,
    migrated: bool,
    context: ContextSource,
    file_mappings: Factory<FileMappings>,
    anchors: Factory<Anchors>,
    delete_factory: Factory<Vec<String>>,
    create_only_factory: Factory<Vec<String>>,
    delete_files: Vec<String>,
    create_only_files: Vec<String>,
    inputs_schema: Option<InputsSchema>,
    collect_inputs: Option<Callable>,
    finalize: Option<Callable>,
    /// `(name, is_callable)` for every exposed symbol
    symbols: Vec<(String, bool)>,
}

impl ModuleProvider {
    pub fn from_namespace(id: &str, namespace: Namespace) -> Result<Self> {
        let loader = Loader { id, ns: &namespace };

        let context = match loader.context_source()? {
            Factory::Static(ctx) => ContextSource::Static(ctx),
            Factory::Call {
                func,
                takes_context: false,
            } => ContextSource::Nullary(func),
            Factory::Call { func, .. } => ContextSource::Unary(func),
            Factory::Absent => ContextSource::Absent,
        };

        let provider = Self {
            id: id.to_string(),
            name: loader.provider_name()?,
            migrated: matches!(namespace.get("provider_migrated"), Some(Symbol::Value(Value::Bool(true)))),
            context,
            file_mappings: loader.factory("create_file_mappings", Some("file_mappings"), to_mappings)?,
            anchors: loader.factory("create_anchors", Some("anchors"), to_anchors)?,
            delete_factory: loader.factory("create_delete_files", None, to_list)?,
            create_only_factory: loader.factory("create_create_only_files", None, to_list)?,
            delete_files: loader.list_attribute("delete_files")?,
            create_only_files: loader.list_attribute("create_only_files")?,
            inputs_schema: loader.inputs_schema()?,
            collect_inputs: loader.fixed_arity("collect_provider_inputs", 3)?,
            finalize: loader.fixed_arity("finalize_context", 4)?,
            symbols: namespace
                .iter()
                .map(|(name, symbol)| (name.to_string(), matches!(symbol, Symbol::Callable(_))))
                .collect(),
        };
        Ok(provider)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn symbols(&self) -> &[(String, bool)] {
        &self.symbols
    }

    /// Whether the module exposes any file-mapping symbol.
    pub fn has_mapping_symbol(&self) -> bool {
        self.symbols
            .iter()
            .any(|(name, _)| name == "file_mappings" || name == "create_file_mappings")
    }
}

impl Provider for ModuleProvider {
    fn provider_name(&self) -> Option<String> {
        self.name.clone()
    }

    fn create_context(&self, merged: &Context) -> Result<Option<Context>> {
        let returned = match &self.context {
            ContextSource::Static(ctx) => return Ok(Some(ctx.clone())),
            ContextSource::Absent => return Ok(Some(Context::new())),
            ContextSource::Nullary(func) => func.call(&[])?,
            ContextSource::Unary(func) => func.call(&[Value::Object(merged.clone())])?,
        };
        to_context(&self.id, "create_context", returned)
    }

    fn inputs_schema(&self) -> Option<InputsSchema> {
        self.inputs_schema.clone()
    }

    fn collect_inputs(
        &self,
        own: &Context,
        all: &ProviderContexts,
        index: usize,
    ) -> Result<BTreeMap<String, Payload>> {
        let Some(func) = &self.collect_inputs else {
            return Ok(BTreeMap::new());
        };
        let returned = func.call(&[Value::Object(own.clone()), all_to_value(all), Value::from(index)])?;
        match returned {
            Value::Null => Ok(BTreeMap::new()),
            Value::Object(map) => Ok(map
                .into_iter()
                .map(|(recipient, payload)| (recipient, Payload::Raw(payload)))
                .collect()),
            other => Err(violation(
                &self.id,
                format!("collect_provider_inputs must return a mapping, found {}", type_name(&other)),
            )),
        }
    }

    fn finalize_context(
        &self,
        own: &Context,
        inputs: &[Payload],
        all: &ProviderContexts,
        index: usize,
    ) -> Result<Context> {
        let Some(func) = &self.finalize else {
            return Ok(own.clone());
        };
        let inputs = Value::Array(inputs.iter().map(Payload::to_value).collect());
        let returned = func.call(&[Value::Object(own.clone()), inputs, all_to_value(all), Value::from(index)])?;
        match returned {
            Value::Object(ctx) => Ok(ctx),
            other => Err(violation(
                &self.id,
                format!("finalize_context must return a mapping, found {}", type_name(&other)),
            )),
        }
    }

    /// Explicit mappings first, then legacy create-only and delete callables
    /// for destinations the explicit mappings did not claim.
    fn create_file_mappings(&self, context: &Context) -> Result<FileMappings> {
        let mut mappings =
            self.file_mappings
                .produce(&self.id, "create_file_mappings", context, to_mappings)?;

        let legacy = [
            (&self.create_only_factory, "create_create_only_files", FileMode::CreateOnly),
            (&self.delete_factory, "create_delete_files", FileMode::Delete),
        ];
        for (factory, operation, mode) in legacy {
            for dest in factory.produce(&self.id, operation, context, to_list)? {
                mappings
                    .entry(dest)
                    .or_insert_with(|| Some(SourceDescriptor::Mapping(TemplateMapping::marker(mode))));
            }
        }
        Ok(mappings)
    }

    fn create_anchors(&self, context: &Context) -> Result<Anchors> {
        self.anchors
            .produce(&self.id, "create_anchors", context, to_anchors)
    }

    fn delete_files(&self) -> Vec<String> {
        self.delete_files.clone()
    }

    fn create_only_files(&self) -> Vec<String> {
        self.create_only_files.clone()
    }

    fn migrated(&self) -> bool {
        self.migrated
    }
}

/// Load-time capability detection over one namespace.
struct Loader<'a> {
    id: &'a str,
    ns: &'a Namespace,
}

impl Loader<'_> {
    fn signature(&self, operation: &str, expected: &str, found: usize) -> Error {
        Error::Signature {
            provider: self.id.to_string(),
            operation: operation.to_string(),
            expected: expected.to_string(),
            found,
        }
    }

    fn context_source(&self) -> Result<Factory<Context>> {
        self.factory("create_context", Some("context"), to_static_context)
    }

    /// Resolve a function (preferred) or attribute into a factory.
    fn factory<T>(&self, function: &str, attribute: Option<&str>, convert: Convert<T>) -> Result<Factory<T>> {
        match self.ns.get(function) {
            Some(Symbol::Callable(func)) => {
                return match func.arity() {
                    0 | 1 => Ok(Factory::Call {
                        func: func.clone(),
                        takes_context: func.arity() == 1,
                    }),
                    found => Err(self.signature(function, "0 or 1", found)),
                };
            }
            Some(Symbol::Value(_)) => {
                return Err(violation(self.id, format!("{} must be callable", function)));
            }
            None => {}
        }

        let Some(attribute) = attribute else {
            return Ok(Factory::Absent);
        };
        match self.ns.get(attribute) {
            None | Some(Symbol::Value(Value::Null)) => Ok(Factory::Absent),
            Some(Symbol::Value(value)) => Ok(Factory::Static(convert(self.id, attribute, value.clone())?)),
            Some(Symbol::Callable(_)) => Err(violation(
                self.id,
                format!("{} must be a value, not a callable", attribute),
            )),
        }
    }

    fn fixed_arity(&self, function: &str, arity: usize) -> Result<Option<Callable>> {
        match self.ns.get(function) {
            None => Ok(None),
            Some(Symbol::Callable(func)) if func.arity() == arity => Ok(Some(func.clone())),
            Some(Symbol::Callable(func)) => Err(self.signature(function, &arity.to_string(), func.arity())),
            Some(Symbol::Value(_)) => Err(violation(self.id, format!("{} must be callable", function))),
        }
    }

    fn list_attribute(&self, attribute: &str) -> Result<Vec<String>> {
        match self.ns.get(attribute) {
            None => Ok(Vec::new()),
            Some(Symbol::Value(value)) => to_list(self.id, attribute, value.clone()),
            Some(Symbol::Callable(_)) => Err(violation(
                self.id,
                format!("{} must be a list, not a callable", attribute),
            )),
        }
    }

    fn provider_name(&self) -> Result<Option<String>> {
        let value = match (self.ns.get("get_provider_name"), self.ns.get("provider_name")) {
            (Some(Symbol::Callable(func)), _) => {
                if func.arity() != 0 {
                    return Err(self.signature("get_provider_name", "0", func.arity()));
                }
                func.call(&[])?
            }
            (_, Some(Symbol::Value(value))) => value.clone(),
            _ => return Ok(None),
        };
        match value {
            Value::Null => Ok(None),
            Value::String(name) => Ok(Some(name)),
            other => Err(violation(
                self.id,
                format!("provider name must be a string, found {}", type_name(&other)),
            )),
        }
    }

    fn inputs_schema(&self) -> Result<Option<InputsSchema>> {
        let value = match (self.ns.get("get_inputs_schema"), self.ns.get("inputs_schema")) {
            (Some(Symbol::Callable(func)), _) => {
                if func.arity() != 0 {
                    return Err(self.signature("get_inputs_schema", "0", func.arity()));
                }
                func.call(&[])?
            }
            (_, Some(Symbol::Value(value))) => value.clone(),
            _ => return Ok(None),
        };
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| violation(self.id, format!("invalid inputs schema: {}", e)))
    }
}

fn violation(provider: &str, message: String) -> Error {
    Error::ContractViolation {
        provider: provider.to_string(),
        message,
    }
}

fn all_to_value(all: &ProviderContexts) -> Value {
    Value::Array(
        all.iter()
            .map(|(pid, ctx)| Value::Array(vec![Value::String(pid.clone()), Value::Object(ctx.clone())]))
            .collect(),
    )
}

fn to_context(provider: &str, operation: &str, value: Value) -> Result<Option<Context>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(ctx) => Ok(Some(ctx)),
        other => Err(violation(
            provider,
            format!("{} must return a mapping, found {}", operation, type_name(&other)),
        )),
    }
}

fn to_static_context(provider: &str, attribute: &str, value: Value) -> Result<Context> {
    to_context(provider, attribute, value).map(Option::unwrap_or_default)
}

fn to_mappings(provider: &str, operation: &str, value: Value) -> Result<FileMappings> {
    match value {
        Value::Null => Ok(FileMappings::new()),
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| violation(provider, format!("{} returned invalid file mappings: {}", operation, e))),
        other => Err(violation(
            provider,
            format!("{} must be a mapping, found {}", operation, type_name(&other)),
        )),
    }
}

fn to_anchors(provider: &str, operation: &str, value: Value) -> Result<Anchors> {
    match value {
        Value::Null => Ok(Anchors::new()),
        Value::Object(map) => map
            .into_iter()
            .map(|(name, text)| match text {
                Value::String(text) => Ok((name, text)),
                other => Err(violation(
                    provider,
                    format!("{} value for '{}' must be a string, found {}", operation, name, type_name(&other)),
                )),
            })
            .collect(),
        other => Err(violation(
            provider,
            format!("{} must be a mapping, found {}", operation, type_name(&other)),
        )),
    }
}

fn to_list(provider: &str, operation: &str, value: Value) -> Result<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(path) => Ok(path),
                other => Err(violation(
                    provider,
                    format!("{} entries must be strings, found {}", operation, type_name(&other)),
                )),
            })
            .collect(),
        other => Err(violation(
            provider,
            format!("{} must be a list, found {}", operation, type_name(&other)),
        )),
    }
}
