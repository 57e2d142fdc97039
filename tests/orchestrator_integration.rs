//! Integration tests for the provider orchestrator and config resolution
//!
//! These tests drive the public library API with both structured providers
//! and manifest-backed module providers loaded from disk.

use std::collections::BTreeMap;
use std::path::PathBuf;

use assert_fs::prelude::*;
use serde_json::{json, Value};

use repolish::config::{load_config, RepolishConfig};
use repolish::context::Context;
use repolish::error::{Error, Result};
use repolish::phases::{create_providers, Orchestrator, OrchestratorOptions};
use repolish::provenance::Action;
use repolish::providers::{
    FieldKind, FieldSpec, FileMode, InputsSchema, Payload, Provider, ProviderContexts, ProviderUnit,
    SourceDescriptor,
};
use repolish::resolver::{apply_config, build_final_providers};

fn ctx(value: Value) -> Context {
    value.as_object().cloned().unwrap()
}

fn run(units: Vec<ProviderUnit>) -> Result<repolish::phases::MergedResult> {
    Orchestrator::new(units, OrchestratorOptions::default()).run(&Context::new(), &Context::new())
}

struct Fixed(Value);

impl Provider for Fixed {
    fn create_context(&self, _merged: &Context) -> Result<Option<Context>> {
        Ok(Some(ctx(self.0.clone())))
    }
}

/// Computes `b` from the `a` contributed by an earlier provider.
struct Dependent;

impl Provider for Dependent {
    fn create_context(&self, merged: &Context) -> Result<Option<Context>> {
        let a = merged.get("a").and_then(Value::as_i64).unwrap_or_default();
        Ok(Some(ctx(json!({"b": a + 1}))))
    }
}

#[test]
fn test_context_chain() {
    let result = run(vec![
        ProviderUnit::structured("a", Box::new(Fixed(json!({"a": 1})))),
        ProviderUnit::structured("b", Box::new(Dependent)),
    ])
    .unwrap();
    assert_eq!(Value::Object(result.context), json!({"a": 1, "b": 2}));
}

struct Requester {
    targets: Vec<&'static str>,
}

impl Provider for Requester {
    fn create_context(&self, _merged: &Context) -> Result<Option<Context>> {
        Ok(Some(ctx(json!({"service": "api"}))))
    }

    fn collect_inputs(&self, own: &Context, _all: &ProviderContexts, index: usize) -> Result<BTreeMap<String, Payload>> {
        Ok(self
            .targets
            .iter()
            .map(|target| {
                (
                    target.to_string(),
                    Payload::Raw(json!({"service": own["service"], "port": format!("{}", 8000 + index)})),
                )
            })
            .collect())
    }
}

struct Deployer;

impl Provider for Deployer {
    fn provider_name(&self) -> Option<String> {
        Some("deploy".to_string())
    }

    fn create_context(&self, _merged: &Context) -> Result<Option<Context>> {
        Ok(Some(ctx(json!({"services": []}))))
    }

    fn inputs_schema(&self) -> Option<InputsSchema> {
        Some(InputsSchema::new(
            "DeployInput",
            vec![
                FieldSpec::new("service", FieldKind::String),
                FieldSpec::new("port", FieldKind::Integer),
                FieldSpec::new("replicas", FieldKind::Integer).with_default(json!(1)),
            ],
        ))
    }

    fn finalize_context(
        &self,
        _own: &Context,
        inputs: &[Payload],
        _all: &ProviderContexts,
        _index: usize,
    ) -> Result<Context> {
        let services: Vec<Value> = inputs.iter().map(Payload::to_value).collect();
        Ok(ctx(json!({"services": services})))
    }
}

#[test]
fn test_inputs_route_by_name_and_coerce() {
    let result = run(vec![
        ProviderUnit::structured("first", Box::new(Requester { targets: vec!["deploy", "ghost"] })),
        ProviderUnit::structured("second", Box::new(Requester { targets: vec!["deploy"] })),
        ProviderUnit::structured("providers/deploy", Box::new(Deployer)),
    ])
    .unwrap();

    assert_eq!(
        result.provider_contexts["providers/deploy"]["services"],
        json!([
            {"service": "api", "port": 8000, "replicas": 1},
            {"service": "api", "port": 8001, "replicas": 1},
        ])
    );
}

#[test]
fn test_inputs_address_provider_id() {
    let result = run(vec![
        ProviderUnit::structured("first", Box::new(Requester { targets: vec!["providers/deploy"] })),
        ProviderUnit::structured("providers/deploy", Box::new(Deployer)),
    ])
    .unwrap();
    assert_eq!(
        result.provider_contexts["providers/deploy"]["services"]
            .as_array()
            .map(Vec::len),
        Some(1)
    );
}

#[test]
fn test_nonconforming_payload_fails() {
    struct BadSender;
    impl Provider for BadSender {
        fn create_context(&self, _merged: &Context) -> Result<Option<Context>> {
            Ok(Some(Context::new()))
        }
        fn collect_inputs(&self, _own: &Context, _all: &ProviderContexts, _index: usize) -> Result<BTreeMap<String, Payload>> {
            let mut out = BTreeMap::new();
            out.insert("deploy".to_string(), Payload::Raw(json!({"port": "not a port"})));
            Ok(out)
        }
    }

    let err = run(vec![
        ProviderUnit::structured("bad", Box::new(BadSender)),
        ProviderUnit::structured("deploy", Box::new(Deployer)),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
}

fn manifest_provider(root: &assert_fs::TempDir, name: &str, manifest: &str) -> PathBuf {
    let location = root.child(name);
    location.child("repolish.yaml").write_str(manifest).unwrap();
    location.path().to_path_buf()
}

#[test]
fn test_manifest_contributions_merge_in_order() {
    let temp = assert_fs::TempDir::new().unwrap();
    let base = manifest_provider(
        &temp,
        "base",
        r#"
context: {license: MIT}
anchors: {header: "base header", footer: "base footer"}
file_mappings:
  setup.cfg: templates/setup.cfg
  README.md: docs/readme.md
  seed.toml: {source: seed/seed.toml, mode: create-only}
  legacy.txt: {mode: delete}
create_only_files: [.env]
"#,
    );
    let python = manifest_provider(
        &temp,
        "python",
        r#"
context: {license: Apache-2.0}
anchors: {header: "python header"}
file_mappings:
  setup.cfg: null
  README.md: {source: docs/python-readme.md, extra_context: {flavor: python}}
create_only_files: ["!.env"]
"#,
    );

    let result = create_providers(
        &[base.clone(), python.clone()],
        &Context::new(),
        &Context::new(),
        OrchestratorOptions::default(),
    )
    .unwrap();

    assert_eq!(result.context["license"], "Apache-2.0");
    assert_eq!(result.anchors["header"], "python header");
    assert_eq!(result.anchors["footer"], "base footer");

    assert!(!result.file_mappings.contains_key("setup.cfg"));
    let readme = &result.file_mappings["README.md"];
    assert_eq!(readme.source(), Some("docs/python-readme.md"));
    assert_eq!(readme.extra_context().unwrap()["flavor"], "python");
    assert_eq!(readme.source_provider(), Some(repolish::path::normalize_path(&python).as_str()));

    let seed = &result.file_mappings["seed.toml"];
    assert_eq!(seed.mode(), FileMode::CreateOnly);
    assert!(result.create_only_files.contains("seed.toml"));
    assert!(!result.create_only_files.contains(".env"));

    assert!(result.delete_files.contains("legacy.txt"));
    assert!(!result.file_mappings.contains_key("legacy.txt"));
    assert!(result.is_consistent());
}

#[test]
fn test_missing_location_contributes_nothing() {
    let temp = assert_fs::TempDir::new().unwrap();
    let base = manifest_provider(&temp, "base", "context: {a: 1}\n");
    let result = create_providers(
        &[base, temp.path().join("does-not-exist")],
        &Context::new(),
        &Context::new(),
        OrchestratorOptions::default(),
    )
    .unwrap();
    assert_eq!(result.provider_contexts.len(), 1);
    assert_eq!(result.context["a"], 1);
}

#[test]
fn test_config_negation_keeps_provider_deletion() {
    let temp = assert_fs::TempDir::new().unwrap();
    manifest_provider(&temp, "providers/base/templates", "delete_files: [x.txt, y.txt]\n");
    temp.child("repolish.yaml")
        .write_str("providers:\n  base: providers/base\nproviders_order: [base]\ndelete_files: [\"!x.txt\"]\n")
        .unwrap();

    let config = load_config(&temp.path().join("repolish.yaml")).unwrap();
    let result = build_final_providers(&config, OrchestratorOptions::default()).unwrap();

    assert!(!result.delete_files.contains("x.txt"));
    assert!(result.delete_files.contains("y.txt"));
    let history = &result.provenance["x.txt"];
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].action, Action::Delete);
    assert_eq!(history[1].action, Action::Keep);
    assert_eq!(history[1].source, repolish::path::normalize_path(temp.path()));
    assert!(result.is_consistent());
}

#[test]
fn test_config_anchor_and_context_win() {
    let units = vec![ProviderUnit::structured("a", Box::new(Fixed(json!({"name": "provider"}))))];
    let mut result = run(units).unwrap();

    let config = RepolishConfig {
        config_dir: PathBuf::from("project"),
        locations: Vec::new(),
        context: ctx(json!({"name": "project"})),
        context_overrides: Context::new(),
        anchors: [("intro".to_string(), "From config".to_string())].into_iter().collect(),
        delete_files: vec!["tmp/".to_string()],
        post_process: Vec::new(),
    };
    apply_config(&mut result, &config);

    assert_eq!(result.context["name"], "project");
    assert_eq!(result.anchors["intro"], "From config");
    assert!(result.delete_files.contains("tmp"));
    assert_eq!(result.provenance["tmp"][0].source, "project");
}

#[test]
fn test_mapping_descriptor_roundtrips_through_result_json() {
    let units = vec![ProviderUnit::structured("a", Box::new(Fixed(json!({}))))];
    let mut result = run(units).unwrap();
    result
        .file_mappings
        .insert("a.txt".to_string(), SourceDescriptor::Path("src/a.txt".to_string()));
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["file_mappings"]["a.txt"], "src/a.txt");
}
