//! Phase 3: Finalization
//!
//! Providers that received payloads validate them against their inputs
//! schema and recompute their context. The returned context replaces the
//! provider's snapshot; providers without queued payloads keep their
//! Phase 1 snapshot.

use log::{debug, warn};

use super::routing::Queued;
use crate::context::Context;
use crate::error::Result;
use crate::providers::{InputsSchema, Payload, ProviderContexts, ProviderUnit};

/// Execute Phase 3.
///
/// `schemas` and `snapshots` are index-aligned with `units`; `all` is the
/// Phase 1 list handed to every `finalize_context` call.
pub fn execute(
    units: &[ProviderUnit],
    schemas: &[Option<InputsSchema>],
    queued: &Queued,
    all: &ProviderContexts,
    snapshots: &mut [Context],
) -> Result<()> {
    for (index, unit) in units.iter().enumerate() {
        let Some(payloads) = queued.get(&unit.id) else {
            continue;
        };
        let Some(schema) = &schemas[index] else {
            warn!(
                "Provider {} received {} payload(s) but declares no inputs schema, dropping",
                unit.id,
                payloads.len()
            );
            continue;
        };

        let validated = payloads
            .iter()
            .map(|payload| schema.validate(payload))
            .collect::<Result<Vec<Payload>>>()?;

        debug!("Finalizing {} with {} input(s)", unit.id, validated.len());
        let finalized = unit
            .provider()
            .finalize_context(&snapshots[index], &validated, all, index)?;
        snapshots[index] = finalized;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::providers::{Callable, FieldKind, FieldSpec, Namespace};
    use serde_json::{json, Value};

    fn collector() -> ProviderUnit {
        let mut ns = Namespace::new();
        ns.insert_callable(
            "finalize_context",
            Callable::new(4, |args| {
                let mut own = args[0].clone();
                own["received"] = Value::Array(
                    args[1]
                        .as_array()
                        .into_iter()
                        .flatten()
                        .map(|p| p["tool"].clone())
                        .collect(),
                );
                own["index"] = args[3].clone();
                Ok(own)
            }),
        );
        ProviderUnit::module("collector", ns).unwrap()
    }

    fn schema() -> InputsSchema {
        InputsSchema::new("Tools", vec![FieldSpec::new("tool", FieldKind::String)])
    }

    #[test]
    fn test_finalize_replaces_snapshot() {
        let units = vec![collector()];
        let mut queued = Queued::new();
        queued.insert(
            "collector".to_string(),
            vec![Payload::Raw(json!({"tool": "ruff"})), Payload::Raw(json!({"tool": "mypy"}))],
        );
        let all = vec![("collector".to_string(), Context::new())];
        let mut snapshots = vec![json!({"keep": true}).as_object().cloned().unwrap()];

        execute(&units, &[Some(schema())], &queued, &all, &mut snapshots).unwrap();
        assert_eq!(
            Value::Object(snapshots[0].clone()),
            json!({"keep": true, "received": ["ruff", "mypy"], "index": 0})
        );
    }

    #[test]
    fn test_invalid_payload_fails() {
        let units = vec![collector()];
        let mut queued = Queued::new();
        queued.insert("collector".to_string(), vec![Payload::Raw(json!({"tool": 3}))]);
        let all = vec![("collector".to_string(), Context::new())];
        let mut snapshots = vec![Context::new()];

        let err = execute(&units, &[Some(schema())], &queued, &all, &mut snapshots).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_untouched_without_payloads_or_schema() {
        let units = vec![collector()];
        let all = vec![("collector".to_string(), Context::new())];
        let original = json!({"a": 1}).as_object().cloned().unwrap();

        let mut snapshots = vec![original.clone()];
        execute(&units, &[Some(schema())], &Queued::new(), &all, &mut snapshots).unwrap();
        assert_eq!(snapshots[0], original);

        let mut queued = Queued::new();
        queued.insert("collector".to_string(), vec![Payload::Raw(json!({"tool": "x"}))]);
        execute(&units, &[None], &queued, &all, &mut snapshots).unwrap();
        assert_eq!(snapshots[0], original);
    }
}
