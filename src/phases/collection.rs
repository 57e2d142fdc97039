//! Phase 1: Context Collection
//!
//! Each provider, in order, produces its context from the context merged so
//! far. The raw return is kept as that provider's snapshot; the running
//! context takes every key it sets.

use log::{debug, warn};

use crate::context::{merge_into, Context};
use crate::error::{Error, Result};
use crate::providers::ProviderUnit;

/// Running merged context plus one snapshot per unit, index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collected {
    pub merged: Context,
    pub snapshots: Vec<Context>,
}

/// Execute Phase 1.
///
/// `base` seeds the merged context so providers see project values.
/// A provider returning no context is accepted with a deprecation warning
/// when `allow_none_context` is set and is a contract violation otherwise.
pub fn execute(units: &[ProviderUnit], base: &Context, allow_none_context: bool) -> Result<Collected> {
    let mut merged = base.clone();
    let mut snapshots = Vec::with_capacity(units.len());

    for unit in units {
        let snapshot = match unit.provider().create_context(&merged)? {
            Some(context) => context,
            None if allow_none_context => {
                warn!(
                    "Provider {} returned no context; returning an empty mapping is deprecated, return {{}} instead",
                    unit.id
                );
                Context::new()
            }
            None => {
                return Err(Error::ContractViolation {
                    provider: unit.id.clone(),
                    message: "create_context returned no context".to_string(),
                });
            }
        };
        debug!("Provider {} contributed {} context key(s)", unit.id, snapshot.len());
        merge_into(&mut merged, &snapshot);
        snapshots.push(snapshot);
    }

    Ok(Collected { merged, snapshots })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Callable, Namespace};
    use serde_json::{json, Value};

    fn unit(id: &str, arity: usize, f: fn(&[Value]) -> Value) -> ProviderUnit {
        let mut ns = Namespace::new();
        ns.insert_callable("create_context", Callable::new(arity, move |args| Ok(f(args))));
        ProviderUnit::module(id, ns).unwrap()
    }

    #[test]
    fn test_context_chain() {
        let units = vec![
            unit("a", 0, |_| json!({"a": 1})),
            unit("b", 1, |args| json!({"b": args[0]["a"].as_i64().unwrap() + 1})),
        ];
        let collected = execute(&units, &Context::new(), true).unwrap();
        assert_eq!(Value::Object(collected.merged), json!({"a": 1, "b": 2}));
        assert_eq!(Value::Object(collected.snapshots[1].clone()), json!({"b": 2}));
    }

    #[test]
    fn test_later_provider_overrides_and_base_is_visible() {
        let units = vec![
            unit("a", 1, |args| json!({"k": "a", "seen": args[0]["project"].clone()})),
            unit("b", 0, |_| json!({"k": "b"})),
        ];
        let base = json!({"project": "demo"}).as_object().cloned().unwrap();
        let collected = execute(&units, &base, true).unwrap();
        assert_eq!(collected.merged["k"], "b");
        assert_eq!(collected.merged["seen"], "demo");
        assert_eq!(collected.snapshots[0]["k"], "a");
    }

    #[test]
    fn test_none_context_is_deprecated_but_accepted() {
        testing_logger::setup();
        let units = vec![unit("legacy", 0, |_| Value::Null)];
        let collected = execute(&units, &Context::new(), true).unwrap();
        assert!(collected.snapshots[0].is_empty());
        testing_logger::validate(|logs| {
            assert!(logs
                .iter()
                .any(|l| l.level == log::Level::Warn && l.body.contains("deprecated")));
        });
    }

    #[test]
    fn test_none_context_rejected_without_compat_flag() {
        let units = vec![unit("legacy", 0, |_| Value::Null)];
        let err = execute(&units, &Context::new(), false).unwrap_err();
        assert!(matches!(err, Error::ContractViolation { .. }));
    }
}
