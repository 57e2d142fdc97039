//! Context maps and override helpers
//!
//! A [`Context`] is the key/value data shared by providers and the render
//! step. Merging is shallow: a later key replaces an earlier one wholesale.

use log::warn;
use serde_json::{Map, Value};

/// Variable name to value mapping.
pub type Context = Map<String, Value>;

/// Overlay `other` onto `base`, replacing values key by key.
pub fn merge_into(base: &mut Context, other: &Context) {
    for (key, value) in other {
        base.insert(key.clone(), value.clone());
    }
}

/// Return a new context holding `base` overlaid with `other`.
pub fn merged(base: &Context, other: &Context) -> Context {
    let mut out = base.clone();
    merge_into(&mut out, other);
    out
}

/// Apply dot-notation overrides to `context` in place.
///
/// Keys may be flat (`"ci.matrix.0.python"`) or nested mappings, which are
/// flattened first (`{"ci": {"os": "linux"}}` becomes `"ci.os"`). Missing
/// intermediate mappings are created. List segments must be in-range integer
/// indices; invalid segments are logged and skipped.
pub fn apply_overrides(context: &mut Context, overrides: &Context) {
    let mut flattened = Vec::new();
    for (key, value) in overrides {
        flatten(key, value, &mut flattened);
    }

    for (path, value) in flattened {
        let parts: Vec<&str> = path.split('.').collect();
        apply_to_map(context, &parts, value);
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(nested) => {
            for (key, inner) in nested {
                let full = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&full, inner, out);
            }
        }
        other => out.push((prefix.to_string(), other.clone())),
    }
}

fn apply_to_map(map: &mut Map<String, Value>, parts: &[&str], value: Value) {
    let Some((key, rest)) = parts.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.insert((*key).to_string(), value);
        return;
    }
    let child = map
        .entry((*key).to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    apply_to_value(child, rest, value);
}

fn apply_to_value(target: &mut Value, parts: &[&str], value: Value) {
    match target {
        Value::Object(map) => apply_to_map(map, parts, value),
        Value::Array(items) => {
            let Some((key, rest)) = parts.split_first() else {
                return;
            };
            let index = match key.parse::<usize>() {
                Ok(index) => index,
                Err(_) => {
                    warn!("Context override: '{}' is not a valid list index", key);
                    return;
                }
            };
            let len = items.len();
            match items.get_mut(index) {
                Some(item) if rest.is_empty() => *item = value,
                Some(item) => apply_to_value(item, rest, value),
                None => warn!(
                    "Context override: index {} out of range for list of length {}",
                    index, len
                ),
            }
        }
        other => warn!(
            "Context override: cannot navigate into {} at '{}'",
            type_name(other),
            parts.join(".")
        ),
    }
}

/// Short JSON type name used in diagnostics.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Look up a dotted path (`"a.b.0"`) inside a context.
pub fn lookup<'a>(context: &'a Context, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = context.get(first)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
