//! Inputs schemas
//!
//! A provider that wants to receive data from earlier providers declares an
//! [`InputsSchema`]. Payloads routed to it are validated here before
//! `finalize_context` sees them: payloads already typed with the same schema
//! pass through, everything else is coerced field by field.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::Payload;
use crate::context::{type_name, Context};
use crate::error::{Error, Result};

/// Expected type of one schema field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    List,
    Mapping,
    #[default]
    Any,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

fn default_required() -> bool {
    true
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputsSchema {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl InputsSchema {
    pub fn new(name: &str, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.to_string(),
            fields,
        }
    }

    /// Validate one payload, returning it typed with this schema.
    pub fn validate(&self, payload: &Payload) -> Result<Payload> {
        let data = match payload {
            Payload::Typed { schema, .. } if *schema == self.name => {
                return Ok(payload.clone());
            }
            Payload::Typed { data, .. } => data,
            Payload::Raw(Value::Object(data)) => data,
            Payload::Raw(other) => {
                return Err(self.error(format!(
                    "expected a mapping payload, found {}",
                    type_name(other)
                )));
            }
        };
        Ok(Payload::Typed {
            schema: self.name.clone(),
            data: self.coerce(data)?,
        })
    }

    fn coerce(&self, data: &Context) -> Result<Context> {
        let mut out = Context::new();
        for field in &self.fields {
            let value = match data.get(&field.name) {
                Some(Value::Null) | None => None,
                Some(value) => Some(value),
            };
            match (value, &field.default) {
                (Some(value), _) => {
                    let coerced = coerce_value(field.kind, value).ok_or_else(|| {
                        self.error(format!(
                            "field '{}' expects {:?}, found {}",
                            field.name,
                            field.kind,
                            type_name(value)
                        ))
                    })?;
                    out.insert(field.name.clone(), coerced);
                }
                (None, Some(default)) => {
                    out.insert(field.name.clone(), default.clone());
                }
                (None, None) if field.required => {
                    return Err(self.error(format!("missing required field '{}'", field.name)));
                }
                (None, None) => {}
            }
        }
        Ok(out)
    }

    fn error(&self, message: String) -> Error {
        Error::Validation {
            schema: self.name.clone(),
            message,
        }
    }
}

/// Lax coercion: numeric strings become numbers, boolean-like strings and
/// 0/1 become booleans, whole floats within the `i64` range become integers.
fn coerce_value(kind: FieldKind, value: &Value) -> Option<Value> {
    match (kind, value) {
        (FieldKind::Any, v) => Some(v.clone()),
        (FieldKind::String, Value::String(_)) => Some(value.clone()),
        (FieldKind::Integer, Value::Number(n)) => {
            if n.is_i64() || n.is_u64() {
                Some(value.clone())
            } else {
                // 2^63 is exact as f64; i64::MAX is not
                const BOUND: f64 = 9_223_372_036_854_775_808.0;
                let f = n.as_f64()?;
                let whole = f.fract() == 0.0 && (-BOUND..BOUND).contains(&f);
                whole.then(|| Value::from(f as i64))
            }
        }
        (FieldKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        (FieldKind::Number, Value::Number(_)) => Some(value.clone()),
        (FieldKind::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        (FieldKind::Boolean, Value::Bool(_)) => Some(value.clone()),
        (FieldKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        (FieldKind::Boolean, Value::Number(n)) => match n.as_i64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },
        (FieldKind::List, Value::Array(_)) => Some(value.clone()),
        (FieldKind::Mapping, Value::Object(_)) => Some(value.clone()),
        _ => None,
    }
}
