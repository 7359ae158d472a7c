//! Task schemas: the declared top-level shape of every structured task.
//!
//! `conform` is the last gate before a value leaves the generation layer:
//! required fields must be present with the right kind, optional ones are
//! defaulted. Field semantics (is this a real salary?) are not checked.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// Numeric strings ("85", " 12.5 ") are coerced.
    Number,
    StringList,
    ObjectList,
    Object,
}

impl FieldKind {
    fn empty_value(&self) -> Value {
        match self {
            FieldKind::String => Value::String(String::new()),
            FieldKind::Number => Value::from(0),
            FieldKind::StringList | FieldKind::ObjectList => Value::Array(Vec::new()),
            FieldKind::Object => Value::Object(Map::new()),
        }
    }

    /// Returns the value in this kind's shape, or `None` if it cannot be.
    fn coerce(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (FieldKind::String, v @ Value::String(_)) => Some(v),
            (FieldKind::Number, v @ Value::Number(_)) => Some(v),
            (FieldKind::Number, Value::String(s)) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Value::from)
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(|f| {
                        serde_json::Number::from_f64(f).map(Value::Number)
                    }))
            }
            (FieldKind::StringList, Value::Array(items)) => {
                // Keep the string items, drop anything else the model slipped in.
                Some(Value::Array(
                    items.into_iter().filter(Value::is_string).collect(),
                ))
            }
            (FieldKind::ObjectList, Value::Array(items)) => Some(Value::Array(
                items
                    .into_iter()
                    .filter(Value::is_object)
                    .map(drop_nulls)
                    .collect(),
            )),
            (FieldKind::Object, v @ Value::Object(_)) => Some(drop_nulls(v)),
            _ => None,
        }
    }
}

/// Removes `null` members from nested objects so the typed decode falls back
/// to field defaults instead of failing on them.
fn drop_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, drop_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(drop_nulls).collect()),
        other => other,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Agent-specific default for an optional field; the kind's empty value
    /// otherwise.
    pub default: Option<fn() -> Value>,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
        }
    }

    pub const fn optional_or(name: &'static str, kind: FieldKind, default: fn() -> Value) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: Some(default),
        }
    }

    fn default_value(&self) -> Value {
        match self.default {
            Some(make) => make(),
            None => self.kind.empty_value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("expected a JSON object at the top level")]
    NotAnObject,

    #[error("required field '{0}' is missing")]
    MissingField(&'static str),

    #[error("field '{field}' should be {expected:?}")]
    WrongType {
        field: &'static str,
        expected: FieldKind,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct TaskSchema {
    pub fields: &'static [FieldSpec],
}

impl TaskSchema {
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    #[cfg(test)]
    pub fn required_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }

    /// Maps `value` onto the schema. Undeclared keys are kept as they are.
    pub fn conform(&self, value: Value) -> Result<Map<String, Value>, SchemaError> {
        let Value::Object(mut map) = value else {
            return Err(SchemaError::NotAnObject);
        };

        for field in self.fields {
            let coerced = map
                .remove(field.name)
                .filter(|v| !v.is_null())
                .map(|v| field.kind.coerce(v));

            let value = match (coerced, field.required) {
                (Some(Some(v)), _) => v,
                (None, true) => return Err(SchemaError::MissingField(field.name)),
                (Some(None), true) => {
                    return Err(SchemaError::WrongType {
                        field: field.name,
                        expected: field.kind,
                    })
                }
                (_, false) => field.default_value(),
            };
            map.insert(field.name.to_string(), value);
        }

        Ok(map)
    }
}

/// Serde helper for numeric fields inside list items, which `conform` does
/// not look into: accepts numbers and numeric strings, anything else is 0.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}
