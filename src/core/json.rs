//! Purpose: JSON views of dynamic values for diagnostics and test fixtures.
//! Exports: `to_json`, `from_json`.
//! Role: Feeds trace-level envelope logging and lets tests describe responses as JSON.
//! Invariants: `to_json` is lossy; `Int32`/`Float32` widen and `Binary` becomes a byte array.
use serde_json::{Map, Number, Value};

use crate::core::value::DynamicValue;

/// Renders a value as JSON. Binary becomes an array of byte numbers; non-finite floats become null.
pub fn to_json(value: &DynamicValue) -> Value {
    match value {
        DynamicValue::Null | DynamicValue::Invalid => Value::Null,
        DynamicValue::Bool(v) => Value::Bool(*v),
        DynamicValue::Int32(v) => Value::from(*v),
        DynamicValue::Int64(v) => Value::from(*v),
        DynamicValue::Float32(v) => float(f64::from(*v)),
        DynamicValue::Float64(v) => float(*v),
        DynamicValue::String(v) => Value::String(v.clone()),
        DynamicValue::Binary(v) => Value::Array(v.iter().map(|b| Value::from(*b)).collect()),
        DynamicValue::Array(items) => Value::Array(items.iter().map(to_json).collect()),
        DynamicValue::Object(entries) => {
            let mut map = Map::new();
            for (key, item) in entries {
                map.insert(key.clone(), to_json(item));
            }
            Value::Object(map)
        }
    }
}

/// Builds a value from JSON. Integers become `Int64`, other numbers `Float64`.
pub fn from_json(value: &Value) -> DynamicValue {
    match value {
        Value::Null => DynamicValue::Null,
        Value::Bool(v) => DynamicValue::Bool(*v),
        Value::Number(n) => match n.as_i64() {
            Some(v) => DynamicValue::Int64(v),
            None => DynamicValue::Float64(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(v) => DynamicValue::String(v.clone()),
        Value::Array(items) => DynamicValue::Array(items.iter().map(from_json).collect()),
        Value::Object(map) => DynamicValue::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), from_json(item)))
                .collect(),
        ),
    }
}

fn float(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}
