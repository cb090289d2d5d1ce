// --- serde_json::Value ---
//
// JSON has no binary type and a single number type, so the mapping is not lossless in either
// direction:
// - integers that fit in i32 become Int32, other i64 values Int64, everything else Float64
// - Binary becomes an array of byte values
// - non-finite floats become null

use crate::message::Message;
use crate::value::Value;
use serde_json::{Map, Number, Value as JsonValue};

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Boolean(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => Value::Int32(small),
                        Err(_) => Value::Int64(i),
                    }
                } else {
                    Value::Float64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, item)| (key, Value::from(item)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for JsonValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => JsonValue::Null,
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Int32(n) => JsonValue::Number(Number::from(*n)),
            Value::Int64(n) => JsonValue::Number(Number::from(*n)),
            Value::Float32(f) => float_to_json(*f as f64),
            Value::Float64(f) => float_to_json(*f),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Binary(data) => JsonValue::Array(
                data.iter()
                    .map(|byte| JsonValue::Number(Number::from(*byte)))
                    .collect(),
            ),
            Value::Array(items) => JsonValue::Array(items.iter().map(JsonValue::from).collect()),
            Value::Object(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), JsonValue::from(item)))
                    .collect::<Map<String, JsonValue>>(),
            ),
        }
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        JsonValue::from(&value)
    }
}

fn float_to_json(f: f64) -> JsonValue {
    Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number)
}

impl Message {
    /// Renders the message as a JSON object keyed by the decimal field id.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.iter()
                .map(|(field_id, value)| (field_id.to_string(), JsonValue::from(value)))
                .collect(),
        )
    }
}
