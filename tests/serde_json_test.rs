#![cfg(feature = "serde_json")]

use biwi::{Message, Value};
use serde_json::json;

#[test]
fn test_json_to_value() {
    let value = Value::from(json!({
        "name": "Ada",
        "small": 7,
        "big": 5_000_000_000i64,
        "ratio": 0.5,
        "flags": [true, false, null],
    }));

    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 5);
    assert_eq!(object["name"], Value::from("Ada"));
    assert_eq!(object["small"], Value::Int32(7));
    assert_eq!(object["big"], Value::Int64(5_000_000_000));
    assert_eq!(object["ratio"], Value::Float64(0.5));
    assert_eq!(
        object["flags"],
        Value::Array(vec![Value::Boolean(true), Value::Boolean(false), Value::Null])
    );
}

#[test]
fn test_value_to_json() {
    let value = Value::Array(vec![
        Value::Int64(-3),
        Value::Float32(1.5),
        Value::from(vec![1u8, 2]),
        Value::Float64(f64::NAN),
    ]);
    assert_eq!(serde_json::Value::from(&value), json!([-3, 1.5, [1, 2], null]));
}

#[test]
fn test_json_survives_wire_roundtrip() {
    let original = json!({"user": {"id": 12, "roles": ["admin", "dev"]}, "active": true});
    let mut message = Message::new();
    message.set_field(6, Value::from(original.clone()));

    let decoded = Message::from_bytes(&message.to_bytes().unwrap()).unwrap();
    let back = serde_json::Value::from(decoded.get_field(6).unwrap());
    assert_eq!(back, original);
}

#[test]
fn test_message_to_json() {
    let mut message = Message::new();
    message.set_field(1, "alice").set_field(4, true);
    assert_eq!(message.to_json(), json!({"1": "alice", "4": true}));
}
