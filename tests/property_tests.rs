//! Property-based tests using proptest

#![allow(clippy::unwrap_used)]

use biwi::core::{decode_value, decode_varint, encode_value, encode_varint, encoded_len, varint_len};
use biwi::{FieldReader, FieldWriter, Message, Value};
use bytes::{Bytes, BytesMut};
use proptest::prelude::*;

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Boolean),
        any::<i32>().prop_map(Value::Int32),
        any::<i64>().prop_map(Value::Int64),
        (-1.0e6f32..1.0e6).prop_map(Value::Float32),
        (-1.0e12f64..1.0e12).prop_map(Value::Float64),
        ".{0,24}".prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..48).prop_map(|data| Value::Binary(Bytes::from(data))),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{0,8}", inner), 0..6)
                .prop_map(|pairs| pairs.into_iter().collect::<Value>()),
        ]
    })
}

/// Key sequences of every object in `value`, in visiting order.
fn object_key_orders(value: &Value, out: &mut Vec<Vec<String>>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| object_key_orders(item, out)),
        Value::Object(map) => {
            out.push(map.keys().cloned().collect());
            map.values().for_each(|item| object_key_orders(item, out));
        }
        _ => {}
    }
}

fn message_key_orders(message: &Message) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    for (_, value) in message {
        object_key_orders(value, &mut out);
    }
    out
}

fn message() -> impl Strategy<Value = Message> {
    prop::collection::vec((any::<u32>(), value()), 0..8)
        .prop_map(|fields| fields.into_iter().collect::<Message>())
}

proptest! {
    #[test]
    fn varint_roundtrip(n in any::<u64>()) {
        let mut writer = BytesMut::new();
        encode_varint(n, &mut writer);
        prop_assert_eq!(writer.len(), varint_len(n));
        prop_assert_eq!(decode_varint(&writer, 0).unwrap(), (n, writer.len()));
    }

    #[test]
    fn value_roundtrip(v in value()) {
        let mut writer = BytesMut::new();
        encode_value(&v, &mut writer).unwrap();
        prop_assert_eq!(writer.len(), encoded_len(&v).unwrap());

        let (decoded, consumed) = decode_value(&writer, 0).unwrap();
        prop_assert_eq!(consumed, writer.len());
        prop_assert_eq!(decoded, v);
    }

    #[test]
    fn message_roundtrip(m in message()) {
        let bytes = m.to_bytes().unwrap();
        prop_assert_eq!(bytes.len(), m.encoded_len().unwrap());
        let decoded = Message::from_bytes(&bytes).unwrap();
        prop_assert_eq!(&decoded, &m);
        // Object equality ignores key order, so check it separately.
        prop_assert_eq!(message_key_orders(&decoded), message_key_orders(&m));
    }

    #[test]
    fn reencode_is_idempotent(m in message()) {
        let bytes = m.to_bytes().unwrap();
        let again = Message::from_bytes(&bytes).unwrap().to_bytes().unwrap();
        prop_assert_eq!(again, bytes);
    }

    #[test]
    fn dropping_last_byte_fails(m in message()) {
        let bytes = m.to_bytes().unwrap();
        if !bytes.is_empty() {
            prop_assert!(Message::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        }
    }

    #[test]
    fn streaming_matches_batch(m in message()) {
        let mut writer = FieldWriter::new();
        for (id, v) in &m {
            writer.write_field(*id, v).unwrap();
        }
        let bytes = writer.finish();
        prop_assert_eq!(&bytes, &m.to_bytes().unwrap());

        let ids: Vec<u32> = FieldReader::new(&bytes)
            .map(|field| field.map(|f| f.id))
            .collect::<Result<_, _>>()
            .unwrap();
        prop_assert_eq!(ids, m.field_ids());
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = Message::from_bytes(&bytes);
        let _ = decode_value(&bytes, 0);
        for field in FieldReader::new(&bytes) {
            if field.is_err() {
                break;
            }
        }
    }
}
