use crate::core::*;
use bytes::Bytes;
use indexmap::IndexMap;

/// A single typed value in a BiWi message.
///
/// The variant is chosen by the producer; the codec never guesses whether `42` is meant as an
/// integer or a float. Objects keep their keys in insertion order so that re-encoding a decoded
/// value is byte-identical.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Binary(Bytes),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

/// The type of a [`Value`] as identified by its wire tag.
///
/// `Boolean` owns two tags: [`TAG_TRUE`] and [`TAG_FALSE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Binary,
    Array,
    Object,
}

impl ValueType {
    /// Maps a tag byte to its type, or `None` for undefined tags.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            TAG_NULL => Some(ValueType::Null),
            TAG_TRUE | TAG_FALSE => Some(ValueType::Boolean),
            TAG_INT32 => Some(ValueType::Int32),
            TAG_INT64 => Some(ValueType::Int64),
            TAG_FLOAT32 => Some(ValueType::Float32),
            TAG_FLOAT64 => Some(ValueType::Float64),
            TAG_STRING => Some(ValueType::String),
            TAG_BINARY => Some(ValueType::Binary),
            TAG_ARRAY => Some(ValueType::Array),
            TAG_OBJECT => Some(ValueType::Object),
            _ => None,
        }
    }

    /// The primary tag of the type. For `Boolean` this is the `true` tag.
    pub fn tag(&self) -> u8 {
        match self {
            ValueType::Null => TAG_NULL,
            ValueType::Boolean => TAG_TRUE,
            ValueType::Int32 => TAG_INT32,
            ValueType::Int64 => TAG_INT64,
            ValueType::Float32 => TAG_FLOAT32,
            ValueType::Float64 => TAG_FLOAT64,
            ValueType::String => TAG_STRING,
            ValueType::Binary => TAG_BINARY,
            ValueType::Array => TAG_ARRAY,
            ValueType::Object => TAG_OBJECT,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Null => "NULL",
            ValueType::Boolean => "BOOLEAN",
            ValueType::Int32 => "INT32",
            ValueType::Int64 => "INT64",
            ValueType::Float32 => "FLOAT32",
            ValueType::Float64 => "FLOAT64",
            ValueType::String => "STRING",
            ValueType::Binary => "BINARY",
            ValueType::Array => "ARRAY",
            ValueType::Object => "OBJECT",
        }
    }

    /// Payload size in bytes after the tag, for types whose size does not depend on the value.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            ValueType::Null | ValueType::Boolean => Some(0),
            ValueType::Int32 | ValueType::Float32 => Some(4),
            ValueType::Int64 | ValueType::Float64 => Some(8),
            _ => None,
        }
    }

    pub fn is_fixed_size(&self) -> bool {
        self.fixed_size().is_some()
    }

    pub fn is_variable_size(&self) -> bool {
        !self.is_fixed_size()
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::Float32(_) => ValueType::Float32,
            Value::Float64(_) => ValueType::Float64,
            Value::String(_) => ValueType::String,
            Value::Binary(_) => ValueType::Binary,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float32(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Bytes> {
        match self {
            Value::Binary(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float32(f)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float64(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Bytes> for Value {
    fn from(data: Bytes) -> Self {
        Value::Binary(data)
    }
}

impl From<Vec<u8>> for Value {
    fn from(data: Vec<u8>) -> Self {
        Value::Binary(Bytes::from(data))
    }
}

impl From<&[u8]> for Value {
    fn from(data: &[u8]) -> Self {
        Value::Binary(Bytes::copy_from_slice(data))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Array(iter.into_iter().collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Value::Object(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Conversion of a Rust type into a [`Value`].
///
/// Used by `#[derive(ToMessage)]` for every encoded field. Binary payloads use [`Bytes`];
/// `Vec<T>` always maps to an array.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Strict conversion of a [`Value`] back into a Rust type.
///
/// No conversion crosses variants: an `Int32` never becomes an `i64` and vice versa.
pub trait FromValue: Sized {
    /// Name of the expected wire type, used in error messages.
    const TYPE_NAME: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_scalar_value {
    ($ty:ty, $variant:ident, $name:expr) => {
        impl ToValue for $ty {
            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }
        }

        impl FromValue for $ty {
            const TYPE_NAME: &'static str = $name;

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }
    };
}

impl_scalar_value!(bool, Boolean, "BOOLEAN");
impl_scalar_value!(i32, Int32, "INT32");
impl_scalar_value!(i64, Int64, "INT64");
impl_scalar_value!(f32, Float32, "FLOAT32");
impl_scalar_value!(f64, Float64, "FLOAT64");
impl_scalar_value!(String, String, "STRING");
impl_scalar_value!(Bytes, Binary, "BINARY");

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    const TYPE_NAME: &'static str = "ANY";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const TYPE_NAME: &'static str = "ARRAY";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_array()?.iter().map(T::from_value).collect()
    }
}

impl<T: ToValue> ToValue for IndexMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(key, value)| (key.clone(), value.to_value()))
                .collect(),
        )
    }
}

impl<T: FromValue> FromValue for IndexMap<String, T> {
    const TYPE_NAME: &'static str = "OBJECT";

    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_object()?
            .iter()
            .map(|(key, value)| T::from_value(value).map(|v| (key.clone(), v)))
            .collect()
    }
}
