//! # biwi
//!
//! A compact, self-describing binary wire format for Rust.
//!
//! - A [`Message`] maps small integer field ids to typed [`Value`]s and encodes them as
//!   `varint(field id)` followed by a one-byte type tag and its payload
//! - Fixed-width numbers are big-endian; lengths and counts are unsigned varints
//! - Arrays and objects nest to a configurable depth (64 by default)
//! - Streaming helpers ([`stream::FieldReader`], [`stream::FieldWriter`]) and chunk records
//!   ([`chunk::Chunk`]) for large payloads
//! - Derive macros mapping structs to messages
//!
//! ## Attribute Macros
//!
//! `#[derive(ToMessage, FromMessage)]` works on structs with named fields. Every field needs
//! an explicit wire id:
//!
//! - `#[biwi(id = N)]`: The field id written on the wire (`u32`). Ids must be unique per struct.
//! - `#[biwi(default)]`: If the field is missing during decoding, it is set to `Default::default()`.
//! - `#[biwi(skip)]`: The field is never written and always decodes to `Default::default()`.
//! - `#[biwi(skip_default)]`: The field is not written when it equals its default value; a
//!   missing field decodes to the default.
//!
//! `Option<T>` fields are omitted when `None`; a missing field or an explicit null decodes to `None`.
//!
//! ## Feature Flags
//!
//! - `derive` (default): Re-exports the `ToMessage` and `FromMessage` derive macros.
//! - `serde_json`: Conversions between [`Value`] and `serde_json::Value`.
//!
//! ## Example
//! ```rust
//! use biwi::{Message, Value};
//!
//! let mut message = Message::new();
//! message
//!     .set_field(1, Value::from("alice"))
//!     .set_field(4, Value::Boolean(true));
//!
//! let bytes = message.to_bytes().unwrap();
//! let decoded = Message::from_bytes(&bytes).unwrap();
//! assert_eq!(message, decoded);
//! ```

pub mod chunk;
pub mod config;
pub mod core;
#[cfg(feature = "serde_json")]
mod features;
pub mod message;
pub mod stream;
pub mod value;

use bytes::{Buf, Bytes, BytesMut};

#[cfg(feature = "derive")]
pub use biwi_derive::{FromMessage, ToMessage};
pub use chunk::{Chunk, ChunkAssembler, ChunkError};
pub use config::{CodecConfig, ConfigError};
pub use message::Message;
pub use stream::{Field, FieldReader, FieldWriter};
pub use value::{FromValue, ToValue, Value, ValueType};

/// Low-level failures while reading encoded bytes.
///
/// Every variant carries the absolute byte offset in the input at which the problem was found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The buffer ended before a varint's terminating byte.
    #[error("truncated varint at offset {offset}")]
    TruncatedVarint { offset: usize },
    /// A varint does not fit in 64 bits.
    #[error("varint overflow at offset {offset}")]
    VarintOverflow { offset: usize },
    /// A fixed-width or length-prefixed payload runs past the end of the buffer.
    #[error("buffer too short at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    BufferTooShort {
        offset: usize,
        needed: u64,
        remaining: usize,
    },
    /// The type tag is not one of the defined value tags.
    #[error("unknown type tag 0x{tag:02X} at offset {offset}")]
    UnknownTypeTag { tag: u8, offset: usize },
    /// String or object key bytes are not valid UTF-8.
    #[error("invalid UTF-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },
    /// Arrays/objects nest deeper than the configured limit.
    #[error("nesting deeper than {limit} levels at offset {offset}")]
    NestingTooDeep { offset: usize, limit: usize },
    /// A field id does not fit in `u32`.
    #[error("field id {field_id} at offset {offset} does not fit in u32")]
    FieldIdOutOfRange { field_id: u64, offset: usize },
    /// The input is larger than the configured maximum message size.
    #[error("message of {size} bytes exceeds the limit of {limit} bytes")]
    MessageTooLarge { size: usize, limit: usize },
}

impl DecodeError {
    /// Byte offset at which the error occurred.
    pub fn offset(&self) -> usize {
        match self {
            DecodeError::TruncatedVarint { offset }
            | DecodeError::VarintOverflow { offset }
            | DecodeError::BufferTooShort { offset, .. }
            | DecodeError::UnknownTypeTag { offset, .. }
            | DecodeError::InvalidUtf8 { offset }
            | DecodeError::NestingTooDeep { offset, .. }
            | DecodeError::FieldIdOutOfRange { offset, .. } => *offset,
            DecodeError::MessageTooLarge { .. } => 0,
        }
    }
}

/// Failures while producing encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The value nests deeper than the configured limit.
    #[error("value nests deeper than {limit} levels")]
    NestingTooDeep { limit: usize },
    /// A length does not fit the fixed-width field that carries it.
    #[error("{what} length {len} exceeds the maximum of {max}")]
    LengthOverflow {
        what: &'static str,
        len: usize,
        max: usize,
    },
}

/// Errors raised when mapping a [`Message`] onto a typed struct.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("Required field '{field}' not found for message {message}")]
    MissingRequiredField {
        field: &'static str,
        message: &'static str,
    },
    #[error("Field '{field}' expected {expected}, got {actual}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Errors that can occur anywhere in this crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A single value or record could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// A message failed to decode; `offset` is where the failing field started.
    #[error("malformed message at offset {offset}: {source}")]
    MalformedMessage {
        offset: usize,
        #[source]
        source: DecodeError,
    },
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Types that can write themselves in the BiWi wire format.
pub trait Encoder {
    /// Append the encoding of `self` to `writer`.
    fn encode(&self, writer: &mut BytesMut) -> Result<()>;
}

/// Types that can be read back from the BiWi wire format.
pub trait Decoder: Sized {
    /// Read a value from the front of `reader`, advancing it past the consumed bytes.
    fn decode(reader: &mut Bytes) -> Result<Self>;
}

impl Encoder for Value {
    fn encode(&self, writer: &mut BytesMut) -> Result<()> {
        core::encode_value(self, writer)
    }
}

/// Consumes exactly one value from the reader.
impl Decoder for Value {
    fn decode(reader: &mut Bytes) -> Result<Self> {
        let (value, consumed) = core::decode_value(reader.chunk(), 0)?;
        reader.advance(consumed);
        Ok(value)
    }
}

impl Encoder for Message {
    fn encode(&self, writer: &mut BytesMut) -> Result<()> {
        self.write_to(writer, &CodecConfig::default())
    }
}

/// Consumes the rest of the reader.
impl Decoder for Message {
    fn decode(reader: &mut Bytes) -> Result<Self> {
        let message = Message::from_bytes(reader.chunk())?;
        reader.advance(reader.remaining());
        Ok(message)
    }
}

/// Types that can be turned into a [`Message`].
///
/// Usually derived with `#[derive(ToMessage)]`.
pub trait ToMessage {
    fn to_message(&self) -> Message;
}

/// Types that can be built from a [`Message`].
///
/// Usually derived with `#[derive(FromMessage)]`.
pub trait FromMessage: Sized {
    fn from_message(message: &Message) -> Result<Self>;
}

/// Convenience function to encode a value or message to bytes.
///
/// # Example
/// ```rust
/// use biwi::{decode, encode, Value};
///
/// let value = Value::Array(vec![Value::Int32(1), Value::from("two")]);
/// let mut bytes = encode(&value).unwrap();
/// let decoded: Value = decode(&mut bytes).unwrap();
/// assert_eq!(value, decoded);
/// ```
pub fn encode<T: Encoder>(value: &T) -> Result<Bytes> {
    let mut writer = BytesMut::new();
    value.encode(&mut writer)?;
    Ok(writer.freeze())
}

/// Convenience function to decode a value or message from bytes.
pub fn decode<T: Decoder>(reader: &mut Bytes) -> Result<T> {
    T::decode(reader)
}

/// Encodes a typed struct through its [`ToMessage`] mapping.
pub fn to_bytes<T: ToMessage>(value: &T) -> Result<Bytes> {
    value.to_message().to_bytes()
}

/// Decodes a typed struct through its [`FromMessage`] mapping.
pub fn from_bytes<T: FromMessage>(bytes: &[u8]) -> Result<T> {
    let message = Message::from_bytes(bytes)?;
    T::from_message(&message)
}
