use crate::config::CodecConfig;
use crate::core::{encode_value_with, encode_varint, encoded_len_with, varint_len};
use crate::stream::FieldReader;
use crate::value::Value;
use crate::{DecodeError, Error, Result};
use bytes::{Bytes, BytesMut};
use indexmap::IndexMap;
use tracing::trace;

/// An ordered mapping from field id to [`Value`].
///
/// Fields are encoded in insertion order. Setting a field that already exists replaces its value
/// in place, keeping the original position; decoding keeps the order of the byte stream.
///
/// Equality is order-sensitive: two messages are equal when they hold the same fields with the
/// same values in the same order.
#[derive(Debug, Clone, Default)]
pub struct Message {
    fields: IndexMap<u32, Value>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: IndexMap::with_capacity(capacity),
        }
    }

    /// Sets a field, replacing any previous value without moving the field.
    pub fn set_field(&mut self, field_id: u32, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(field_id, value.into());
        self
    }

    pub fn get_field(&self, field_id: u32) -> Option<&Value> {
        self.fields.get(&field_id)
    }

    pub fn get_field_mut(&mut self, field_id: u32) -> Option<&mut Value> {
        self.fields.get_mut(&field_id)
    }

    pub fn has_field(&self, field_id: u32) -> bool {
        self.fields.contains_key(&field_id)
    }

    /// Removes a field; the remaining fields keep their relative order.
    pub fn remove_field(&mut self, field_id: u32) -> Option<Value> {
        self.fields.shift_remove(&field_id)
    }

    /// Field ids in encoding order.
    pub fn field_ids(&self) -> Vec<u32> {
        self.fields.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, u32, Value> {
        self.fields.iter()
    }

    pub fn fields(&self) -> &IndexMap<u32, Value> {
        &self.fields
    }

    /// Exact size of [`Message::to_bytes`] output.
    ///
    /// # Errors
    /// `NestingTooDeep` if a field nests deeper than the default limit.
    pub fn encoded_len(&self) -> Result<usize> {
        self.encoded_len_with(&CodecConfig::default())
    }

    pub fn encoded_len_with(&self, config: &CodecConfig) -> Result<usize> {
        let mut len = 0;
        for (field_id, value) in &self.fields {
            len += varint_len(*field_id as u64) + encoded_len_with(value, config)?;
        }
        Ok(len)
    }

    /// Encodes the message with the default limits.
    ///
    /// The output is deterministic for a given insertion order, and decoding then re-encoding
    /// it yields identical bytes.
    pub fn to_bytes(&self) -> Result<Bytes> {
        self.to_bytes_with(&CodecConfig::default())
    }

    pub fn to_bytes_with(&self, config: &CodecConfig) -> Result<Bytes> {
        let mut writer = BytesMut::with_capacity(self.encoded_len_with(config)?);
        self.write_to(&mut writer, config)?;
        trace!(fields = self.len(), bytes = writer.len(), "encoded message");
        Ok(writer.freeze())
    }

    /// Appends `varint(field id)` + value for every field, in order.
    pub fn write_to(&self, writer: &mut BytesMut, config: &CodecConfig) -> Result<()> {
        for (field_id, value) in &self.fields {
            encode_varint(*field_id as u64, writer);
            encode_value_with(value, writer, config)?;
        }
        Ok(())
    }

    /// Decodes a whole buffer with the default limits.
    ///
    /// An empty buffer is an empty message.
    ///
    /// # Errors
    /// [`Error::MalformedMessage`] with the offset of the failing field. Nothing is returned
    /// for the fields decoded before the failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with(bytes, &CodecConfig::default())
    }

    pub fn from_bytes_with(bytes: &[u8], config: &CodecConfig) -> Result<Self> {
        if bytes.len() > config.max_message_size {
            return Err(Error::MalformedMessage {
                offset: 0,
                source: DecodeError::MessageTooLarge {
                    size: bytes.len(),
                    limit: config.max_message_size,
                },
            });
        }

        let mut reader = FieldReader::with_config(bytes, *config);
        let mut message = Message::new();
        while let Some(field) = reader.next_field()? {
            message.fields.insert(field.id, field.value);
        }
        trace!(fields = message.len(), bytes = bytes.len(), "decoded message");
        Ok(message)
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len() && self.fields.iter().eq(other.fields.iter())
    }
}

impl FromIterator<(u32, Value)> for Message {
    fn from_iter<I: IntoIterator<Item = (u32, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Extend<(u32, Value)> for Message {
    fn extend<I: IntoIterator<Item = (u32, Value)>>(&mut self, iter: I) {
        self.fields.extend(iter);
    }
}

impl IntoIterator for Message {
    type Item = (u32, Value);
    type IntoIter = indexmap::map::IntoIter<u32, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = (&'a u32, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, u32, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
