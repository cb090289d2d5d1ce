//! Incremental field-by-field encoding and decoding.
//!
//! [`FieldReader`] walks a buffer one field at a time without building a [`crate::Message`];
//! [`FieldWriter`] appends fields to a growing buffer. Both produce and accept exactly the
//! message wire format.

use crate::config::CodecConfig;
use crate::core::{encode_value_with, encode_varint, read_value, Reader};
use crate::value::Value;
use crate::{DecodeError, Error, Result};
use bytes::{Bytes, BytesMut};

/// A decoded `(field id, value)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub id: u32,
    pub value: Value,
}

/// Reads fields from a borrowed buffer one at a time.
///
/// After the first error the reader is exhausted: `next_field` keeps returning `Ok(None)` and
/// the iterator yields nothing more.
pub struct FieldReader<'a> {
    buffer: &'a [u8],
    offset: usize,
    config: CodecConfig,
    failed: bool,
}

impl<'a> FieldReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::with_config(buffer, CodecConfig::default())
    }

    pub fn with_config(buffer: &'a [u8], config: CodecConfig) -> Self {
        Self {
            buffer,
            offset: 0,
            config,
            failed: false,
        }
    }

    /// Decodes the next field, or returns `Ok(None)` at the end of the buffer.
    ///
    /// # Errors
    /// [`Error::MalformedMessage`] carrying the offset where the field started.
    pub fn next_field(&mut self) -> Result<Option<Field>> {
        if !self.has_more() {
            return Ok(None);
        }
        let start = self.offset;
        let mut reader = Reader::new(self.buffer, start);
        match read_field(&mut reader, start, self.config.depth_limit()) {
            Ok(field) => {
                self.offset = reader.offset();
                Ok(Some(field))
            }
            Err(source) => {
                self.failed = true;
                Err(Error::MalformedMessage {
                    offset: start,
                    source,
                })
            }
        }
    }

    pub fn has_more(&self) -> bool {
        !self.failed && self.offset < self.buffer.len()
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    /// Offset of the next field to decode.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

fn read_field(
    reader: &mut Reader<'_>,
    start: usize,
    limit: usize,
) -> std::result::Result<Field, DecodeError> {
    let raw_id = reader.read_varint()?;
    let id = u32::try_from(raw_id).map_err(|_| DecodeError::FieldIdOutOfRange {
        field_id: raw_id,
        offset: start,
    })?;
    let value = read_value(reader, 0, limit)?;
    Ok(Field { id, value })
}

impl Iterator for FieldReader<'_> {
    type Item = Result<Field>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_field().transpose()
    }
}

/// Appends fields to an owned buffer.
///
/// Writing the fields of a [`crate::Message`] one by one yields the same bytes as
/// [`crate::Message::to_bytes`].
#[derive(Debug, Clone, Default)]
pub struct FieldWriter {
    buffer: BytesMut,
    config: CodecConfig,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::with_capacity(128)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            config: CodecConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    /// Appends one field. On error the buffer is left as it was before the call.
    pub fn write_field(&mut self, field_id: u32, value: &Value) -> Result<&mut Self> {
        let mark = self.buffer.len();
        encode_varint(field_id as u64, &mut self.buffer);
        if let Err(err) = encode_value_with(value, &mut self.buffer, &self.config) {
            self.buffer.truncate(mark);
            return Err(err);
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Clears the buffer for reuse, keeping its allocation.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn finish(self) -> Bytes {
        self.buffer.freeze()
    }
}
