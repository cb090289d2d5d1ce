use crate::config::CodecConfig;
use crate::value::Value;
use crate::{DecodeError, EncodeError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use indexmap::IndexMap;

/// Type tags used in the BiWi binary format.
///
/// Each encoded value starts with one of these bytes. Tags are stable and part of the wire format.
///
/// Booleans carry no payload: the tag is the whole encoding. `true` reuses the Boolean tag
/// (`0x01`) and `false` is the out-of-range byte `0xFF`, so both fit in a single byte.
pub const TAG_NULL: u8 = 0x00;
pub const TAG_TRUE: u8 = 0x01;
///< 4 bytes, big-endian two's complement
pub const TAG_INT32: u8 = 0x02;
///< 8 bytes, big-endian two's complement
pub const TAG_INT64: u8 = 0x03;
pub const TAG_FLOAT32: u8 = 0x04;
pub const TAG_FLOAT64: u8 = 0x05;
///< varint byte length + UTF-8
pub const TAG_STRING: u8 = 0x06;
///< varint byte length + raw bytes
pub const TAG_BINARY: u8 = 0x07;
///< varint count + values
pub const TAG_ARRAY: u8 = 0x08;
///< varint count + (varint key length, key, value) pairs
pub const TAG_OBJECT: u8 = 0x09;
///< Streaming records, see [`crate::chunk`]. Not values.
pub const TAG_CHUNK_START: u8 = 0x0A;
pub const TAG_CHUNK_DATA: u8 = 0x0B;
pub const TAG_CHUNK_END: u8 = 0x0C;
pub const TAG_FALSE: u8 = 0xFF;

/// Longest valid varint: 64 bits in 7-bit groups.
pub const MAX_VARINT_LEN: usize = 10;

/// Cap on the elements reserved up front for one array or object, whatever count it declares.
const MAX_PREALLOCATION: usize = 1024;

// --- varint ---

/// Writes `value` as an unsigned base-128 varint, low group first.
///
/// Every byte but the last has its high bit set. `0` is a single zero byte, `127` is `7F`,
/// `128` is `80 01`.
pub fn encode_varint(mut value: u64, writer: &mut BytesMut) {
    while value >= 0x80 {
        writer.put_u8((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    writer.put_u8(value as u8);
}

/// Number of bytes `encode_varint` writes for `value`.
#[inline]
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Reads a varint starting at `offset`, returning the value and the number of bytes consumed.
///
/// # Errors
/// `TruncatedVarint` if the buffer ends before the terminating byte, `VarintOverflow` if the
/// value does not fit in 64 bits.
pub fn decode_varint(
    buffer: &[u8],
    offset: usize,
) -> std::result::Result<(u64, usize), DecodeError> {
    let mut reader = Reader::new(buffer, offset);
    let value = reader.read_varint()?;
    Ok((value, reader.offset() - offset))
}

// --- reader ---

/// Cursor over a borrowed buffer that reports absolute offsets in its errors.
///
/// Every read checks the remaining length first; nothing indexes past the end.
pub(crate) struct Reader<'a> {
    base: usize,
    start_len: usize,
    rest: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buffer: &'a [u8], offset: usize) -> Self {
        let rest = buffer.get(offset..).unwrap_or(&[]);
        Self {
            base: offset,
            start_len: rest.len(),
            rest,
        }
    }

    #[inline]
    pub(crate) fn offset(&self) -> usize {
        self.base + (self.start_len - self.rest.len())
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.rest.remaining()
    }

    #[inline]
    fn ensure(&self, needed: u64) -> std::result::Result<(), DecodeError> {
        if (self.remaining() as u64) < needed {
            return Err(DecodeError::BufferTooShort {
                offset: self.offset(),
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> std::result::Result<u8, DecodeError> {
        self.ensure(1)?;
        Ok(self.rest.get_u8())
    }

    pub(crate) fn read_u16(&mut self) -> std::result::Result<u16, DecodeError> {
        self.ensure(2)?;
        Ok(self.rest.get_u16())
    }

    pub(crate) fn read_u32(&mut self) -> std::result::Result<u32, DecodeError> {
        self.ensure(4)?;
        Ok(self.rest.get_u32())
    }

    pub(crate) fn read_varint(&mut self) -> std::result::Result<u64, DecodeError> {
        let start = self.offset();
        let mut value = 0u64;
        for index in 0..MAX_VARINT_LEN {
            if !self.rest.has_remaining() {
                return Err(DecodeError::TruncatedVarint { offset: start });
            }
            let byte = self.rest.get_u8();
            let group = (byte & 0x7F) as u64;
            // The tenth byte may only contribute the top bit.
            if index == MAX_VARINT_LEN - 1 && group > 1 {
                return Err(DecodeError::VarintOverflow { offset: start });
            }
            value |= group << (7 * index);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::VarintOverflow { offset: start })
    }

    pub(crate) fn read_slice(&mut self, len: u64) -> std::result::Result<&'a [u8], DecodeError> {
        self.ensure(len)?;
        let rest: &'a [u8] = self.rest;
        let (head, tail) = rest.split_at(len as usize);
        self.rest = tail;
        Ok(head)
    }

    /// Reads a varint length followed by that many UTF-8 bytes.
    fn read_string(&mut self) -> std::result::Result<String, DecodeError> {
        let len = self.read_varint()?;
        let start = self.offset();
        let bytes = self.read_slice(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| DecodeError::InvalidUtf8 { offset: start })
    }

    /// Checks a declared element count against what the buffer could possibly hold.
    fn ensure_count(&self, count: u64, min_item_size: u64) -> std::result::Result<(), DecodeError> {
        self.ensure(count.saturating_mul(min_item_size))
    }
}

// --- value encoding ---

/// Encodes one value (tag + payload) with the default limits.
pub fn encode_value(value: &Value, writer: &mut BytesMut) -> Result<()> {
    encode_value_with(value, writer, &CodecConfig::default())
}

/// Encodes one value (tag + payload).
///
/// # Errors
/// `NestingTooDeep` if arrays/objects nest deeper than [`CodecConfig::depth_limit`]. Nothing
/// useful is left in `writer` on failure.
pub fn encode_value_with(value: &Value, writer: &mut BytesMut, config: &CodecConfig) -> Result<()> {
    write_value(value, writer, 0, config.depth_limit())?;
    Ok(())
}

fn write_value(
    value: &Value,
    writer: &mut BytesMut,
    depth: usize,
    limit: usize,
) -> std::result::Result<(), EncodeError> {
    match value {
        Value::Null => writer.put_u8(TAG_NULL),
        Value::Boolean(true) => writer.put_u8(TAG_TRUE),
        Value::Boolean(false) => writer.put_u8(TAG_FALSE),
        Value::Int32(n) => {
            writer.put_u8(TAG_INT32);
            writer.put_i32(*n);
        }
        Value::Int64(n) => {
            writer.put_u8(TAG_INT64);
            writer.put_i64(*n);
        }
        Value::Float32(f) => {
            writer.put_u8(TAG_FLOAT32);
            writer.put_f32(*f);
        }
        Value::Float64(f) => {
            writer.put_u8(TAG_FLOAT64);
            writer.put_f64(*f);
        }
        Value::String(s) => {
            writer.put_u8(TAG_STRING);
            write_bytes(s.as_bytes(), writer);
        }
        Value::Binary(data) => {
            writer.put_u8(TAG_BINARY);
            write_bytes(data, writer);
        }
        Value::Array(items) => {
            if depth >= limit {
                return Err(EncodeError::NestingTooDeep { limit });
            }
            writer.put_u8(TAG_ARRAY);
            encode_varint(items.len() as u64, writer);
            for item in items {
                write_value(item, writer, depth + 1, limit)?;
            }
        }
        Value::Object(map) => {
            if depth >= limit {
                return Err(EncodeError::NestingTooDeep { limit });
            }
            writer.put_u8(TAG_OBJECT);
            encode_varint(map.len() as u64, writer);
            for (key, item) in map {
                write_bytes(key.as_bytes(), writer);
                write_value(item, writer, depth + 1, limit)?;
            }
        }
    }
    Ok(())
}

#[inline]
fn write_bytes(bytes: &[u8], writer: &mut BytesMut) {
    encode_varint(bytes.len() as u64, writer);
    writer.put_slice(bytes);
}

/// Exact number of bytes `encode_value` writes for `value`.
///
/// # Errors
/// `NestingTooDeep` under the same rule as [`encode_value`]; measuring stops at the limit.
pub fn encoded_len(value: &Value) -> Result<usize> {
    encoded_len_with(value, &CodecConfig::default())
}

/// Exact number of bytes `encode_value_with` writes for `value` under `config`.
pub fn encoded_len_with(value: &Value, config: &CodecConfig) -> Result<usize> {
    Ok(measure(value, 0, config.depth_limit())?)
}

fn measure(value: &Value, depth: usize, limit: usize) -> std::result::Result<usize, EncodeError> {
    let payload = match value {
        Value::Null | Value::Boolean(_) => 0,
        Value::Int32(_) | Value::Float32(_) => 4,
        Value::Int64(_) | Value::Float64(_) => 8,
        Value::String(s) => prefixed_len(s.len()),
        Value::Binary(data) => prefixed_len(data.len()),
        Value::Array(items) => {
            if depth >= limit {
                return Err(EncodeError::NestingTooDeep { limit });
            }
            let mut len = varint_len(items.len() as u64);
            for item in items {
                len += measure(item, depth + 1, limit)?;
            }
            len
        }
        Value::Object(map) => {
            if depth >= limit {
                return Err(EncodeError::NestingTooDeep { limit });
            }
            let mut len = varint_len(map.len() as u64);
            for (key, item) in map {
                len += prefixed_len(key.len()) + measure(item, depth + 1, limit)?;
            }
            len
        }
    };
    Ok(1 + payload)
}

#[inline]
fn prefixed_len(len: usize) -> usize {
    varint_len(len as u64) + len
}

// --- value decoding ---

/// Decodes one value starting at `offset` with the default limits.
///
/// Returns the value and the number of bytes consumed (tag + payload).
///
/// # Example
/// ```rust
/// use biwi::core::decode_value;
/// use biwi::{DecodeError, Value};
///
/// assert_eq!(decode_value(&[0x01], 0).unwrap(), (Value::Boolean(true), 1));
/// assert_eq!(
///     decode_value(&[0x7E], 0).unwrap_err(),
///     DecodeError::UnknownTypeTag { tag: 0x7E, offset: 0 }
/// );
/// ```
pub fn decode_value(
    buffer: &[u8],
    offset: usize,
) -> std::result::Result<(Value, usize), DecodeError> {
    decode_value_with(buffer, offset, &CodecConfig::default())
}

/// Decodes one value starting at `offset` using the limits in `config`.
pub fn decode_value_with(
    buffer: &[u8],
    offset: usize,
    config: &CodecConfig,
) -> std::result::Result<(Value, usize), DecodeError> {
    let mut reader = Reader::new(buffer, offset);
    let value = read_value(&mut reader, 0, config.depth_limit())?;
    Ok((value, reader.offset() - offset))
}

pub(crate) fn read_value(
    reader: &mut Reader<'_>,
    depth: usize,
    limit: usize,
) -> std::result::Result<Value, DecodeError> {
    let tag_offset = reader.offset();
    let tag = reader.read_u8()?;
    match tag {
        TAG_NULL => Ok(Value::Null),
        TAG_TRUE => Ok(Value::Boolean(true)),
        TAG_FALSE => Ok(Value::Boolean(false)),
        TAG_INT32 => {
            reader.ensure(4)?;
            Ok(Value::Int32(reader.rest.get_i32()))
        }
        TAG_INT64 => {
            reader.ensure(8)?;
            Ok(Value::Int64(reader.rest.get_i64()))
        }
        TAG_FLOAT32 => {
            reader.ensure(4)?;
            Ok(Value::Float32(reader.rest.get_f32()))
        }
        TAG_FLOAT64 => {
            reader.ensure(8)?;
            Ok(Value::Float64(reader.rest.get_f64()))
        }
        TAG_STRING => Ok(Value::String(reader.read_string()?)),
        TAG_BINARY => {
            let len = reader.read_varint()?;
            let data = reader.read_slice(len)?;
            Ok(Value::Binary(Bytes::copy_from_slice(data)))
        }
        TAG_ARRAY => {
            if depth >= limit {
                return Err(DecodeError::NestingTooDeep {
                    offset: tag_offset,
                    limit,
                });
            }
            let count = reader.read_varint()?;
            // Every element is at least its tag byte.
            reader.ensure_count(count, 1)?;
            let mut items = Vec::with_capacity((count as usize).min(MAX_PREALLOCATION));
            for _ in 0..count {
                items.push(read_value(reader, depth + 1, limit)?);
            }
            Ok(Value::Array(items))
        }
        TAG_OBJECT => {
            if depth >= limit {
                return Err(DecodeError::NestingTooDeep {
                    offset: tag_offset,
                    limit,
                });
            }
            let count = reader.read_varint()?;
            // Key length byte plus value tag byte.
            reader.ensure_count(count, 2)?;
            let mut map = IndexMap::with_capacity((count as usize).min(MAX_PREALLOCATION));
            for _ in 0..count {
                let key = reader.read_string()?;
                let item = read_value(reader, depth + 1, limit)?;
                map.insert(key, item);
            }
            Ok(Value::Object(map))
        }
        other => Err(DecodeError::UnknownTypeTag {
            tag: other,
            offset: tag_offset,
        }),
    }
}
