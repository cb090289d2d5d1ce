//! Chunk records for streaming a large field in pieces.
//!
//! A transfer is a `ChunkStart`, any number of `ChunkData` records with consecutive indices,
//! and a `ChunkEnd`:
//!
//! | Record     | Tag    | Payload                                        |
//! |------------|--------|------------------------------------------------|
//! | ChunkStart | `0x0A` | field id (u16 BE), total size (u32 BE)         |
//! | ChunkData  | `0x0B` | chunk index (u16 BE), length (u16 BE), data    |
//! | ChunkEnd   | `0x0C` | none                                           |
//!
//! Chunk records are not values: [`crate::core::decode_value`] rejects their tags. Delivery,
//! ordering and retransmission belong to the transport.

use crate::core::{Reader, TAG_CHUNK_DATA, TAG_CHUNK_END, TAG_CHUNK_START};
use crate::{DecodeError, EncodeError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

/// Largest payload of a single `ChunkData` record.
pub const MAX_CHUNK_DATA: usize = u16::MAX as usize;

/// Most `ChunkData` records one transfer can carry (indices `0..=u16::MAX`).
pub const MAX_CHUNKS: usize = u16::MAX as usize + 1;

/// Cap on the up-front allocation for a transfer, whatever size it declares.
const MAX_PREALLOCATION: usize = 64 * 1024;

/// A streaming chunk record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Start { field_id: u16, total_size: u32 },
    Data { index: u16, data: Bytes },
    End,
}

/// Errors raised while splitting or reassembling chunked payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("chunk size must be between 1 and {max}, got {size}")]
    InvalidChunkSize { size: usize, max: usize },
    #[error("payload of {size} bytes cannot be chunked")]
    PayloadTooLarge { size: usize },
    #[error("chunk record received before chunk start")]
    NotStarted,
    #[error("chunk start received while field {field_id} is still open")]
    AlreadyStarted { field_id: u16 },
    #[error("expected chunk {expected}, got {actual}")]
    OutOfOrder { expected: u32, actual: u16 },
    #[error("received {received} bytes, more than the declared {declared}")]
    SizeOverflow { declared: u32, received: usize },
    #[error("transfer ended with {received} of {declared} bytes")]
    SizeMismatch { declared: u32, received: usize },
}

impl Chunk {
    /// Appends the record to `writer`.
    ///
    /// # Errors
    /// `LengthOverflow` if a data record carries more than [`MAX_CHUNK_DATA`] bytes.
    pub fn encode(&self, writer: &mut BytesMut) -> Result<()> {
        match self {
            Chunk::Start {
                field_id,
                total_size,
            } => {
                writer.put_u8(TAG_CHUNK_START);
                writer.put_u16(*field_id);
                writer.put_u32(*total_size);
            }
            Chunk::Data { index, data } => {
                let len = u16::try_from(data.len()).map_err(|_| EncodeError::LengthOverflow {
                    what: "chunk data",
                    len: data.len(),
                    max: MAX_CHUNK_DATA,
                })?;
                writer.put_u8(TAG_CHUNK_DATA);
                writer.put_u16(*index);
                writer.put_u16(len);
                writer.put_slice(data);
            }
            Chunk::End => writer.put_u8(TAG_CHUNK_END),
        }
        Ok(())
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            Chunk::Start { .. } => 7,
            Chunk::Data { data, .. } => 5 + data.len(),
            Chunk::End => 1,
        }
    }

    /// Decodes one record at `offset`, returning it with the number of bytes consumed.
    pub fn decode(
        buffer: &[u8],
        offset: usize,
    ) -> std::result::Result<(Chunk, usize), DecodeError> {
        let mut reader = Reader::new(buffer, offset);
        let tag_offset = reader.offset();
        let chunk = match reader.read_u8()? {
            TAG_CHUNK_START => Chunk::Start {
                field_id: reader.read_u16()?,
                total_size: reader.read_u32()?,
            },
            TAG_CHUNK_DATA => {
                let index = reader.read_u16()?;
                let len = reader.read_u16()?;
                let data = reader.read_slice(len as u64)?;
                Chunk::Data {
                    index,
                    data: Bytes::copy_from_slice(data),
                }
            }
            TAG_CHUNK_END => Chunk::End,
            tag => {
                return Err(DecodeError::UnknownTypeTag {
                    tag,
                    offset: tag_offset,
                })
            }
        };
        Ok((chunk, reader.offset() - offset))
    }
}

/// Encodes a sequence of records back to back.
pub fn write_chunks(chunks: &[Chunk]) -> Result<Bytes> {
    let mut writer = BytesMut::with_capacity(chunks.iter().map(Chunk::encoded_len).sum());
    for chunk in chunks {
        chunk.encode(&mut writer)?;
    }
    Ok(writer.freeze())
}

/// Decodes every record in `buffer`.
pub fn read_chunks(buffer: &[u8]) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    let mut offset = 0;
    while offset < buffer.len() {
        let (chunk, consumed) = Chunk::decode(buffer, offset)?;
        offset += consumed;
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Splits `data` into a complete transfer: start, data records of at most `chunk_size` bytes,
/// end.
pub fn split_chunks(field_id: u16, data: &[u8], chunk_size: usize) -> Result<Vec<Chunk>> {
    if chunk_size == 0 || chunk_size > MAX_CHUNK_DATA {
        return Err(ChunkError::InvalidChunkSize {
            size: chunk_size,
            max: MAX_CHUNK_DATA,
        }
        .into());
    }
    let total_size =
        u32::try_from(data.len()).map_err(|_| ChunkError::PayloadTooLarge { size: data.len() })?;
    let count = data.len().div_ceil(chunk_size);
    if count > MAX_CHUNKS {
        return Err(ChunkError::PayloadTooLarge { size: data.len() }.into());
    }

    let payload = Bytes::copy_from_slice(data);
    let mut chunks = Vec::with_capacity(count + 2);
    chunks.push(Chunk::Start {
        field_id,
        total_size,
    });
    for index in 0..count {
        let start = index * chunk_size;
        let end = (start + chunk_size).min(payload.len());
        chunks.push(Chunk::Data {
            index: index as u16,
            data: payload.slice(start..end),
        });
    }
    chunks.push(Chunk::End);
    Ok(chunks)
}

#[derive(Debug)]
struct Transfer {
    field_id: u16,
    total_size: u32,
    next_index: u32,
    buffer: BytesMut,
}

/// Reassembles one transfer at a time from in-order chunk records.
///
/// Any error discards the transfer in progress.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    current: Option<Transfer>,
}

impl ChunkAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no transfer is in progress.
    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Feeds one record. Returns the field id and payload when a `ChunkEnd` completes a transfer.
    pub fn push(&mut self, chunk: Chunk) -> Result<Option<(u16, Bytes)>> {
        self.apply(chunk).map_err(|err| {
            debug!(error = %err, "discarding chunk transfer");
            self.current = None;
            err.into()
        })
    }

    fn apply(&mut self, chunk: Chunk) -> std::result::Result<Option<(u16, Bytes)>, ChunkError> {
        match chunk {
            Chunk::Start {
                field_id,
                total_size,
            } => {
                if let Some(open) = &self.current {
                    return Err(ChunkError::AlreadyStarted {
                        field_id: open.field_id,
                    });
                }
                debug!(field_id, total_size, "chunk transfer started");
                self.current = Some(Transfer {
                    field_id,
                    total_size,
                    next_index: 0,
                    buffer: BytesMut::with_capacity((total_size as usize).min(MAX_PREALLOCATION)),
                });
                Ok(None)
            }
            Chunk::Data { index, data } => {
                let transfer = self.current.as_mut().ok_or(ChunkError::NotStarted)?;
                if u32::from(index) != transfer.next_index {
                    return Err(ChunkError::OutOfOrder {
                        expected: transfer.next_index,
                        actual: index,
                    });
                }
                let received = transfer.buffer.len() + data.len();
                if received > transfer.total_size as usize {
                    return Err(ChunkError::SizeOverflow {
                        declared: transfer.total_size,
                        received,
                    });
                }
                transfer.buffer.put_slice(&data);
                transfer.next_index += 1;
                Ok(None)
            }
            Chunk::End => {
                let transfer = self.current.take().ok_or(ChunkError::NotStarted)?;
                if transfer.buffer.len() != transfer.total_size as usize {
                    return Err(ChunkError::SizeMismatch {
                        declared: transfer.total_size,
                        received: transfer.buffer.len(),
                    });
                }
                debug!(
                    field_id = transfer.field_id,
                    chunks = transfer.next_index,
                    "chunk transfer complete"
                );
                Ok(Some((transfer.field_id, transfer.buffer.freeze())))
            }
        }
    }
}
