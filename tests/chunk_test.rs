use biwi::chunk::{read_chunks, split_chunks, write_chunks, MAX_CHUNK_DATA};
use biwi::{Chunk, ChunkAssembler, ChunkError, DecodeError, EncodeError, Error};
use bytes::{Bytes, BytesMut};

fn data(index: u16, bytes: &'static [u8]) -> Chunk {
    Chunk::Data {
        index,
        data: Bytes::from_static(bytes),
    }
}

#[test]
fn test_record_layout() {
    let records = write_chunks(&[
        Chunk::Start {
            field_id: 7,
            total_size: 300,
        },
        data(1, &[0xAA, 0xBB]),
        Chunk::End,
    ])
    .unwrap();
    assert_eq!(
        records.as_ref(),
        &[
            0x0A, 0x00, 0x07, 0x00, 0x00, 0x01, 0x2C, // start
            0x0B, 0x00, 0x01, 0x00, 0x02, 0xAA, 0xBB, // data
            0x0C, // end
        ]
    );
}

#[test]
fn test_decode_single_record() {
    let bytes = [0xFF, 0x0B, 0x00, 0x01, 0x00, 0x02, 0xAA, 0xBB];
    assert_eq!(
        Chunk::decode(&bytes, 1).unwrap(),
        (data(1, &[0xAA, 0xBB]), 7)
    );
    assert_eq!(Chunk::decode(&[0x0C], 0).unwrap(), (Chunk::End, 1));
}

#[test]
fn test_decode_errors() {
    assert_eq!(
        Chunk::decode(&[0x00], 0).unwrap_err(),
        DecodeError::UnknownTypeTag { tag: 0, offset: 0 }
    );
    assert_eq!(
        Chunk::decode(&[0x0A, 0x00, 0x07, 0x00], 0).unwrap_err(),
        DecodeError::BufferTooShort {
            offset: 3,
            needed: 4,
            remaining: 1
        }
    );
    assert_eq!(
        Chunk::decode(&[0x0B, 0x00, 0x00, 0x00, 0x03, 0x01], 0).unwrap_err(),
        DecodeError::BufferTooShort {
            offset: 5,
            needed: 3,
            remaining: 1
        }
    );
}

#[test]
fn test_split_and_reassemble() {
    let payload = b"hello world";
    let chunks = split_chunks(7, payload, 4).unwrap();
    assert_eq!(
        chunks,
        vec![
            Chunk::Start {
                field_id: 7,
                total_size: 11
            },
            data(0, b"hell"),
            data(1, b"o wo"),
            data(2, b"rld"),
            Chunk::End,
        ]
    );

    let wire = write_chunks(&chunks).unwrap();
    let decoded = read_chunks(&wire).unwrap();
    assert_eq!(decoded, chunks);

    let mut assembler = ChunkAssembler::new();
    let mut completed = None;
    for chunk in decoded {
        if let Some(done) = assembler.push(chunk).unwrap() {
            completed = Some(done);
        }
    }
    assert_eq!(completed, Some((7, Bytes::from_static(payload))));
    assert!(assembler.is_idle());
}

#[test]
fn test_empty_payload() {
    let chunks = split_chunks(3, &[], 16).unwrap();
    assert_eq!(
        chunks,
        vec![
            Chunk::Start {
                field_id: 3,
                total_size: 0
            },
            Chunk::End
        ]
    );

    let mut assembler = ChunkAssembler::new();
    assert_eq!(assembler.push(chunks[0].clone()).unwrap(), None);
    assert!(!assembler.is_idle());
    assert_eq!(
        assembler.push(Chunk::End).unwrap(),
        Some((3, Bytes::new()))
    );
}

#[test]
fn test_invalid_chunk_size() {
    assert_eq!(
        split_chunks(1, b"abc", 0).unwrap_err(),
        Error::Chunk(ChunkError::InvalidChunkSize {
            size: 0,
            max: MAX_CHUNK_DATA
        })
    );
    assert!(split_chunks(1, b"abc", MAX_CHUNK_DATA + 1).is_err());
}

#[test]
fn test_oversized_data_record_is_not_encoded() {
    let chunk = Chunk::Data {
        index: 0,
        data: Bytes::from(vec![0u8; MAX_CHUNK_DATA + 1]),
    };
    let mut writer = BytesMut::new();
    assert_eq!(
        chunk.encode(&mut writer).unwrap_err(),
        Error::Encode(EncodeError::LengthOverflow {
            what: "chunk data",
            len: MAX_CHUNK_DATA + 1,
            max: MAX_CHUNK_DATA
        })
    );
    assert!(writer.is_empty());
}

#[test]
fn test_assembler_rejects_data_before_start() {
    let mut assembler = ChunkAssembler::new();
    assert_eq!(
        assembler.push(data(0, b"x")).unwrap_err(),
        Error::Chunk(ChunkError::NotStarted)
    );
    assert_eq!(
        assembler.push(Chunk::End).unwrap_err(),
        Error::Chunk(ChunkError::NotStarted)
    );
}

#[test]
fn test_assembler_rejects_nested_start() {
    let mut assembler = ChunkAssembler::new();
    let start = Chunk::Start {
        field_id: 5,
        total_size: 2,
    };
    assembler.push(start.clone()).unwrap();
    assert_eq!(
        assembler.push(start.clone()).unwrap_err(),
        Error::Chunk(ChunkError::AlreadyStarted { field_id: 5 })
    );
    // The failed transfer is discarded, so a new one can begin.
    assert!(assembler.is_idle());
    assert!(assembler.push(start).is_ok());
}

#[test]
fn test_assembler_rejects_out_of_order() {
    let mut assembler = ChunkAssembler::new();
    assembler
        .push(Chunk::Start {
            field_id: 1,
            total_size: 4,
        })
        .unwrap();
    assembler.push(data(0, b"ab")).unwrap();
    assert_eq!(
        assembler.push(data(2, b"cd")).unwrap_err(),
        Error::Chunk(ChunkError::OutOfOrder {
            expected: 1,
            actual: 2
        })
    );
    assert!(assembler.is_idle());
}

#[test]
fn test_assembler_checks_declared_size() {
    let mut assembler = ChunkAssembler::new();
    assembler
        .push(Chunk::Start {
            field_id: 1,
            total_size: 3,
        })
        .unwrap();
    assert_eq!(
        assembler.push(data(0, b"abcd")).unwrap_err(),
        Error::Chunk(ChunkError::SizeOverflow {
            declared: 3,
            received: 4
        })
    );

    assembler
        .push(Chunk::Start {
            field_id: 1,
            total_size: 3,
        })
        .unwrap();
    assembler.push(data(0, b"ab")).unwrap();
    assert_eq!(
        assembler.push(Chunk::End).unwrap_err(),
        Error::Chunk(ChunkError::SizeMismatch {
            declared: 3,
            received: 2
        })
    );
    assert!(assembler.is_idle());
}

#[test]
fn test_assembler_reset() {
    let mut assembler = ChunkAssembler::new();
    assembler
        .push(Chunk::Start {
            field_id: 9,
            total_size: 10,
        })
        .unwrap();
    assembler.reset();
    assert!(assembler.is_idle());
}

#[test]
fn test_chunk_tags_are_not_values() {
    let wire = write_chunks(&[Chunk::End]).unwrap();
    assert!(biwi::core::decode_value(&wire, 0).is_err());
    assert!(read_chunks(&[0x02, 0x00, 0x00, 0x00, 0x01]).is_err());
}
