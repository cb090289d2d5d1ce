use biwi::core::{decode_varint, encode_varint, varint_len};
use biwi::DecodeError;
use bytes::BytesMut;

fn varint(value: u64) -> Vec<u8> {
    let mut writer = BytesMut::new();
    encode_varint(value, &mut writer);
    writer.to_vec()
}

#[test]
fn test_varint_boundaries() {
    assert_eq!(varint(0), vec![0x00]);
    assert_eq!(varint(1), vec![0x01]);
    assert_eq!(varint(127), vec![0x7F]);
    assert_eq!(varint(128), vec![0x80, 0x01]);
    assert_eq!(varint(300), vec![0xAC, 0x02]);
    assert_eq!(varint(16383), vec![0xFF, 0x7F]);
    assert_eq!(varint(16384), vec![0x80, 0x80, 0x01]);
}

#[test]
fn test_varint_max_lengths() {
    assert_eq!(varint(u32::MAX as u64), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    assert_eq!(varint(u64::MAX).len(), 10);
    assert_eq!(*varint(u64::MAX).last().unwrap(), 0x01);
}

#[test]
fn test_varint_len_matches_encoding() {
    for value in [
        0u64,
        1,
        127,
        128,
        16383,
        16384,
        2_097_151,
        2_097_152,
        u32::MAX as u64,
        1 << 56,
        u64::MAX,
    ] {
        assert_eq!(varint_len(value), varint(value).len(), "value {}", value);
    }
}

#[test]
fn test_varint_decode_roundtrip_and_consumed() {
    for value in [0u64, 127, 128, 300, 1 << 35, u64::MAX] {
        let bytes = varint(value);
        assert_eq!(decode_varint(&bytes, 0).unwrap(), (value, bytes.len()));
    }
}

#[test]
fn test_varint_decode_at_offset_ignores_trailing_bytes() {
    let bytes = [0xAA, 0xAC, 0x02, 0x55];
    assert_eq!(decode_varint(&bytes, 1).unwrap(), (300, 2));
}

#[test]
fn test_varint_truncated() {
    assert_eq!(
        decode_varint(&[], 0).unwrap_err(),
        DecodeError::TruncatedVarint { offset: 0 }
    );
    assert_eq!(
        decode_varint(&[0x80], 0).unwrap_err(),
        DecodeError::TruncatedVarint { offset: 0 }
    );
    assert_eq!(
        decode_varint(&[0x00, 0xFF, 0xFF], 1).unwrap_err(),
        DecodeError::TruncatedVarint { offset: 1 }
    );
}

#[test]
fn test_varint_overflow() {
    // Ten bytes that all carry the continuation bit.
    let endless = [0xFF; 11];
    assert_eq!(
        decode_varint(&endless, 0).unwrap_err(),
        DecodeError::VarintOverflow { offset: 0 }
    );

    // The tenth byte may only carry bit 63.
    let mut too_big = vec![0x80; 9];
    too_big.push(0x02);
    assert_eq!(
        decode_varint(&too_big, 0).unwrap_err(),
        DecodeError::VarintOverflow { offset: 0 }
    );

    let mut top_bit = vec![0x80; 9];
    top_bit.push(0x01);
    assert_eq!(decode_varint(&top_bit, 0).unwrap(), (1 << 63, 10));
}

#[test]
fn test_varint_non_minimal_encoding_is_accepted() {
    // 0x80 0x00 is a two-byte zero; the decoder does not insist on minimal form.
    assert_eq!(decode_varint(&[0x80, 0x00], 0).unwrap(), (0, 2));
}
