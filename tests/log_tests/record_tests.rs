//! Tests for record encoding and decoding
//!
//! These tests verify:
//! - Round trips for both operations, including empty keys and values
//! - The exact on-disk byte layout
//! - Rejection of short, oversized and malformed buffers

use quillkv::log::{Operation, Record, RecordHeader, HEADER_SIZE};
use quillkv::QuillError;

// =============================================================================
// Round-Trip Tests
// =============================================================================

#[test]
fn test_encode_decode_put() {
    let record = Record::put(b"hello".to_vec(), b"world".to_vec());

    let bytes = record.encode();
    let decoded = Record::decode(&bytes).unwrap();

    assert_eq!(decoded, record);
    assert_eq!(decoded.operation, Operation::Put);
}

#[test]
fn test_encode_decode_delete() {
    let record = Record::delete(b"gone".to_vec());

    let decoded = Record::decode(&record.encode()).unwrap();

    assert_eq!(decoded, record);
    assert!(decoded.is_tombstone());
    assert!(decoded.value.is_empty());
}

#[test]
fn test_encode_decode_empty_key_and_value() {
    for record in [
        Record::put(Vec::new(), b"value".to_vec()),
        Record::put(b"key".to_vec(), Vec::new()),
        Record::put(Vec::new(), Vec::new()),
        Record::delete(Vec::new()),
    ] {
        let decoded = Record::decode(&record.encode()).unwrap();
        assert_eq!(decoded, record);
    }
}

#[test]
fn test_encode_decode_binary_payload() {
    let key: Vec<u8> = (0..=255u8).collect();
    let value = vec![0u8; 64 * 1024];
    let record = Record::put(key, value);

    let decoded = Record::decode(&record.encode()).unwrap();

    assert_eq!(decoded, record);
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_encoded_layout_is_big_endian() {
    let record = Record::put(b"ab".to_vec(), b"xyz".to_vec());
    let bytes = record.encode();

    assert_eq!(
        &bytes[..],
        &[
            0, 0, 0, 2, // key length
            0, 0, 0, 3, // value length
            0, 0, // op = put
            b'a', b'b', b'x', b'y', b'z',
        ]
    );
}

#[test]
fn test_delete_tag_is_one() {
    let bytes = Record::delete(b"k".to_vec()).encode();

    assert_eq!(&bytes[8..10], &[0, 1]);
}

#[test]
fn test_encoded_len_matches_output() {
    let record = Record::put(b"key".to_vec(), b"some value".to_vec());

    assert_eq!(record.encoded_len(), (HEADER_SIZE + 3 + 10) as u64);
    assert_eq!(record.encode().len() as u64, record.encoded_len());
}

// =============================================================================
// Decode Error Tests
// =============================================================================

#[test]
fn test_decode_rejects_short_buffer() {
    let result = Record::decode(&[0, 0, 0, 1, 0]);

    assert!(matches!(result, Err(QuillError::CorruptEntry(_))));
}

#[test]
fn test_decode_rejects_truncated_payload() {
    let bytes = Record::put(b"key".to_vec(), b"value".to_vec()).encode();

    let result = Record::decode(&bytes[..bytes.len() - 1]);

    assert!(matches!(result, Err(QuillError::CorruptEntry(_))));
}

#[test]
fn test_decode_rejects_trailing_bytes() {
    let mut bytes = Record::put(b"key".to_vec(), b"value".to_vec()).encode().to_vec();
    bytes.push(0xFF);

    let result = Record::decode(&bytes);

    assert!(matches!(result, Err(QuillError::CorruptEntry(_))));
}

#[test]
fn test_decode_rejects_unknown_operation() {
    let mut bytes = Record::put(b"key".to_vec(), b"value".to_vec()).encode().to_vec();
    bytes[9] = 7;

    let result = Record::decode(&bytes);

    assert!(matches!(result, Err(QuillError::CorruptEntry(_))));
}

#[test]
fn test_decode_rejects_max_lengths_without_overflow() {
    let mut bytes = vec![0xFF; 8];
    bytes.extend_from_slice(&[0, 0]);
    bytes.extend_from_slice(b"tiny");

    let result = Record::decode(&bytes);

    assert!(matches!(result, Err(QuillError::CorruptEntry(_))));
}

// =============================================================================
// Header Tests
// =============================================================================

#[test]
fn test_header_decode() {
    let bytes = Record::put(b"four".to_vec(), b"sixsix".to_vec()).encode();

    let header = RecordHeader::decode(&bytes).unwrap();

    assert_eq!(header.key_len, 4);
    assert_eq!(header.value_len, 6);
    assert_eq!(header.operation, Operation::Put);
    assert_eq!(header.payload_len(), 10);
    assert_eq!(header.record_len(), 20);
}

#[test]
fn test_header_record_len_does_not_overflow() {
    let header = RecordHeader {
        key_len: u32::MAX,
        value_len: u32::MAX,
        operation: Operation::Put,
    };

    assert_eq!(header.record_len(), HEADER_SIZE as u64 + 2 * u32::MAX as u64);
}

#[test]
fn test_operation_tags() {
    assert_eq!(Operation::Put.tag(), 0);
    assert_eq!(Operation::Delete.tag(), 1);
    assert_eq!(Operation::from_tag(0).unwrap(), Operation::Put);
    assert_eq!(Operation::from_tag(1).unwrap(), Operation::Delete);
    assert!(Operation::from_tag(2).is_err());
}
