//! Tests for WAL Entry serialization and deserialization
//!
//! These tests verify:
//! - Every operation type survives serialization
//! - CRC32 corruption detection
//! - Edge cases (truncation, malformed data, large values)

use metaengine::wal::{Operation, WalEntry, HEADER_SIZE};
use metaengine::MetaError;

fn set_op(key: &str, value: &str) -> Operation {
    Operation::Set {
        key: key.as_bytes().to_vec(),
        value: value.as_bytes().to_vec(),
    }
}

// =============================================================================
// Serialization Tests
// =============================================================================

#[test]
fn test_every_operation_survives_serialization() {
    let operations = vec![
        set_op("me:rec:0", "cells"),
        Operation::Incr {
            key: b"me:last_id".to_vec(),
        },
        Operation::SetAdd {
            key: b"me:fields".to_vec(),
            member: b"name".to_vec(),
        },
        Operation::SetRemove {
            key: b"me:idx:4:name:alice".to_vec(),
            member: b"0".to_vec(),
        },
    ];

    for (i, operation) in operations.into_iter().enumerate() {
        let entry = WalEntry::new(i as u64 + 1, operation);
        let bytes = entry.serialize().unwrap();
        assert_eq!(WalEntry::deserialize(&bytes).unwrap(), entry);
    }
}

#[test]
fn test_header_layout() {
    let entry = WalEntry::new(7, set_op("k", "v"));
    let bytes = entry.serialize().unwrap();

    let mut lsn = [0u8; 8];
    lsn.copy_from_slice(&bytes[0..8]);
    let mut len = [0u8; 4];
    len.copy_from_slice(&bytes[12..16]);

    assert_eq!(u64::from_le_bytes(lsn), 7);
    assert_eq!(u32::from_le_bytes(len) as usize, bytes.len() - HEADER_SIZE);
}

#[test]
fn test_empty_value() {
    let entry = WalEntry::new(101, set_op("key_with_empty_value", ""));

    let bytes = entry.serialize().unwrap();
    assert_eq!(WalEntry::deserialize(&bytes).unwrap(), entry);
}

// =============================================================================
// CRC Corruption Detection Tests
// =============================================================================

#[test]
fn test_crc_corruption_detected() {
    let mut bytes = WalEntry::new(1, set_op("key", "value")).serialize().unwrap();

    // Corrupt a byte in the body
    if let Some(byte) = bytes.last_mut() {
        *byte ^= 0xFF;
    }

    let result = WalEntry::deserialize(&bytes);
    assert!(matches!(result, Err(MetaError::WalCorruption(_))));
}

#[test]
fn test_crc_field_corruption_detected() {
    let mut bytes = WalEntry::new(1, set_op("key", "value")).serialize().unwrap();
    bytes[8] ^= 0xFF;

    assert!(matches!(
        WalEntry::deserialize(&bytes),
        Err(MetaError::WalCorruption(_))
    ));
}

#[test]
fn test_lsn_corruption_detected() {
    // The CRC covers the LSN, so a flipped LSN bit is caught too
    let mut bytes = WalEntry::new(1, set_op("key", "value")).serialize().unwrap();
    bytes[0] ^= 0x02;

    assert!(WalEntry::deserialize(&bytes).is_err());
}

// =============================================================================
// Edge Case Tests
// =============================================================================

#[test]
fn test_truncated_entry() {
    let bytes = WalEntry::new(1, Operation::Incr { key: b"key".to_vec() })
        .serialize()
        .unwrap();

    assert!(WalEntry::deserialize(&bytes[..HEADER_SIZE + 2]).is_err());
}

#[test]
fn test_header_too_small() {
    assert!(WalEntry::deserialize(&[0u8; 10]).is_err());
    assert!(WalEntry::deserialize(&[]).is_err());
}

#[test]
fn test_large_value() {
    let large_value = vec![0xAB; 1024 * 1024]; // 1 MB value
    let entry = WalEntry::new(
        999,
        Operation::Set {
            key: b"big_key".to_vec(),
            value: large_value.clone(),
        },
    );

    let recovered = WalEntry::deserialize(&entry.serialize().unwrap()).unwrap();

    match recovered.operation {
        Operation::Set { key, value } => {
            assert_eq!(key, b"big_key");
            assert_eq!(value, large_value);
        }
        other => panic!("Expected Set operation, got {:?}", other),
    }
}

#[test]
fn test_lsn_preserved() {
    for lsn in [0, 1, u64::MAX, 12345678901234] {
        let entry = WalEntry::new(lsn, Operation::Incr { key: b"key".to_vec() });
        let recovered = WalEntry::deserialize(&entry.serialize().unwrap()).unwrap();

        assert_eq!(recovered.lsn, lsn);
    }
}
