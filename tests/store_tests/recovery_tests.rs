//! Crash recovery tests for the durable Store
//!
//! These tests verify:
//! - State survives close/reopen through WAL replay
//! - State survives through checkpoint + WAL replay combined
//! - Torn WAL tails are dropped on reopen
//! - Damaged checkpoints are refused
//! - Checkpoints replace the previous file and alone restore a truncated WAL

use std::fs::OpenOptions;
use std::io::Write;

use metaengine::backend::Backend;
use metaengine::{MetaError, Store};
use tempfile::TempDir;

#[test]
fn test_reopen_replays_wal() {
    let temp = TempDir::new().unwrap();

    {
        let store = Store::open_path(temp.path()).unwrap();
        store.incr(b"me:last_id").unwrap();
        store.incr(b"me:last_id").unwrap();
        store.set(b"me:rec:0", b"a").unwrap();
        store.sadd(b"me:fields", b"name").unwrap();
        store.sadd(b"me:fields", b"city").unwrap();
        store.srem(b"me:fields", b"city").unwrap();
        store.close().unwrap();
    }

    let store = Store::open_path(temp.path()).unwrap();
    assert_eq!(store.get(b"me:last_id").unwrap(), Some(b"2".to_vec()));
    assert_eq!(store.get(b"me:rec:0").unwrap(), Some(b"a".to_vec()));
    assert_eq!(store.smembers(b"me:fields").unwrap(), vec![b"name".to_vec()]);

    // Counter continues, never reissues
    assert_eq!(store.incr(b"me:last_id").unwrap(), 3);
}

#[test]
fn test_reopen_without_close() {
    let temp = TempDir::new().unwrap();

    {
        let store = Store::open_path(temp.path()).unwrap();
        store.set(b"k", b"v").unwrap();
        // dropped without close: buffered entries are flushed on drop
    }

    let store = Store::open_path(temp.path()).unwrap();
    assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_repeated_checkpoints_replace_file_in_place() {
    let temp = TempDir::new().unwrap();

    {
        let store = Store::open_path(temp.path()).unwrap();
        for round in 0..3u8 {
            store.incr(b"me:last_id").unwrap();
            store.set(format!("me:rec:{}", round).as_bytes(), &[round]).unwrap();
            store.checkpoint().unwrap();

            assert_eq!(store.wal_size(), 0);
            assert!(!temp.path().join("checkpoint.tmp").exists());
        }
        // dropped right after truncation: only the checkpoint holds the data
    }

    let store = Store::open_path(temp.path()).unwrap();
    assert_eq!(store.get(b"me:last_id").unwrap(), Some(b"3".to_vec()));
    assert_eq!(store.get(b"me:rec:2").unwrap(), Some(vec![2]));
    assert_eq!(store.incr(b"me:last_id").unwrap(), 4);
}

#[test]
fn test_checkpoint_then_wal() {
    let temp = TempDir::new().unwrap();

    {
        let store = Store::open_path(temp.path()).unwrap();
        store.set(b"before", b"1").unwrap();
        store.checkpoint().unwrap();
        store.set(b"after", b"2").unwrap();
        store.set(b"before", b"3").unwrap();
        store.close().unwrap();
    }

    let store = Store::open_path(temp.path()).unwrap();
    assert_eq!(store.get(b"before").unwrap(), Some(b"3".to_vec()));
    assert_eq!(store.get(b"after").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_torn_wal_tail_is_dropped() {
    let temp = TempDir::new().unwrap();

    {
        let store = Store::open_path(temp.path()).unwrap();
        store.set(b"k", b"v").unwrap();
        store.close().unwrap();
    }

    let mut wal = OpenOptions::new()
        .append(true)
        .open(temp.path().join("wal.log"))
        .unwrap();
    wal.write_all(&[0x42; 11]).unwrap();
    drop(wal);

    let store = Store::open_path(temp.path()).unwrap();
    assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
    store.set(b"k2", b"v2").unwrap();
    drop(store);

    let store = Store::open_path(temp.path()).unwrap();
    assert_eq!(store.get(b"k2").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn test_corrupt_checkpoint_is_refused() {
    let temp = TempDir::new().unwrap();

    {
        let store = Store::open_path(temp.path()).unwrap();
        store.set(b"k", b"v").unwrap();
        store.checkpoint().unwrap();
    }

    let path = temp.path().join("checkpoint.bin");
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();

    assert!(matches!(
        Store::open_path(temp.path()),
        Err(MetaError::Serialization(_))
    ));
}
