//! Tests for rebuilding the Index from the log
//!
//! These tests verify:
//! - Replay of an empty log and of a clean log
//! - Order dependence (later records win, deletes remove)
//! - Strict policy surfaces torn and corrupt tails
//! - TruncateTail policy cuts the log back to the last valid record

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use quillkv::config::{ReplayPolicy, SyncStrategy};
use quillkv::index::replay;
use quillkv::log::{AppendLog, Record};
use quillkv::QuillError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("replay.log");
    (temp_dir, log_path)
}

/// Append records through AppendLog and return their offsets
fn write_records(path: &Path, records: &[Record]) -> Vec<u64> {
    let mut log = AppendLog::open(path, SyncStrategy::Never).unwrap();
    let offsets = records.iter().map(|r| log.append(r).unwrap()).collect();
    log.close().unwrap();
    offsets
}

/// Append raw bytes to the end of the file (for crafting torn tails)
fn append_raw(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

// =============================================================================
// Clean Log Tests
// =============================================================================

#[test]
fn test_replay_empty_log() {
    let (_temp, path) = setup_temp_log();
    let mut log = AppendLog::open(&path, SyncStrategy::Never).unwrap();

    let (index, report) = replay(&mut log, ReplayPolicy::Strict).unwrap();

    assert!(index.is_empty());
    assert_eq!(report.records_replayed, 0);
    assert!(!report.was_truncated());
}

#[test]
fn test_replay_latest_put_wins() {
    let (_temp, path) = setup_temp_log();
    let offsets = write_records(
        &path,
        &[
            Record::put(b"a".to_vec(), b"1".to_vec()),
            Record::put(b"b".to_vec(), b"1".to_vec()),
            Record::put(b"a".to_vec(), b"2".to_vec()),
        ],
    );

    let mut log = AppendLog::open(&path, SyncStrategy::Never).unwrap();
    let (index, report) = replay(&mut log, ReplayPolicy::Strict).unwrap();

    assert_eq!(index.get(b"a"), Some(offsets[2]));
    assert_eq!(index.get(b"b"), Some(offsets[1]));
    assert_eq!(report.records_replayed, 3);
    assert_eq!(report.puts, 3);
    assert_eq!(report.live_keys, 2);
}

#[test]
fn test_replay_delete_removes_key() {
    let (_temp, path) = setup_temp_log();
    write_records(
        &path,
        &[
            Record::put(b"a".to_vec(), b"1".to_vec()),
            Record::delete(b"a".to_vec()),
            Record::put(b"b".to_vec(), b"1".to_vec()),
        ],
    );

    let mut log = AppendLog::open(&path, SyncStrategy::Never).unwrap();
    let (index, report) = replay(&mut log, ReplayPolicy::Strict).unwrap();

    assert!(!index.contains_key(b"a"));
    assert!(index.contains_key(b"b"));
    assert_eq!(report.deletes, 1);
    assert_eq!(report.live_keys, 1);
}

#[test]
fn test_replay_put_after_delete_revives_key() {
    let (_temp, path) = setup_temp_log();
    let offsets = write_records(
        &path,
        &[
            Record::put(b"a".to_vec(), b"1".to_vec()),
            Record::delete(b"a".to_vec()),
            Record::put(b"a".to_vec(), b"3".to_vec()),
        ],
    );

    let mut log = AppendLog::open(&path, SyncStrategy::Never).unwrap();
    let (index, _) = replay(&mut log, ReplayPolicy::Strict).unwrap();

    assert_eq!(index.get(b"a"), Some(offsets[2]));
}

// =============================================================================
// Strict Policy Tests
// =============================================================================

#[test]
fn test_strict_fails_on_torn_tail() {
    let (_temp, path) = setup_temp_log();
    write_records(&path, &[Record::put(b"a".to_vec(), b"1".to_vec())]);
    append_raw(&path, &[0, 0, 0]);

    let mut log = AppendLog::open(&path, SyncStrategy::Never).unwrap();
    let err = replay(&mut log, ReplayPolicy::Strict).unwrap_err();

    assert!(err.is_unexpected_eof());
}

#[test]
fn test_strict_fails_on_corrupt_tag() {
    let (_temp, path) = setup_temp_log();
    write_records(&path, &[Record::put(b"a".to_vec(), b"1".to_vec())]);
    let mut bad = Record::put(b"b".to_vec(), b"2".to_vec()).encode().to_vec();
    bad[9] = 9;
    append_raw(&path, &bad);

    let mut log = AppendLog::open(&path, SyncStrategy::Never).unwrap();
    let result = replay(&mut log, ReplayPolicy::Strict);

    assert!(matches!(result, Err(QuillError::CorruptEntry(_))));
}

// =============================================================================
// TruncateTail Policy Tests
// =============================================================================

#[test]
fn test_truncate_tail_keeps_valid_prefix() {
    let (_temp, path) = setup_temp_log();
    let records = [
        Record::put(b"a".to_vec(), b"1".to_vec()),
        Record::put(b"b".to_vec(), b"2".to_vec()),
    ];
    write_records(&path, &records);
    let valid_len: u64 = records.iter().map(|r| r.encoded_len()).sum();

    // Half of a third record
    let partial = Record::put(b"c".to_vec(), b"3".to_vec()).encode();
    append_raw(&path, &partial[..partial.len() / 2]);

    let mut log = AppendLog::open(&path, SyncStrategy::Never).unwrap();
    let (index, report) = replay(&mut log, ReplayPolicy::TruncateTail).unwrap();

    assert_eq!(index.len(), 2);
    assert!(!index.contains_key(b"c"));
    assert_eq!(report.truncated_bytes, (partial.len() / 2) as u64);
    assert!(report.was_truncated());
    assert_eq!(log.tail(), valid_len);
    assert_eq!(fs::metadata(&path).unwrap().len(), valid_len);
}

#[test]
fn test_truncate_tail_on_corrupt_record() {
    let (_temp, path) = setup_temp_log();
    let good = Record::put(b"a".to_vec(), b"1".to_vec());
    write_records(&path, &[good.clone()]);
    let mut bad = Record::put(b"b".to_vec(), b"2".to_vec()).encode().to_vec();
    bad[8] = 0xFF;
    append_raw(&path, &bad);

    let mut log = AppendLog::open(&path, SyncStrategy::Never).unwrap();
    let (index, report) = replay(&mut log, ReplayPolicy::TruncateTail).unwrap();

    assert_eq!(index.len(), 1);
    assert_eq!(report.truncated_bytes, bad.len() as u64);
    assert_eq!(log.tail(), good.encoded_len());
}

#[test]
fn test_truncate_tail_clean_log_is_untouched() {
    let (_temp, path) = setup_temp_log();
    write_records(&path, &[Record::put(b"a".to_vec(), b"1".to_vec())]);
    let size = fs::metadata(&path).unwrap().len();

    let mut log = AppendLog::open(&path, SyncStrategy::Never).unwrap();
    let (_, report) = replay(&mut log, ReplayPolicy::TruncateTail).unwrap();

    assert!(!report.was_truncated());
    assert_eq!(fs::metadata(&path).unwrap().len(), size);
}
