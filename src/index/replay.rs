//! Log Replay
//!
//! Rebuilds the index by reading the append log front to back.

use tracing::{debug, warn};

use crate::config::ReplayPolicy;
use crate::error::{QuillError, Result};
use crate::log::{AppendLog, Operation};

use super::Index;

/// Result of a replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Records read successfully
    pub records_replayed: u64,

    /// Of which were puts
    pub puts: u64,

    /// Of which were tombstones
    pub deletes: u64,

    /// Keys in the rebuilt index
    pub live_keys: usize,

    /// Bytes cut from the end of the log (TruncateTail only)
    pub truncated_bytes: u64,
}

impl ReplayReport {
    /// Whether the log was cut back to its last valid record
    pub fn was_truncated(&self) -> bool {
        self.truncated_bytes > 0
    }
}

/// Rebuild the index from `log`
///
/// Records are applied strictly in file order: a put points the key at
/// its offset, a delete removes the key. Reaching the tail ends the
/// replay. A short or corrupt record before the tail either fails the
/// replay (`Strict`) or cuts the log back to the last valid record
/// (`TruncateTail`). Other I/O errors always fail.
pub fn replay(log: &mut AppendLog, policy: ReplayPolicy) -> Result<(Index, ReplayReport)> {
    let mut index = Index::new();
    let mut report = ReplayReport::default();

    let mut scanner = log.scan()?;
    let mut failure = None;
    for item in scanner.by_ref() {
        match item {
            Ok((offset, record)) => {
                report.records_replayed += 1;
                match record.operation {
                    Operation::Put => report.puts += 1,
                    Operation::Delete => report.deletes += 1,
                }
                index.apply(offset, record);
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    let valid_len = scanner.position();
    drop(scanner);

    if let Some(err) = failure {
        let repairable = err.is_unexpected_eof() || matches!(err, QuillError::CorruptEntry(_));
        if policy == ReplayPolicy::Strict || !repairable {
            return Err(err);
        }

        let truncated = log.tail() - valid_len;
        warn!(
            path = %log.path().display(),
            valid_len,
            truncated,
            error = %err,
            "truncating unreadable log tail"
        );
        log.truncate(valid_len)?;
        report.truncated_bytes = truncated;
    }

    report.live_keys = index.len();
    debug!(
        records = report.records_replayed,
        live_keys = report.live_keys,
        "replay complete"
    );

    Ok((index, report))
}
