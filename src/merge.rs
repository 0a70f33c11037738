//! Merge (compaction)
//!
//! Rewrites the live records of the active log into a fresh file and swaps
//! it in.
//!
//! ## Protocol
//! 1. Empty log: nothing to do
//! 2. Create `quill.log.merge`
//! 3. Scan the active log; a record at offset `o` is live iff the index
//!    maps its key to `o`
//! 4. Write live records in batches, in their original order, staging
//!    their new offsets in a fresh index
//! 5. fsync, rename over the active log, install the new log and index
//!
//! The caller holds the engine's exclusive lock throughout. Until the
//! rename succeeds the live log and index are untouched, and the
//! temporary file is removed on every exit path.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::config::SyncStrategy;
use crate::engine::EngineState;
use crate::error::{QuillError, Result};
use crate::index::Index;
use crate::log::{AppendLog, Record};

/// Summary of a completed merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Records read from the old log
    pub records_scanned: u64,

    /// Records written to the new log
    pub records_kept: u64,

    /// Log size before the merge
    pub bytes_before: u64,

    /// Log size after the merge
    pub bytes_after: u64,
}

impl MergeStats {
    pub fn bytes_reclaimed(&self) -> u64 {
        self.bytes_before - self.bytes_after
    }
}

/// Removes the temporary merge file unless the swap committed
struct MergeFileGuard<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> MergeFileGuard<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for MergeFileGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = fs::remove_file(self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove merge file");
            }
        }
    }
}

/// Run a merge over `state`. Called with the engine write lock held.
pub(crate) fn run(
    state: &mut EngineState,
    active_path: &Path,
    merge_path: &Path,
    batch_size: usize,
) -> Result<MergeStats> {
    let bytes_before = state.log.tail();
    if bytes_before == 0 {
        debug!("merge skipped: log is empty");
        return Ok(MergeStats::default());
    }

    let mut guard = MergeFileGuard::new(merge_path);

    let (mut merged, index, records_scanned) =
        rewrite_live(state, merge_path, batch_size).map_err(|e| QuillError::merge(e, false))?;

    // Commit point. If the rename fails the active file is still intact;
    // `merged` drops before `guard`, so the handle is closed before the
    // temporary file is removed.
    merged
        .persist_as(active_path)
        .map_err(|e| QuillError::merge(e, false))?;
    guard.disarm();

    let records_kept = index.len() as u64;
    let bytes_after = merged.tail();

    // The rewrite ran unsynced; writes to the installed log follow the
    // strategy the engine was configured with.
    merged.set_sync_strategy(state.log.sync_strategy());

    // Replacing the log drops, and so closes, the old handle.
    state.log = merged;
    state.index = index;

    let dir = match active_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    if let Err(e) = sync_dir(dir) {
        state.poisoned = true;
        error!(
            path = %active_path.display(),
            error = %e,
            "merge renamed the log but could not sync the directory; engine poisoned"
        );
        return Err(QuillError::merge(e.into(), true));
    }

    let stats = MergeStats {
        records_scanned,
        records_kept,
        bytes_before,
        bytes_after,
    };

    info!(
        records_scanned = stats.records_scanned,
        records_kept = stats.records_kept,
        bytes_before = stats.bytes_before,
        bytes_after = stats.bytes_after,
        "merge complete"
    );

    Ok(stats)
}

/// Copy live records into a new log at `merge_path`
///
/// Returns the synced new log, an index over it, and how many records
/// were scanned.
fn rewrite_live(
    state: &EngineState,
    merge_path: &Path,
    batch_size: usize,
) -> Result<(AppendLog, Index, u64)> {
    let mut merged = AppendLog::create(merge_path, SyncStrategy::Never)?;
    let mut index = Index::with_capacity(state.index.len());
    let mut batch = Vec::with_capacity(batch_size);
    let mut scanned = 0u64;

    for item in state.log.scan()? {
        let (offset, record) = item?;
        scanned += 1;

        if !state.index.is_live(&record.key, offset) {
            continue;
        }
        if record.is_tombstone() {
            return Err(QuillError::Inconsistent(format!(
                "index points at a tombstone at offset {}",
                offset
            )));
        }

        batch.push(record);
        if batch.len() >= batch_size {
            write_batch(&mut merged, &mut batch, &mut index)?;
        }
    }
    write_batch(&mut merged, &mut batch, &mut index)?;

    if index.len() != state.index.len() {
        return Err(QuillError::Inconsistent(format!(
            "merge found {} of {} live keys",
            index.len(),
            state.index.len()
        )));
    }

    merged.sync()?;
    Ok((merged, index, scanned))
}

fn write_batch(merged: &mut AppendLog, batch: &mut Vec<Record>, index: &mut Index) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }

    let offsets = merged.append_batch(batch)?;
    for (record, offset) in batch.drain(..).zip(offsets) {
        index.insert(record.key, offset);
    }
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
