//! Engine Module
//!
//! The storage engine that ties the append log and the index together.
//!
//! ## Responsibilities
//! - Open the data directory and rebuild the index from the log
//! - Serve get/put/delete through the index
//! - Run merges that compact the log
//! - Guard log and index with one reader/writer lock

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{QuillError, Result};
use crate::index::{replay, Index};
use crate::log::{AppendLog, Operation, Record};
use crate::merge::{self, MergeStats};

/// The main storage engine
///
/// ## Concurrency Model: one reader/writer lock
///
/// - **Reads** (get/contains_key): shared lock, run in parallel. Log reads
///   are positional so readers never contend on a file cursor.
/// - **Writes** (put/delete/sync): exclusive lock. The append and the index
///   update happen under the same guard, so readers never observe one
///   without the other.
/// - **Merge**: exclusive lock for the whole scan, rewrite and swap. The
///   index used to classify records can not change underneath it.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Path of the active log
    log_path: PathBuf,

    /// Path of the temporary log written during a merge
    merge_path: PathBuf,

    /// Log and index, always locked together
    state: RwLock<EngineState>,
}

/// State guarded by the engine lock
pub(crate) struct EngineState {
    pub(crate) log: AppendLog,
    pub(crate) index: Index,
    /// Set when a merge failed after the swap began
    pub(crate) poisoned: bool,
}

impl EngineState {
    fn ensure_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(QuillError::Poisoned);
        }
        Ok(())
    }
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const LOG_FILENAME: &'static str = "quill.log";
    const MERGE_FILENAME: &'static str = "quill.log.merge";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory if needed
    /// 2. Remove a merge file left behind by a crash
    /// 3. Open the log
    /// 4. Replay the log into a fresh index
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let log_path = config.data_dir.join(Self::LOG_FILENAME);
        let merge_path = config.data_dir.join(Self::MERGE_FILENAME);

        // The rename is the commit point of a merge, so a merge file that
        // still exists never replaced the active log.
        if merge_path.exists() {
            warn!(path = %merge_path.display(), "removing stale merge file");
            fs::remove_file(&merge_path)?;
        }

        let mut log = AppendLog::open(&log_path, config.sync_strategy)?;
        let (index, report) = replay(&mut log, config.replay_policy)?;

        info!(
            path = %log_path.display(),
            records = report.records_replayed,
            live_keys = report.live_keys,
            truncated_bytes = report.truncated_bytes,
            "engine opened"
        );

        Ok(Self {
            config,
            log_path,
            merge_path,
            state: RwLock::new(EngineState {
                log,
                index,
                poisoned: false,
            }),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Get the value stored for `key`
    ///
    /// Fails with `KeyNotFound` when the key was never written or has been
    /// deleted.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        if !self.accept_key(key)? {
            return Err(QuillError::KeyNotFound);
        }

        let state = self.state.read();
        state.ensure_usable()?;

        let offset = state.index.get(key).ok_or(QuillError::KeyNotFound)?;
        let record = state.log.read_at(offset)?;

        if record.operation != Operation::Put {
            return Err(QuillError::Inconsistent(format!(
                "index points at a tombstone at offset {}",
                offset
            )));
        }
        if record.key != key {
            return Err(QuillError::Inconsistent(format!(
                "index entry at offset {} belongs to a different key",
                offset
            )));
        }

        Ok(record.value)
    }

    /// Whether `key` currently has a value (index only, no log read)
    pub fn contains_key(&self, key: &[u8]) -> Result<bool> {
        if !self.accept_key(key)? {
            return Ok(false);
        }

        let state = self.state.read();
        state.ensure_usable()?;
        Ok(state.index.contains_key(key))
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Acquire the write lock
    /// 2. Append a put record to the log
    /// 3. Point the index at the new record
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if !self.accept_key(key)? {
            return Ok(());
        }

        let record = Record::put(key, value);

        let mut state = self.state.write();
        state.ensure_usable()?;

        let offset = state.log.append(&record)?;
        state.index.insert(record.key, offset);

        Ok(())
    }

    /// Delete a key
    ///
    /// Deleting a key that has no value is a no-op and writes nothing.
    /// Otherwise a tombstone is appended and the key leaves the index.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        if !self.accept_key(key)? {
            return Ok(());
        }

        let mut state = self.state.write();
        state.ensure_usable()?;

        if !state.index.contains_key(key) {
            return Ok(());
        }

        state.log.append(&Record::delete(key))?;
        state.index.remove(key);

        Ok(())
    }

    /// Compact the log down to its live records
    ///
    /// Blocks all readers and writers while it runs. On failure before the
    /// new log replaces the old one, nothing visible changes.
    pub fn merge(&self) -> Result<MergeStats> {
        let mut state = self.state.write();
        state.ensure_usable()?;

        merge::run(
            &mut state,
            &self.log_path,
            &self.merge_path,
            self.config.merge_batch_size,
        )
    }

    /// Force the log to stable storage
    pub fn sync(&self) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_usable()?;
        state.log.sync()
    }

    /// Close the engine gracefully
    ///
    /// Syncs the log and releases its file handle. Dropping the engine
    /// without calling this also releases the handle, only without the
    /// final sync.
    pub fn close(self) -> Result<()> {
        let state = self.state.into_inner();
        debug!(path = %self.log_path.display(), "closing engine");
        state.log.close()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the active log path
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Number of live keys
    pub fn key_count(&self) -> usize {
        self.state.read().index.len()
    }

    /// Current size of the log in bytes
    pub fn log_size(&self) -> u64 {
        self.state.read().log.tail()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Ok(false) means "ignore this call"
    fn accept_key(&self, key: &[u8]) -> Result<bool> {
        if !key.is_empty() {
            return Ok(true);
        }
        if self.config.reject_empty_keys {
            return Err(QuillError::EmptyKey);
        }
        Ok(false)
    }
}
