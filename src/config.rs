//! Configuration for QuillKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a QuillKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── quill.log          (active append log)
    ///     └── quill.log.merge    (only while a merge is running)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Log Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the append log
    pub sync_strategy: SyncStrategy,

    /// What to do when replay hits a record it cannot read
    pub replay_policy: ReplayPolicy,

    // -------------------------------------------------------------------------
    // Merge Configuration
    // -------------------------------------------------------------------------
    /// Live records buffered per write during a merge
    pub merge_batch_size: usize,

    // -------------------------------------------------------------------------
    // API Behaviour
    // -------------------------------------------------------------------------
    /// Return `EmptyKey` for empty keys instead of treating them as no-ops
    pub reject_empty_keys: bool,
}

/// Append log sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced appends (balanced durability/performance)
    EveryNEntries { count: usize },

    /// Never fsync on the write path; only on `sync()`, `close()` and merge
    Never,
}

/// Replay behaviour for an unreadable record before the end of the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayPolicy {
    /// Fail the open and surface the error
    #[default]
    Strict,

    /// Keep everything up to the last valid record and cut the file there
    TruncateTail,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./quillkv_data"),
            sync_strategy: SyncStrategy::EveryNEntries { count: 100 },
            replay_policy: ReplayPolicy::Strict,
            merge_batch_size: 1000,
            reject_empty_keys: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the log sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the replay policy used at open
    pub fn replay_policy(mut self, policy: ReplayPolicy) -> Self {
        self.config.replay_policy = policy;
        self
    }

    /// Set the merge batch size (values below 1 are raised to 1)
    pub fn merge_batch_size(mut self, size: usize) -> Self {
        self.config.merge_batch_size = size.max(1);
        self
    }

    /// Reject empty keys with an error instead of ignoring them
    pub fn reject_empty_keys(mut self, reject: bool) -> Self {
        self.config.reject_empty_keys = reject;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
