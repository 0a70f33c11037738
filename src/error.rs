//! Error types for QuillKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using QuillError
pub type Result<T> = std::result::Result<T, QuillError>;

/// Unified error type for QuillKV operations
#[derive(Debug, Error)]
pub enum QuillError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt log entry: {0}")]
    CorruptEntry(String),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    #[error("Empty keys are not accepted")]
    EmptyKey,

    // -------------------------------------------------------------------------
    // Compaction Errors
    // -------------------------------------------------------------------------
    /// `fatal` is set when the failure happened after the merged log was
    /// renamed over the active one. The engine is poisoned in that case.
    #[error("Merge failed (fatal: {fatal}): {source}")]
    MergeFailure {
        #[source]
        source: Box<QuillError>,
        fatal: bool,
    },

    // -------------------------------------------------------------------------
    // Engine State Errors
    // -------------------------------------------------------------------------
    #[error("Index inconsistency: {0}")]
    Inconsistent(String),

    #[error("Engine is poisoned after a failed merge; reopen the data directory")]
    Poisoned,
}

impl QuillError {
    /// Wrap an error raised while compacting.
    pub(crate) fn merge(source: QuillError, fatal: bool) -> Self {
        QuillError::MergeFailure {
            source: Box::new(source),
            fatal,
        }
    }

    /// True for short reads, i.e. a record cut off by the end of the file.
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, QuillError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}
