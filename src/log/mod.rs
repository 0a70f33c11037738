//! Append Log Module
//!
//! The single on-disk log every write goes to.
//!
//! ## Responsibilities
//! - Encode/decode individual records
//! - Append records at a tracked tail offset
//! - Positional reads for point lookups
//! - Sequential scans for replay and merge
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ Record 1                                         │
//! │ ┌──────────┬──────────┬────────┬──────┬───────┐  │
//! │ │KeyLen (4)│ValLen (4)│ Op (2) │ Key  │ Value │  │
//! │ └──────────┴──────────┴────────┴──────┴───────┘  │
//! ├──────────────────────────────────────────────────┤
//! │ Record 2                                         │
//! │ ┌──────────┬──────────┬────────┬──────┬───────┐  │
//! │ │KeyLen (4)│ValLen (4)│ Op (2) │ Key  │ Value │  │
//! │ └──────────┴──────────┴────────┴──────┴───────┘  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! All integers are big-endian. Op is 0 for Put and 1 for Delete.
//! Deletes carry an empty value.

mod append_log;
mod record;
mod scanner;

use std::io;

use crate::error::QuillError;

pub use append_log::AppendLog;
pub use record::{Operation, Record, RecordHeader, HEADER_SIZE};
pub use scanner::LogScanner;

/// A read that ran into the end of the log
pub(crate) fn short_read(msg: String) -> QuillError {
    QuillError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, msg))
}
