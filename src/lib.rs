//! # QuillKV
//!
//! An embedded, log-structured key-value store with:
//! - A single append-only log holding every write
//! - An in-memory index from key to log offset, rebuilt on open
//! - Online compaction (merge) that drops overwritten and deleted records
//! - Many concurrent readers, serialized writers
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! │              (one RwLock over log + index)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Append Log  │◄─replay──│    Index    │
//!   │  (on disk)  │          │ (key → off) │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │    Merge    │
//!   │ (compaction)│
//!   └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use quillkv::Engine;
//!
//! let engine = Engine::open_path(std::path::Path::new("./data"))?;
//! engine.put(b"hello", b"world")?;
//! assert_eq!(engine.get(b"hello")?, b"world".to_vec());
//! engine.delete(b"hello")?;
//! engine.merge()?;
//! engine.close()?;
//! # Ok::<(), quillkv::QuillError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod log;
pub mod index;
pub mod engine;
pub mod merge;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{QuillError, Result};
pub use config::{Config, ReplayPolicy, SyncStrategy};
pub use engine::Engine;
pub use merge::MergeStats;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of QuillKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
