//! Index Module
//!
//! In-memory map from each live key to the offset of its latest record.
//!
//! ## Responsibilities
//! - O(1) key → offset lookups for reads
//! - Track which log records are live (used by merge)
//! - Rebuild from the log on open
//!
//! The index is never persisted. It is derived from the log on every open
//! and thrown away on close.

mod replay;
mod table;

pub use replay::{replay, ReplayReport};
pub use table::Index;
