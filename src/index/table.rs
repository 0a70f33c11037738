//! Index implementation
//!
//! HashMap from key to the log offset of its live record.

use std::collections::HashMap;

use crate::log::{Operation, Record};

/// In-memory key → offset map
///
/// Holds a key only while its most recent record is a `Put`. Not
/// internally locked; the engine guards it together with the log.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Index {
    offsets: HashMap<Vec<u8>, u64>,
}

impl Index {
    /// Create a new empty Index
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            offsets: HashMap::with_capacity(capacity),
        }
    }

    /// Offset of the live record for `key`
    pub fn get(&self, key: &[u8]) -> Option<u64> {
        self.offsets.get(key).copied()
    }

    /// Point `key` at `offset`, returning the previous offset
    pub fn insert(&mut self, key: Vec<u8>, offset: u64) -> Option<u64> {
        self.offsets.insert(key, offset)
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<u64> {
        self.offsets.remove(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.offsets.contains_key(key)
    }

    /// True when `offset` is where the current copy of `key` lives
    pub fn is_live(&self, key: &[u8], offset: u64) -> bool {
        self.get(key) == Some(offset)
    }

    /// Apply a record read from the log at `offset`
    pub fn apply(&mut self, offset: u64, record: Record) {
        match record.operation {
            Operation::Put => {
                self.offsets.insert(record.key, offset);
            }
            Operation::Delete => {
                self.offsets.remove(&record.key);
            }
        }
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Live keys in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.offsets.keys().map(|k| k.as_slice())
    }
}
