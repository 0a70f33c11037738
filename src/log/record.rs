//! Log record definitions
//!
//! Defines a single logged operation and its fixed-header binary encoding.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{QuillError, Result};

/// Header size: KeyLen (4) + ValueLen (4) + Op (2) = 10 bytes
pub const HEADER_SIZE: usize = 10;

/// Operations that can be logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Put a key-value pair
    Put,

    /// Delete a key (tombstone, value is empty)
    Delete,
}

impl Operation {
    /// On-disk tag for this operation
    pub fn tag(self) -> u16 {
        match self {
            Operation::Put => 0,
            Operation::Delete => 1,
        }
    }

    /// Parse an on-disk tag
    pub fn from_tag(tag: u16) -> Result<Self> {
        match tag {
            0 => Ok(Operation::Put),
            1 => Ok(Operation::Delete),
            _ => Err(QuillError::CorruptEntry(format!(
                "Unknown operation tag: {}",
                tag
            ))),
        }
    }
}

/// A single entry in the append log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Raw key bytes
    pub key: Vec<u8>,
    /// Raw value bytes; empty for a tombstone
    pub value: Vec<u8>,
    /// Whether this record sets or removes the key
    pub operation: Operation,
}

impl Record {
    /// Build a record from any owned or borrowed byte source
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>, operation: Operation) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            operation,
        }
    }

    /// A `Put` record
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(key, value, Operation::Put)
    }

    /// A `Delete` record (tombstone)
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self::new(key, Vec::new(), Operation::Delete)
    }

    /// True for delete records
    pub fn is_tombstone(&self) -> bool {
        self.operation == Operation::Delete
    }

    /// Size of the encoded record in bytes
    pub fn encoded_len(&self) -> u64 {
        HEADER_SIZE as u64 + self.key.len() as u64 + self.value.len() as u64
    }

    /// Encode the record
    ///
    /// Format: key_len (4) + value_len (4) + op (2) + key + value, big-endian
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len() as usize);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Append the encoded record to `buf`
    pub(crate) fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u32(self.key.len() as u32);
        buf.put_u32(self.value.len() as u32);
        buf.put_u16(self.operation.tag());
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);
    }

    /// Fail if a length does not fit the 32-bit header fields
    pub(crate) fn check_encodable(&self) -> Result<()> {
        if self.key.len() > u32::MAX as usize || self.value.len() > u32::MAX as usize {
            return Err(QuillError::CorruptEntry(format!(
                "Record too large to encode: key {} bytes, value {} bytes",
                self.key.len(),
                self.value.len()
            )));
        }
        Ok(())
    }

    /// Decode a record from a buffer holding exactly one encoded record
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let header = RecordHeader::decode(buf)?;

        let expected = header.record_len();
        if buf.len() as u64 != expected {
            return Err(QuillError::CorruptEntry(format!(
                "Length mismatch: header declares {} bytes, buffer has {}",
                expected,
                buf.len()
            )));
        }

        let key_end = HEADER_SIZE + header.key_len as usize;
        Ok(Self {
            key: buf[HEADER_SIZE..key_end].to_vec(),
            value: buf[key_end..].to_vec(),
            operation: header.operation,
        })
    }
}

/// The fixed-size prefix of an encoded record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub key_len: u32,
    pub value_len: u32,
    pub operation: Operation,
}

impl RecordHeader {
    /// Decode the header from the first `HEADER_SIZE` bytes of `buf`
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(QuillError::CorruptEntry(format!(
                "Incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                buf.len()
            )));
        }

        let mut cursor = &buf[..HEADER_SIZE];
        let key_len = cursor.get_u32();
        let value_len = cursor.get_u32();
        let operation = Operation::from_tag(cursor.get_u16())?;

        Ok(Self {
            key_len,
            value_len,
            operation,
        })
    }

    /// Key plus value bytes following the header
    pub fn payload_len(&self) -> u64 {
        self.key_len as u64 + self.value_len as u64
    }

    /// Total encoded size, computed in u64 so hostile lengths cannot overflow
    pub fn record_len(&self) -> u64 {
        HEADER_SIZE as u64 + self.payload_len()
    }
}
