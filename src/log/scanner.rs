//! Log Scanner
//!
//! Sequential reads over an append log, used by replay and merge.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::Result;

use super::record::{Record, RecordHeader, HEADER_SIZE};
use super::short_read;

/// Read buffer for sequential scans
const SCAN_BUFFER_SIZE: usize = 64 * 1024;

/// Iterator over `(offset, record)` pairs from offset 0 to a fixed end
///
/// Uses its own buffered read handle, so scanning never disturbs the
/// owning log. Ends cleanly when `end` is reached; the first failure is
/// yielded as an error and ends the iteration.
pub struct LogScanner {
    reader: BufReader<File>,
    /// Offset of the next record
    position: u64,
    /// Where the log ends
    end: u64,
    failed: bool,
}

impl LogScanner {
    /// Open a scanner over the first `end` bytes of the file at `path`
    pub fn open(path: &Path, end: u64) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::with_capacity(SCAN_BUFFER_SIZE, file),
            position: 0,
            end,
            failed: false,
        })
    }

    /// End of the last record read successfully
    pub fn position(&self) -> u64 {
        self.position
    }

    fn read_record(&mut self) -> Result<Record> {
        let remaining = self.end - self.position;
        if remaining < HEADER_SIZE as u64 {
            return Err(short_read(format!(
                "{} trailing bytes at offset {} are too short for a record header",
                remaining, self.position
            )));
        }

        let mut header_buf = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut header_buf)?;
        let header = RecordHeader::decode(&header_buf)?;

        if header.record_len() > remaining {
            return Err(short_read(format!(
                "record at offset {} declares {} bytes but only {} remain",
                self.position,
                header.record_len(),
                remaining
            )));
        }

        let mut key = vec![0u8; header.key_len as usize];
        self.reader.read_exact(&mut key)?;
        let mut value = vec![0u8; header.value_len as usize];
        self.reader.read_exact(&mut value)?;

        Ok(Record {
            key,
            value,
            operation: header.operation,
        })
    }
}

impl Iterator for LogScanner {
    type Item = Result<(u64, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.end {
            return None;
        }

        match self.read_record() {
            Ok(record) => {
                let offset = self.position;
                self.position += record.encoded_len();
                Some(Ok((offset, record)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
