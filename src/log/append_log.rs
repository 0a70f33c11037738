//! Append Log
//!
//! A single append-only file plus the in-memory write cursor (`tail`).

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use bytes::BytesMut;
use tracing::{debug, warn};

use crate::config::SyncStrategy;
use crate::error::Result;

use super::record::{Record, RecordHeader, HEADER_SIZE};
use super::scanner::LogScanner;
use super::short_read;

/// Append-only log file
///
/// ## Cursor
/// `tail` is the offset of the next write and always equals the number of
/// bytes of valid records in the file. Writes are positional at `tail`;
/// reads are positional too, so `read_at` only needs `&self` and many
/// readers can share one handle.
pub struct AppendLog {
    /// File handle (read + write)
    file: File,
    /// Current location of the file
    path: PathBuf,
    /// Next write position
    tail: u64,
    /// When to fsync
    sync_strategy: SyncStrategy,
    /// Appends since the last fsync
    unsynced: usize,
}

impl AppendLog {
    /// Open or create a log file, resuming at its current end
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        let tail = file.metadata()?.len();

        debug!(path = %path.display(), tail, "opened append log");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            tail,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Create an empty log file, discarding anything already at `path`
    pub fn create(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            tail: 0,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Read the record starting at `offset`
    ///
    /// Reads the header first, then exactly the declared payload. A record
    /// that would extend past `tail` is reported as a short read before
    /// anything is allocated for it.
    pub fn read_at(&self, offset: u64) -> Result<Record> {
        let header_end = offset.saturating_add(HEADER_SIZE as u64);
        if header_end > self.tail {
            return Err(short_read(format!(
                "no record header at offset {} (log ends at {})",
                offset, self.tail
            )));
        }

        let mut header_buf = [0u8; HEADER_SIZE];
        read_exact_at(&self.file, &mut header_buf, offset)?;
        let header = RecordHeader::decode(&header_buf)?;

        let record_end = offset.saturating_add(header.record_len());
        if record_end > self.tail {
            return Err(short_read(format!(
                "record at offset {} declares {} bytes but the log ends at {}",
                offset,
                header.record_len(),
                self.tail
            )));
        }

        let mut payload = vec![0u8; header.payload_len() as usize];
        read_exact_at(&self.file, &mut payload, header_end)?;
        let value = payload.split_off(header.key_len as usize);

        Ok(Record {
            key: payload,
            value,
            operation: header.operation,
        })
    }

    /// Append a record at the tail
    ///
    /// Returns the offset the record starts at. On failure nothing is
    /// left behind in the file and `tail` is unchanged.
    pub fn append(&mut self, record: &Record) -> Result<u64> {
        record.check_encodable()?;
        let offset = self.tail;
        let bytes = record.encode();

        self.write_at_tail(&bytes)?;
        self.note_appended(1, offset)?;

        Ok(offset)
    }

    /// Append several records with a single write
    ///
    /// Returns the start offset of each record, in order.
    pub fn append_batch(&mut self, records: &[Record]) -> Result<Vec<u64>> {
        let mut total = 0u64;
        for record in records {
            record.check_encodable()?;
            total += record.encoded_len();
        }

        let start = self.tail;
        let mut buf = BytesMut::with_capacity(total as usize);
        let mut offsets = Vec::with_capacity(records.len());
        let mut next = start;
        for record in records {
            offsets.push(next);
            next += record.encoded_len();
            record.encode_into(&mut buf);
        }

        self.write_at_tail(&buf)?;
        self.note_appended(records.len(), start)?;

        debug!(records = records.len(), bytes = total, "appended batch");
        Ok(offsets)
    }

    /// Force file data to stable storage
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Iterate over every record from offset 0 up to the current tail
    pub fn scan(&self) -> Result<LogScanner> {
        LogScanner::open(&self.path, self.tail)
    }

    /// Cut the log back to `len` bytes
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        self.tail = len;
        self.sync()
    }

    /// Rename the file to `path` and keep using it under the new name
    pub fn persist_as(&mut self, path: &Path) -> Result<()> {
        fs::rename(&self.path, path)?;
        self.path = path.to_path_buf();
        Ok(())
    }

    /// Sync and release the file handle
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }

    /// Strategy deciding when appends are fsynced
    pub fn sync_strategy(&self) -> SyncStrategy {
        self.sync_strategy
    }

    /// Change when future appends are fsynced
    pub fn set_sync_strategy(&mut self, strategy: SyncStrategy) {
        self.sync_strategy = strategy;
    }

    /// Offset of the next write (equals the log size)
    pub fn tail(&self) -> u64 {
        self.tail
    }

    pub fn is_empty(&self) -> bool {
        self.tail == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write_at_tail(&mut self, bytes: &[u8]) -> Result<()> {
        let offset = self.tail;
        if let Err(e) = write_all_at(&self.file, bytes, offset) {
            self.rollback(offset);
            return Err(e.into());
        }
        self.tail += bytes.len() as u64;
        Ok(())
    }

    /// Count appends and fsync when the strategy says so. A failed fsync
    /// undoes the append that started at `start`.
    fn note_appended(&mut self, count: usize, start: u64) -> Result<()> {
        self.unsynced += count;
        let due = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
            SyncStrategy::Never => false,
        };

        if due {
            if let Err(e) = self.sync() {
                self.rollback(start);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Drop any bytes written past `offset`
    fn rollback(&mut self, offset: u64) {
        if let Err(e) = self.file.set_len(offset) {
            warn!(
                path = %self.path.display(),
                offset,
                error = %e,
                "failed to roll back partial append"
            );
        }
        self.tail = offset;
    }
}

// =============================================================================
// Positional I/O
// =============================================================================

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ))
            }
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
