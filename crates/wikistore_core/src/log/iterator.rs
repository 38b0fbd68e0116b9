//! Streaming log frame reader.

use crate::error::{StoreError, StoreResult};
use crate::log::record::{compute_crc32, LogRecord, CRC_SIZE, HEADER_SIZE, LOG_MAGIC, LOG_VERSION};
use parking_lot::MutexGuard;
use wikistore_storage::StorageBackend;

/// A decoded frame with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Offset of the frame's first byte.
    pub offset: u64,
    /// Offset just past the frame.
    pub end: u64,
    /// The record.
    pub record: LogRecord,
}

/// Reads log frames one by one from a locked backend.
///
/// A frame cut short by the end of the log ends iteration cleanly and is
/// reported by [`LogIterator::torn_tail`]. A frame that is complete but
/// malformed is an error.
pub struct LogIterator<'a> {
    backend: MutexGuard<'a, Box<dyn StorageBackend>>,
    total_size: u64,
    offset: u64,
    torn: bool,
    finished: bool,
}

impl<'a> LogIterator<'a> {
    /// Creates an iterator starting at `start_offset`.
    pub fn new(backend: MutexGuard<'a, Box<dyn StorageBackend>>, start_offset: u64) -> StoreResult<Self> {
        let total_size = backend.size()?;
        Ok(Self {
            backend,
            total_size,
            offset: start_offset,
            torn: false,
            finished: false,
        })
    }

    /// Offset just past the last complete frame read so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Whether iteration stopped on an incomplete trailing frame.
    #[must_use]
    pub fn torn_tail(&self) -> bool {
        self.torn
    }

    fn read_next(&mut self) -> StoreResult<Option<LogEntry>> {
        if self.finished {
            return Ok(None);
        }
        let start = self.offset;
        let remaining = self.total_size.saturating_sub(start);
        if remaining == 0 {
            self.finished = true;
            return Ok(None);
        }
        if remaining < HEADER_SIZE as u64 {
            return Ok(self.stop_torn());
        }

        let header = self.backend.read_at(start, HEADER_SIZE)?;
        if header[0..4] != LOG_MAGIC {
            self.finished = true;
            return Err(StoreError::log_corruption(format!(
                "invalid magic at offset {start}"
            )));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != LOG_VERSION {
            self.finished = true;
            return Err(StoreError::log_corruption(format!(
                "unsupported version {version} at offset {start}"
            )));
        }
        let len = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;

        let frame_len = (HEADER_SIZE + len + CRC_SIZE) as u64;
        if remaining < frame_len {
            return Ok(self.stop_torn());
        }

        let rest = self.backend.read_at(start + HEADER_SIZE as u64, len + CRC_SIZE)?;
        let (payload, crc_bytes) = rest.split_at(len);
        let expected = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

        let mut covered = header;
        covered.extend_from_slice(payload);
        let actual = compute_crc32(&covered);
        if actual != expected {
            self.finished = true;
            return Err(StoreError::ChecksumMismatch { expected, actual });
        }

        let record = LogRecord::decode_payload(payload).inspect_err(|_| self.finished = true)?;
        self.offset = start + frame_len;
        Ok(Some(LogEntry {
            offset: start,
            end: self.offset,
            record,
        }))
    }

    fn stop_torn(&mut self) -> Option<LogEntry> {
        self.torn = true;
        self.finished = true;
        None
    }
}

impl Iterator for LogIterator<'_> {
    type Item = StoreResult<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}
