//! Log appends, reads and rewrites.

use crate::error::StoreResult;
use crate::log::iterator::{LogEntry, LogIterator};
use crate::log::record::{encode_batch, LogRecord};
use parking_lot::Mutex;
use wikistore_storage::StorageBackend;

/// Owns the database file's backend and every write to it.
pub struct LogManager {
    backend: Mutex<Box<dyn StorageBackend>>,
    sync_on_commit: bool,
}

impl LogManager {
    /// Creates a log manager over `backend`.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_commit,
        }
    }

    /// Appends `records` as one contiguous write and makes them durable.
    ///
    /// Returns the offset of the first frame. On failure the log is cut back
    /// to where the batch started, as far as the backend allows.
    pub fn append_batch(&self, records: &[LogRecord]) -> StoreResult<u64> {
        let data = encode_batch(records)?;
        let mut backend = self.backend.lock();
        let start = backend.size()?;
        let result = backend.append(&data).and_then(|offset| {
            backend.flush()?;
            if self.sync_on_commit {
                backend.sync()?;
            }
            Ok(offset)
        });
        if result.is_err() && backend.size().is_ok_and(|size| size > start) {
            if let Err(err) = backend.truncate(start) {
                tracing::warn!(%err, start, "could not cut back a failed log append");
            }
        }
        Ok(result?)
    }

    /// Streams the log from the beginning.
    ///
    /// Holds the backend lock until the iterator is dropped.
    pub fn iter(&self) -> StoreResult<LogIterator<'_>> {
        LogIterator::new(self.backend.lock(), 0)
    }

    /// Reads every complete frame.
    pub fn read_all(&self) -> StoreResult<Vec<LogEntry>> {
        self.iter()?.collect()
    }

    /// Current log size in bytes.
    pub fn size(&self) -> StoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }

    /// Cuts the log back to `offset`.
    pub fn truncate(&self, offset: u64) -> StoreResult<()> {
        let mut backend = self.backend.lock();
        backend.truncate(offset)?;
        backend.sync()?;
        Ok(())
    }

    /// Atomically swaps the whole log for `records`.
    pub fn replace(&self, records: &[LogRecord]) -> StoreResult<()> {
        let data = encode_batch(records)?;
        self.backend.lock().replace(&data)?;
        Ok(())
    }

    /// Flushes buffered writes.
    pub fn flush(&self) -> StoreResult<()> {
        self.backend.lock().flush()?;
        Ok(())
    }

    /// Flushes buffered writes and syncs them to disk.
    pub fn sync(&self) -> StoreResult<()> {
        let mut backend = self.backend.lock();
        backend.flush()?;
        backend.sync()?;
        Ok(())
    }
}

impl std::fmt::Debug for LogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogManager")
            .field("sync_on_commit", &self.sync_on_commit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SequenceNumber, TransactionId};
    use wikistore_storage::InMemoryBackend;

    fn commit(id: u64) -> [LogRecord; 2] {
        [
            LogRecord::Begin {
                txid: TransactionId::new(id),
            },
            LogRecord::Commit {
                txid: TransactionId::new(id),
                sequence: SequenceNumber::new(id),
            },
        ]
    }

    #[test]
    fn append_then_read() {
        let log = LogManager::new(Box::new(InMemoryBackend::new()), false);
        assert_eq!(log.append_batch(&commit(1)).unwrap(), 0);
        let second = log.append_batch(&commit(2)).unwrap();
        assert!(second > 0);

        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[2].offset, second);
        assert_eq!(entries[3].end, log.size().unwrap());
    }

    #[test]
    fn replace_swaps_contents() {
        let log = LogManager::new(Box::new(InMemoryBackend::new()), true);
        log.append_batch(&commit(1)).unwrap();
        log.append_batch(&commit(2)).unwrap();

        log.replace(&commit(7)).unwrap();
        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].record.txid(), TransactionId::new(7));
    }

    #[test]
    fn truncate_drops_tail() {
        let log = LogManager::new(Box::new(InMemoryBackend::new()), false);
        log.append_batch(&commit(1)).unwrap();
        let cut = log.append_batch(&commit(2)).unwrap();
        log.truncate(cut).unwrap();
        assert_eq!(log.read_all().unwrap().len(), 2);
    }
}
