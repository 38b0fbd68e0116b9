//! Crash simulation for recovery tests.
//!
//! Two tools:
//!
//! 1. [`simulate_crash`] damages the tail of a closed store's bytes the way
//!    a crash at a given point would.
//! 2. [`CrashableBackend`] wraps an in-memory backend and fails appends on
//!    demand, leaving a partial write behind.
//!
//! ## Usage
//!
//! ```rust
//! use wikistore_testkit::prelude::*;
//!
//! let store = TestStore::memory();
//! store.create_wiki("foo", "").unwrap();
//! store.create_wiki("bar", "").unwrap();
//! let backend = store.backend().unwrap().clone();
//! store.close().unwrap();
//!
//! simulate_crash(&backend, CrashPoint::TornFinalFrame);
//! let store = store.reopen();
//! assert_eq!(store.list_wikis().unwrap().len(), 1);
//! ```

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wikistore_core::log::LogManager;
use wikistore_storage::{InMemoryBackend, StorageBackend, StorageResult};

/// Points at which a crash can be simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashPoint {
    /// The last frame was cut short mid-write.
    TornFinalFrame,
    /// Every frame of the last transaction but its `Commit` reached disk.
    BeforeCommit,
    /// A new frame's header was only partly written.
    DuringHeader,
}

/// Damages `backend` as a crash at `point` would have.
pub fn simulate_crash(backend: &InMemoryBackend, point: CrashPoint) {
    let mut handle = backend.clone();
    match point {
        CrashPoint::TornFinalFrame => {
            let size = handle.size().expect("size");
            handle.truncate(size.saturating_sub(3)).expect("truncate");
        }
        CrashPoint::BeforeCommit => {
            let last = last_frame_offset(backend);
            handle.truncate(last).expect("truncate");
        }
        CrashPoint::DuringHeader => {
            handle.append(b"WKL").expect("append");
        }
    }
}

/// Offset of the last complete frame in `backend`.
pub fn last_frame_offset(backend: &InMemoryBackend) -> u64 {
    let log = LogManager::new(Box::new(backend.clone()), false);
    log.read_all()
        .expect("readable log")
        .last()
        .map_or(0, |entry| entry.offset)
}

/// Shared switch controlling a [`CrashableBackend`].
#[derive(Debug, Clone, Default)]
pub struct CrashSwitch {
    fail_appends: Arc<AtomicBool>,
}

impl CrashSwitch {
    /// Makes every following append write half its data and fail.
    pub fn arm(&self) {
        self.fail_appends.store(true, Ordering::SeqCst);
    }

    /// Lets appends succeed again.
    pub fn disarm(&self) {
        self.fail_appends.store(false, Ordering::SeqCst);
    }

    fn is_armed(&self) -> bool {
        self.fail_appends.load(Ordering::SeqCst)
    }
}

/// A storage backend wrapper that can simulate failed writes.
#[derive(Debug, Clone)]
pub struct CrashableBackend {
    inner: InMemoryBackend,
    switch: CrashSwitch,
}

impl CrashableBackend {
    /// Wraps `inner`; returns the backend and its switch.
    pub fn new(inner: InMemoryBackend) -> (Self, CrashSwitch) {
        let switch = CrashSwitch::default();
        (
            Self {
                inner,
                switch: switch.clone(),
            },
            switch,
        )
    }
}

impl StorageBackend for CrashableBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        if self.switch.is_armed() {
            self.inner.append(&data[..data.len() / 2])?;
            return Err(io::Error::other("simulated crash during append").into());
        }
        self.inner.append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.flush()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.inner.sync()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.inner.truncate(new_size)
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        self.inner.replace(data)
    }
}
