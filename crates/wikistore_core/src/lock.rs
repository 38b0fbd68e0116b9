//! Exclusive advisory lock on a database file.
//!
//! The lock lives on a sidecar `<file>.lock` next to the database file, since
//! compaction replaces the database file itself by rename.

use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Holds an exclusive lock for as long as it lives.
#[derive(Debug)]
pub(crate) struct FileLock {
    path: PathBuf,
    file: Option<File>,
}

impl FileLock {
    /// Locks the database file at `db_path` without blocking.
    ///
    /// Fails with `StorageInit` if another process holds the lock.
    pub(crate) fn acquire(db_path: &Path) -> StoreResult<Self> {
        let path = lock_path(db_path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                StoreError::storage_init(format!("cannot open lock file {}: {e}", path.display()))
            })?;

        if file.try_lock_exclusive().is_err() {
            return Err(StoreError::storage_init(format!(
                "database file {} is locked by another process",
                db_path.display()
            )));
        }

        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Path of the sidecar lock file.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the lock. Safe to call more than once.
    pub(crate) fn release(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(err) = file.unlock() {
                tracing::warn!(%err, path = %self.path.display(), "failed to release file lock");
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn lock_path(db_path: &Path) -> PathBuf {
    let mut name = OsString::from(db_path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_lock_fails() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("wikis.wdb");
        let first = FileLock::acquire(&db).unwrap();
        assert!(first.path().ends_with("wikis.wdb.lock"));

        let err = FileLock::acquire(&db).unwrap_err();
        assert!(matches!(err, StoreError::StorageInit { .. }));
    }

    #[test]
    fn release_allows_relock() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("wikis.wdb");
        let mut first = FileLock::acquire(&db).unwrap();
        first.release();
        first.release();
        FileLock::acquire(&db).unwrap();
    }
}
