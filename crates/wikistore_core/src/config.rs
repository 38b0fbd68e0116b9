//! Store configuration.

use std::path::{Path, PathBuf};

/// File name used when no path is configured.
pub const DEFAULT_FILE_NAME: &str = "wikis.wdb";

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Location of the database file. `None` means [`DEFAULT_FILE_NAME`] next
    /// to the running executable.
    pub path: Option<PathBuf>,

    /// Whether to create the database file if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to fsync the log on every commit (safer but slower).
    pub sync_on_commit: bool,

    /// Log size that triggers compaction after a commit (0 = never).
    pub max_log_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            create_if_missing: true,
            sync_on_commit: true,
            max_log_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the database file path.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets whether to create the file if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to fsync on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the compaction threshold.
    #[must_use]
    pub const fn max_log_size(mut self, size: u64) -> Self {
        self.max_log_size = size;
        self
    }

    /// Resolves the database file location.
    ///
    /// Falls back to the working directory when the executable's directory
    /// cannot be determined.
    #[must_use]
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        std::env::current_exe()
            .ok()
            .as_deref()
            .and_then(Path::parent)
            .map(|dir| dir.join(DEFAULT_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME))
    }
}
