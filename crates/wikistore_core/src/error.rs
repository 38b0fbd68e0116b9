//! Error types for the record store.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the record store.
///
/// `DuplicateName` and `NotFound` are ordinary outcomes that callers are
/// expected to branch on. Every constraint check runs before any write of the
/// guarded transaction is committed, so either error leaves storage untouched.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated.
    #[error("{collection} named {name:?} already exists")]
    DuplicateName {
        /// Collection the name collides in (`wikis` or `pages`).
        collection: &'static str,
        /// The conflicting name.
        name: String,
    },

    /// An identifier or name-scoped lookup found nothing.
    #[error("{collection} not found: {key}")]
    NotFound {
        /// Collection that was searched.
        collection: &'static str,
        /// Human-readable description of the lookup key.
        key: String,
    },

    /// The store could not be brought to a ready state.
    #[error("storage initialization failed: {message}")]
    StorageInit {
        /// What went wrong.
        message: String,
    },

    /// The operation is declared but not built.
    #[error("operation not implemented: {operation}")]
    NotImplemented {
        /// Name of the operation.
        operation: &'static str,
    },

    /// The mutation would break the one-cover-page-per-wiki rule.
    #[error("wiki {wiki} must keep exactly one cover page")]
    CoverConflict {
        /// Wiki whose cover page was affected.
        wiki: i64,
    },

    /// An argument failed validation.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Why the argument was rejected.
        message: String,
    },

    /// A row violated a unique or disallow-null index at the engine level.
    #[error("index constraint violated on {index}")]
    Constraint {
        /// Name of the violated index.
        index: String,
    },

    /// The log contains a malformed frame.
    #[error("log corruption: {message}")]
    LogCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// A log frame failed its checksum.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// The store has been closed.
    #[error("store is closed")]
    StoreClosed,

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] wikistore_storage::StorageError),

    /// CBOR encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Creates a duplicate-name error.
    pub fn duplicate(collection: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            collection,
            name: name.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(collection: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            collection,
            key: key.into(),
        }
    }

    /// Creates a storage initialization error.
    pub fn storage_init(message: impl Into<String>) -> Self {
        Self::StorageInit {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a log corruption error.
    pub fn log_corruption(message: impl Into<String>) -> Self {
        Self::LogCorruption {
            message: message.into(),
        }
    }

    /// Creates a codec error from any displayable error.
    pub fn codec(err: impl std::fmt::Display) -> Self {
        Self::Codec(err.to_string())
    }

    /// Returns true for [`StoreError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for [`StoreError::DuplicateName`].
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateName { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_collection() {
        let err = StoreError::duplicate("wikis", "foo");
        assert_eq!(err.to_string(), "wikis named \"foo\" already exists");
        assert!(err.is_duplicate());

        let err = StoreError::not_found("pages", "id 7 in wiki 1");
        assert_eq!(err.to_string(), "pages not found: id 7 in wiki 1");
        assert!(err.is_not_found());
    }

    #[test]
    fn storage_errors_convert() {
        let err: StoreError = wikistore_storage::StorageError::Closed.into();
        assert!(matches!(err, StoreError::Storage(_)));
    }
}
