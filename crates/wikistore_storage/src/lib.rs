//! # WikiStore Storage
//!
//! Byte-store backends for the WikiStore database file.
//!
//! A backend is an opaque, append-mostly byte store. It knows nothing about
//! log frames, schemas, wikis or pages; `wikistore_core` owns every byte of
//! interpretation. Besides appending, a backend can atomically swap its whole
//! contents, which is how the log is compacted.
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - the database file on disk
//! - [`InMemoryBackend`] - ephemeral stores for tests
//!
//! ```rust
//! use wikistore_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"front page").unwrap();
//! assert_eq!(backend.read_at(offset, 5).unwrap(), b"front");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
