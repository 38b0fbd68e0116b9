//! Append-only transaction log.
//!
//! The database file is nothing but this log. Every committed transaction is
//! appended as one contiguous batch of frames, `Begin`, its row operations,
//! then `Commit`, and the batch is flushed before the commit returns.
//!
//! ## Frame Format
//!
//! ```text
//! | magic "WKLG" (4) | version (2) | length (4) | CBOR payload (N) | crc32 (4) |
//! ```
//!
//! Integers are little-endian. The CRC covers magic, version, length and
//! payload.
//!
//! ## Recovery Policy
//!
//! Tolerated, treated as the end of the log and cut off on open:
//!
//! - a trailing frame shorter than its header or its declared length
//! - trailing complete frames of a transaction with no `Commit`
//!
//! Fatal, the open fails:
//!
//! - a complete frame whose CRC does not match
//! - bad magic bytes or an unknown version
//! - a payload that does not decode
//!
//! ## Compaction
//!
//! Once the log outgrows its configured size it is rewritten as a single
//! transaction holding the schema, a checkpoint of the bookmark counters and
//! one insert per live row, then swapped in atomically.

mod iterator;
mod record;
mod writer;

pub use iterator::{LogEntry, LogIterator};
pub use record::{compute_crc32, encode_batch, LogRecord, CRC_SIZE, HEADER_SIZE, LOG_MAGIC, LOG_VERSION};
pub use writer::LogManager;
