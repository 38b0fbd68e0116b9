//! Log record types and frame encoding.

use crate::error::{StoreError, StoreResult};
use crate::schema::Schema;
use crate::types::{RowId, SequenceNumber, TableId, TransactionId};
use crate::value::Row;
use serde::{Deserialize, Serialize};

/// Magic bytes opening every log frame.
pub const LOG_MAGIC: [u8; 4] = *b"WKLG";

/// Current log frame version.
pub const LOG_VERSION: u16 = 1;

/// Frame header size: magic (4) + version (2) + length (4).
pub const HEADER_SIZE: usize = 10;

/// Frame trailer size: crc32 (4).
pub const CRC_SIZE: usize = 4;

/// A log record.
///
/// Every record but `Schema` and `Checkpoint` belongs to a transaction
/// bracketed by `Begin` and `Commit`. Records of a transaction without a
/// `Commit` are ignored on replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogRecord {
    /// The schema the file was created with.
    Schema {
        /// Transaction ID.
        txid: TransactionId,
        /// Table, column and index definitions.
        schema: Schema,
    },

    /// Begin a transaction.
    Begin {
        /// Transaction ID.
        txid: TransactionId,
    },

    /// Insert a row.
    Insert {
        /// Transaction ID.
        txid: TransactionId,
        /// Target table.
        table: TableId,
        /// Bookmark of the new row.
        row_id: RowId,
        /// Row values.
        row: Row,
    },

    /// Replace a row.
    Update {
        /// Transaction ID.
        txid: TransactionId,
        /// Target table.
        table: TableId,
        /// Bookmark of the row.
        row_id: RowId,
        /// New row values.
        row: Row,
    },

    /// Delete a row.
    Delete {
        /// Transaction ID.
        txid: TransactionId,
        /// Target table.
        table: TableId,
        /// Bookmark of the row.
        row_id: RowId,
    },

    /// Commit a transaction.
    Commit {
        /// Transaction ID.
        txid: TransactionId,
        /// Sequence number assigned to this commit.
        sequence: SequenceNumber,
    },

    /// Counter state written when the log is compacted.
    Checkpoint {
        /// Transaction ID.
        txid: TransactionId,
        /// Last committed sequence number before compaction.
        sequence: SequenceNumber,
        /// Next bookmark per table, so deleted identifiers are never reissued.
        next_ids: Vec<(TableId, u64)>,
    },
}

impl LogRecord {
    /// Transaction the record belongs to.
    #[must_use]
    pub fn txid(&self) -> TransactionId {
        match self {
            Self::Schema { txid, .. }
            | Self::Begin { txid }
            | Self::Insert { txid, .. }
            | Self::Update { txid, .. }
            | Self::Delete { txid, .. }
            | Self::Commit { txid, .. }
            | Self::Checkpoint { txid, .. } => *txid,
        }
    }

    /// Short name of the record kind, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "schema",
            Self::Begin { .. } => "begin",
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Commit { .. } => "commit",
            Self::Checkpoint { .. } => "checkpoint",
        }
    }

    /// Encodes the record as a complete frame.
    pub fn encode_frame(&self) -> StoreResult<Vec<u8>> {
        let mut payload = Vec::new();
        ciborium::into_writer(self, &mut payload).map_err(StoreError::codec)?;
        let len = u32::try_from(payload.len())
            .map_err(|_| StoreError::invalid_argument("log record payload too large"))?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&LOG_MAGIC);
        frame.extend_from_slice(&LOG_VERSION.to_le_bytes());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);

        // CRC covers everything before it.
        let crc = compute_crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }

    /// Decodes a CBOR payload.
    pub fn decode_payload(payload: &[u8]) -> StoreResult<Self> {
        ciborium::from_reader(payload).map_err(|e| StoreError::log_corruption(e.to_string()))
    }
}

/// Encodes several records into one contiguous buffer.
pub fn encode_batch(records: &[LogRecord]) -> StoreResult<Vec<u8>> {
    let mut data = Vec::new();
    for record in records {
        data.extend_from_slice(&record.encode_frame()?);
    }
    Ok(data)
}

/// Computes the CRC32 (IEEE) checksum of `data`.
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut bit = 0;
            while bit < 8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
                bit += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        crc = (crc >> 8) ^ CRC32_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize];
    }
    !crc
}
