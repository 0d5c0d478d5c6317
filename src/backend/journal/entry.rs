//! Journal entry definitions
//!
//! One entry holds one committed batch. Items are kept as JSON bytes inside
//! the bincode body.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::backend::BatchOp;
use crate::keys::PrimaryKey;

use super::JournalError;

/// Frame header: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest body accepted when decoding (64 MB)
pub const MAX_ENTRY_SIZE: u32 = 64 * 1024 * 1024;

/// A single entry in the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,

    /// The batch, in submission order
    pub ops: Vec<LoggedOp>,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoggedOp {
    Put {
        table: String,
        pk: String,
        sk: String,
        item: Vec<u8>,
    },
    Delete {
        table: String,
        pk: String,
        sk: String,
    },
}

impl LoggedOp {
    fn from_batch(op: &BatchOp) -> Result<Self, JournalError> {
        Ok(match op {
            BatchOp::Put { table, key, item } => LoggedOp::Put {
                table: table.clone(),
                pk: key.pk.clone(),
                sk: key.sk.clone(),
                item: serde_json::to_vec(item)
                    .map_err(|e| JournalError::Serialization(e.to_string()))?,
            },
            BatchOp::Delete { table, key } => LoggedOp::Delete {
                table: table.clone(),
                pk: key.pk.clone(),
                sk: key.sk.clone(),
            },
        })
    }

    fn to_batch(&self) -> Result<BatchOp, JournalError> {
        Ok(match self {
            LoggedOp::Put {
                table,
                pk,
                sk,
                item,
            } => BatchOp::Put {
                table: table.clone(),
                key: PrimaryKey {
                    pk: pk.clone(),
                    sk: sk.clone(),
                },
                item: serde_json::from_slice(item)
                    .map_err(|e| JournalError::Serialization(e.to_string()))?,
            },
            LoggedOp::Delete { table, pk, sk } => BatchOp::Delete {
                table: table.clone(),
                key: PrimaryKey {
                    pk: pk.clone(),
                    sk: sk.clone(),
                },
            },
        })
    }
}

impl JournalEntry {
    /// Build an entry for a batch
    pub fn new(lsn: u64, ops: &[BatchOp]) -> Result<Self, JournalError> {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Ok(Self {
            lsn,
            timestamp,
            ops: ops.iter().map(LoggedOp::from_batch).collect::<Result<_, _>>()?,
        })
    }

    /// Convert back into batch operations for replay
    pub fn to_batch(&self) -> Result<Vec<BatchOp>, JournalError> {
        self.ops.iter().map(LoggedOp::to_batch).collect()
    }

    /// CRC over the LSN and the body
    pub fn compute_crc(lsn: u64, body: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_be_bytes());
        hasher.update(body);
        hasher.finalize()
    }

    /// Encode as a full frame: header + bincode body
    pub fn serialize(&self) -> Result<Bytes, JournalError> {
        let body =
            bincode::serialize(self).map_err(|e| JournalError::Serialization(e.to_string()))?;
        if body.len() > MAX_ENTRY_SIZE as usize {
            return Err(JournalError::Serialization(format!(
                "entry too large: {} bytes (max {})",
                body.len(),
                MAX_ENTRY_SIZE
            )));
        }

        let mut frame = BytesMut::with_capacity(HEADER_SIZE + body.len());
        frame.put_u64(self.lsn);
        frame.put_u32(Self::compute_crc(self.lsn, &body));
        frame.put_u32(body.len() as u32);
        frame.put_slice(&body);
        Ok(frame.freeze())
    }

    /// Decode one frame from the front of `bytes`
    ///
    /// Returns:
    /// - `Ok(Some((entry, consumed)))`: a complete, valid frame
    /// - `Ok(None)`: not enough bytes for a full frame (torn write)
    /// - `Err(Corruption)`: checksum, length or body mismatch
    pub fn decode_frame(bytes: &[u8]) -> Result<Option<(Self, usize)>, JournalError> {
        if bytes.len() < HEADER_SIZE {
            return Ok(None);
        }

        let mut header = &bytes[..HEADER_SIZE];
        let lsn = header.get_u64();
        let crc = header.get_u32();
        let len = header.get_u32();

        if len > MAX_ENTRY_SIZE {
            return Err(JournalError::Corruption(format!(
                "entry at lsn {} claims {} bytes (max {})",
                lsn, len, MAX_ENTRY_SIZE
            )));
        }

        let total = HEADER_SIZE + len as usize;
        if bytes.len() < total {
            return Ok(None);
        }

        let body = &bytes[HEADER_SIZE..total];
        if Self::compute_crc(lsn, body) != crc {
            return Err(JournalError::Corruption(format!(
                "CRC mismatch for entry at lsn {}",
                lsn
            )));
        }

        let entry: JournalEntry = bincode::deserialize(body)
            .map_err(|e| JournalError::Corruption(format!("undecodable entry body: {}", e)))?;
        if entry.lsn != lsn {
            return Err(JournalError::Corruption(format!(
                "header lsn {} does not match body lsn {}",
                lsn, entry.lsn
            )));
        }

        Ok(Some((entry, total)))
    }
}
