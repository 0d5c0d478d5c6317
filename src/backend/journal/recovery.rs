//! Journal Recovery
//!
//! Reads back every complete, valid frame. Scanning stops at the first torn
//! or corrupted frame since nothing after it can be trusted.

use std::fs::{self, OpenOptions};
use std::path::Path;

use super::{JournalEntry, JournalError};

/// Handles journal recovery after a crash
pub struct JournalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries found (scanning stops at the first)
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Byte length of the valid prefix
    pub valid_len: u64,

    /// Whether bytes past the valid prefix were (or would be) cut off
    pub was_truncated: bool,
}

impl JournalRecovery {
    /// Recover entries from a journal file
    ///
    /// This will:
    /// 1. Read all valid entries in order
    /// 2. Stop at the first partial or corrupted frame
    /// 3. Truncate the file to the valid prefix
    pub fn recover(path: &Path) -> Result<(Vec<JournalEntry>, RecoveryResult), JournalError> {
        let bytes = fs::read(path)?;
        let (entries, result) = Self::scan(&bytes);

        if result.was_truncated {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(result.valid_len)?;
            file.sync_all()?;
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = bytes.len() as u64 - result.valid_len,
                corrupted = result.entries_corrupted,
                "journal truncated to last valid entry"
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a journal file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult, JournalError> {
        let bytes = fs::read(path)?;
        Ok(Self::scan(&bytes).1)
    }

    fn scan(bytes: &[u8]) -> (Vec<JournalEntry>, RecoveryResult) {
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();
        let mut pos = 0usize;

        while pos < bytes.len() {
            match JournalEntry::decode_frame(&bytes[pos..]) {
                Ok(Some((entry, consumed))) => {
                    if entry.lsn <= result.last_lsn {
                        result.entries_corrupted += 1;
                        break;
                    }
                    result.last_lsn = entry.lsn;
                    result.entries_recovered += 1;
                    entries.push(entry);
                    pos += consumed;
                }
                Ok(None) => break,
                Err(_) => {
                    result.entries_corrupted += 1;
                    break;
                }
            }
        }

        result.valid_len = pos as u64;
        result.was_truncated = pos < bytes.len();
        (entries, result)
    }
}
