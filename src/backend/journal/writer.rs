//! Journal Writer
//!
//! Appends one frame per batch and fsyncs according to the sync strategy.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::backend::BatchOp;
use crate::config::JournalSyncStrategy;

use super::{JournalEntry, JournalError};

/// Writes entries to the journal file
pub struct JournalWriter {
    path: PathBuf,
    file: File,
    /// Byte length of the valid journal
    offset: u64,
    /// LSN given to the next appended entry
    next_lsn: u64,
    sync_strategy: JournalSyncStrategy,
    /// Entries written since the last fsync
    unsynced: usize,
    /// Set when a failed frame could not be cut off the file
    broken: bool,
    /// Failure returned by the next fsync instead of syncing
    sync_failure: Option<io::Error>,
}

impl JournalWriter {
    /// Open or create a journal file, continuing after `last_lsn`
    pub fn open(
        path: &Path,
        sync_strategy: JournalSyncStrategy,
        last_lsn: u64,
    ) -> Result<Self, JournalError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset,
            next_lsn: last_lsn + 1,
            sync_strategy,
            unsynced: 0,
            broken: false,
            sync_failure: None,
        })
    }

    /// Append a batch as one entry, returning its LSN
    ///
    /// An append that fails while writing or syncing its frame leaves no
    /// trace: the file is cut back to where the frame started and the LSN is
    /// reused by the next append. If that cut itself fails the writer refuses
    /// further appends, since recovery would stop at the leftover frame.
    pub fn append(&mut self, ops: &[BatchOp]) -> Result<u64, JournalError> {
        if self.broken {
            return Err(JournalError::Unusable(format!(
                "{} holds a frame that could not be removed",
                self.path.display()
            )));
        }

        let lsn = self.next_lsn;
        let frame = JournalEntry::new(lsn, ops)?.serialize()?;
        let start = self.offset;

        if let Err(e) = self.file.write_all(&frame) {
            return Err(self.roll_back(start, e.into()));
        }

        let unsynced = self.unsynced;
        self.unsynced += 1;
        let due = match self.sync_strategy {
            JournalSyncStrategy::EveryWrite => true,
            JournalSyncStrategy::EveryNEntries { count } => self.unsynced >= count.max(1),
        };
        if due {
            if let Err(e) = self.sync() {
                self.unsynced = unsynced;
                return Err(self.roll_back(start, e));
            }
        }

        self.offset = start + frame.len() as u64;
        self.next_lsn += 1;
        Ok(lsn)
    }

    /// Cut the file back to `start`, returning the error to report
    fn roll_back(&mut self, start: u64, cause: JournalError) -> JournalError {
        match self.file.set_len(start) {
            Ok(()) => cause,
            Err(e) => {
                self.broken = true;
                tracing::error!(
                    path = %self.path.display(),
                    offset = start,
                    error = %e,
                    "failed frame left in journal"
                );
                JournalError::Unusable(format!("{}; truncating to {} failed: {}", cause, start, e))
            }
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<(), JournalError> {
        if let Some(e) = self.sync_failure.take() {
            return Err(e.into());
        }
        self.file.flush()?;
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Make the next fsync fail with `error`
    pub fn fail_next_sync(&mut self, error: io::Error) {
        self.sync_failure = Some(error);
    }

    /// LSN of the last appended entry (0 if none)
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn - 1
    }

    /// Entries not yet fsynced
    pub fn unsynced_entries(&self) -> usize {
        self.unsynced
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
