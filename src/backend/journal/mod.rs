//! Journaled file backend
//!
//! Durable primary store: the in-memory tables plus an append-only journal.
//! A batch is applied to the tables only after its frame is written and
//! synced, so a batch is either fully replayed on restart or not at all.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 1 (one batch)                     │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//! Integers are big-endian; Data is a bincode `JournalEntry`.

mod entry;
mod recovery;
mod writer;

pub use entry::{JournalEntry, LoggedOp, HEADER_SIZE, MAX_ENTRY_SIZE};
pub use recovery::{JournalRecovery, RecoveryResult};
pub use writer::JournalWriter;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use thiserror::Error;

use crate::config::JournalSyncStrategy;
use crate::keys::PrimaryKey;

use super::{
    validate_batch, BackendError, BackendResult, BatchOp, ChangeFeed, ChangeStream, Item,
    KeyValueBackend, Tables,
};

/// Journal failures
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Journal corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Journal unusable: {0}")]
    Unusable(String),
}

impl From<JournalError> for BackendError {
    fn from(error: JournalError) -> Self {
        let code = match &error {
            JournalError::Io(_) => "JOURNAL_IO",
            JournalError::Corruption(_) => "JOURNAL_CORRUPTION",
            JournalError::Serialization(_) => "JOURNAL_SERIALIZATION",
            JournalError::Unusable(_) => "JOURNAL_UNUSABLE",
        };
        BackendError::new(code, error.to_string())
    }
}

/// Durable backend
///
/// Journal appends block on disk I/O, so commits run on tokio's blocking
/// pool. A caller that stops waiting does not cancel the commit.
pub struct FileBackend {
    shared: Arc<Shared>,
    recovery: RecoveryResult,
}

/// State shared with in-flight commits
struct Shared {
    path: PathBuf,
    tables: Tables,
    feed: ChangeFeed,
    /// Held across append + apply so journal order == apply order
    journal: Mutex<JournalWriter>,
    /// Artificial delay inside every commit, while the journal is held
    commit_latency: Mutex<Option<Duration>>,
}

impl Shared {
    fn commit(&self, ops: &[BatchOp]) -> BackendResult<()> {
        let mut journal = self.journal.lock();
        let latency = *self.commit_latency.lock();
        if let Some(delay) = latency {
            std::thread::sleep(delay);
        }

        let lsn = journal.append(ops).map_err(|e| {
            BackendError::from(e)
                .with_context(json!({ "journal": self.path.display().to_string() }))
        })?;
        self.tables.apply(ops, |changes| self.feed.publish(changes));
        tracing::trace!(lsn, ops = ops.len(), "batch committed");
        Ok(())
    }
}

impl FileBackend {
    const JOURNAL_FILENAME: &'static str = "journal.log";

    /// Open or create a backend in `dir`
    ///
    /// On startup:
    /// 1. Create the directory if needed
    /// 2. Recover the journal (truncating a torn tail)
    /// 3. Replay recovered batches into the tables
    pub fn open(dir: &Path, sync_strategy: JournalSyncStrategy) -> Result<Self, JournalError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(Self::JOURNAL_FILENAME);
        let tables = Tables::new();

        let recovery = if path.exists() {
            let (entries, result) = JournalRecovery::recover(&path)?;
            for entry in &entries {
                tables.apply(&entry.to_batch()?, |_| {});
            }
            tracing::info!(
                recovered = result.entries_recovered,
                corrupted = result.entries_corrupted,
                last_lsn = result.last_lsn,
                "journal replayed"
            );
            result
        } else {
            RecoveryResult::default()
        };

        let journal = JournalWriter::open(&path, sync_strategy, recovery.last_lsn)?;

        Ok(Self {
            shared: Arc::new(Shared {
                path,
                tables,
                feed: ChangeFeed::new(),
                journal: Mutex::new(journal),
                commit_latency: Mutex::new(None),
            }),
            recovery,
        })
    }

    /// What recovery found when this backend was opened
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Journal file path
    pub fn journal_path(&self) -> &Path {
        &self.shared.path
    }

    /// LSN of the last committed batch
    pub fn current_lsn(&self) -> u64 {
        self.shared.journal.lock().current_lsn()
    }

    /// Force the journal to disk
    pub fn sync(&self) -> Result<(), JournalError> {
        self.shared.journal.lock().sync()
    }

    /// Make the next journal fsync fail with `error`
    pub fn fail_next_sync(&self, error: std::io::Error) {
        self.shared.journal.lock().fail_next_sync(error);
    }

    /// Stall every commit by `latency` (`None` to disable)
    pub fn set_commit_latency(&self, latency: Option<Duration>) {
        *self.shared.commit_latency.lock() = latency;
    }
}

#[async_trait]
impl KeyValueBackend for FileBackend {
    async fn get(&self, table: &str, key: &PrimaryKey) -> BackendResult<Option<Item>> {
        Ok(self.shared.tables.get(table, key))
    }

    async fn batch_write(&self, ops: Vec<BatchOp>) -> BackendResult<()> {
        validate_batch(&ops)?;

        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || shared.commit(&ops))
            .await
            .map_err(|e| BackendError::new("JOURNAL_TASK", format!("commit task failed: {}", e)))?
    }

    async fn scan(&self, table: &str) -> BackendResult<Vec<(PrimaryKey, Item)>> {
        Ok(self.shared.tables.scan(table))
    }

    fn subscribe(&self, table: &str) -> ChangeStream {
        self.shared.feed.subscribe(table)
    }
}
