//! Backend Module
//!
//! The primary store capability: keyed item access plus an atomic batch
//! write primitive spanning several tables.
//!
//! ## Responsibilities
//! - Point reads by two-part key
//! - All-or-nothing batch writes (the coordinator's atomicity boundary)
//! - Full table scans (search index rebuilds)
//! - A per-table change feed, the stream that feeds the search store
//!
//! ## Implementations
//! - `MemoryBackend`: tables in memory, with fault and latency injection
//! - `FileBackend`: the same tables made durable by an append-only journal

mod feed;
mod memory;
mod tables;

pub mod journal;

pub use feed::{ChangeFeed, ChangeStream};
pub use journal::FileBackend;
pub use memory::MemoryBackend;
pub use tables::Tables;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::keys::PrimaryKey;

/// A stored item (a JSON object)
pub type Item = Value;

/// Result type for backend-native calls
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// One operation of a batch write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BatchOp {
    /// Create or replace the item at `key`
    Put {
        table: String,
        key: PrimaryKey,
        item: Item,
    },

    /// Remove the item at `key` (no-op if absent)
    Delete { table: String, key: PrimaryKey },
}

impl BatchOp {
    pub fn table(&self) -> &str {
        match self {
            BatchOp::Put { table, .. } | BatchOp::Delete { table, .. } => table,
        }
    }

    pub fn key(&self) -> &PrimaryKey {
        match self {
            BatchOp::Put { key, .. } | BatchOp::Delete { key, .. } => key,
        }
    }
}

/// A committed change to one item, with old and new images
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// Commit order within the backend
    pub sequence: u64,
    pub table: String,
    pub key: PrimaryKey,
    pub old_image: Option<Item>,
    pub new_image: Option<Item>,
}

/// Store-native error, wrapped by the adapters before it leaves the core
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{code}] {message}")]
pub struct BackendError {
    pub code: String,
    pub message: String,
    pub context: Option<Value>,
}

impl BackendError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Primary store capability
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Read one item; `None` when the key is absent
    async fn get(&self, table: &str, key: &PrimaryKey) -> BackendResult<Option<Item>>;

    /// Apply every op or none of them
    async fn batch_write(&self, ops: Vec<BatchOp>) -> BackendResult<()>;

    /// Every item of a table, in key order
    async fn scan(&self, table: &str) -> BackendResult<Vec<(PrimaryKey, Item)>>;

    /// Stream of committed changes to `table`, in commit order
    fn subscribe(&self, table: &str) -> ChangeStream;
}

/// Reject batches the tables cannot apply atomically
pub(crate) fn validate_batch(ops: &[BatchOp]) -> BackendResult<()> {
    let mut seen = std::collections::HashSet::new();
    for op in ops {
        if op.table().is_empty() {
            return Err(BackendError::new(
                "VALIDATION",
                "batch operation has an empty table name",
            ));
        }
        if !seen.insert((op.table(), op.key())) {
            return Err(BackendError::new(
                "VALIDATION",
                format!(
                    "batch touches {} in table {:?} more than once",
                    op.key(),
                    op.table()
                ),
            ));
        }
        if let BatchOp::Put { item, .. } = op {
            if !item.is_object() {
                return Err(BackendError::new(
                    "VALIDATION",
                    format!("item for {} is not an object", op.key()),
                ));
            }
        }
    }
    Ok(())
}
