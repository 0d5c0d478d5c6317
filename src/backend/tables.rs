//! Table state shared by the backends
//!
//! BTreeMap per table wrapped in one RwLock:
//! - Ordered keys (deterministic scans)
//! - A batch is applied under a single write guard, so readers see all of
//!   it or none of it

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::keys::PrimaryKey;

use super::{BatchOp, ChangeRecord, Item};

type Table = BTreeMap<PrimaryKey, Item>;

/// In-memory tables
#[derive(Debug, Default)]
pub struct Tables {
    data: RwLock<HashMap<String, Table>>,
    sequence: AtomicU64,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an item by key (read lock)
    pub fn get(&self, table: &str, key: &PrimaryKey) -> Option<Item> {
        self.data.read().get(table).and_then(|t| t.get(key).cloned())
    }

    /// All items of a table in key order (read lock)
    pub fn scan(&self, table: &str) -> Vec<(PrimaryKey, Item)> {
        self.data
            .read()
            .get(table)
            .map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Number of items in a table
    pub fn len(&self, table: &str) -> usize {
        self.data.read().get(table).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Apply a batch under one write guard
    ///
    /// `on_commit` runs with the guard still held, so change records reach
    /// subscribers in the same order the batches were applied.
    pub fn apply<F>(&self, ops: &[BatchOp], on_commit: F)
    where
        F: FnOnce(Vec<ChangeRecord>),
    {
        let mut data = self.data.write();
        let mut changes = Vec::with_capacity(ops.len());

        for op in ops {
            let table = data.entry(op.table().to_string()).or_default();
            let (old_image, new_image) = match op {
                BatchOp::Put { key, item, .. } => {
                    (table.insert(key.clone(), item.clone()), Some(item.clone()))
                }
                BatchOp::Delete { key, .. } => (table.remove(key), None),
            };
            changes.push(ChangeRecord {
                sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
                table: op.table().to_string(),
                key: op.key().clone(),
                old_image,
                new_image,
            });
        }

        on_commit(changes);
    }
}
