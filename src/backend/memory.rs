//! In-memory backend
//!
//! Non-durable primary store. Besides normal operation it can inject a
//! failure into upcoming batches and delay every call, for exercising error
//! and timeout paths.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::keys::PrimaryKey;

use super::{
    validate_batch, BackendError, BackendResult, BatchOp, ChangeFeed, ChangeStream, Item,
    KeyValueBackend, Tables,
};

#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: Tables,
    feed: ChangeFeed,
    /// Errors returned (in order) by the next batch writes
    injected_failures: Mutex<VecDeque<BackendError>>,
    /// Artificial delay applied to every call
    latency: Mutex<Option<Duration>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next batch write fail with `error` without applying anything
    pub fn fail_next_batch(&self, error: BackendError) {
        self.injected_failures.lock().push_back(error);
    }

    /// Delay every call by `latency` (`None` to disable)
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Number of items currently in `table`
    pub fn item_count(&self, table: &str) -> usize {
        self.tables.len(table)
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock();
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get(&self, table: &str, key: &PrimaryKey) -> BackendResult<Option<Item>> {
        self.simulate_latency().await;
        Ok(self.tables.get(table, key))
    }

    async fn batch_write(&self, ops: Vec<BatchOp>) -> BackendResult<()> {
        self.simulate_latency().await;

        let injected = self.injected_failures.lock().pop_front();
        if let Some(error) = injected {
            tracing::debug!(code = %error.code, "injected batch failure");
            return Err(error);
        }

        validate_batch(&ops)?;
        self.tables.apply(&ops, |changes| self.feed.publish(changes));
        Ok(())
    }

    async fn scan(&self, table: &str) -> BackendResult<Vec<(PrimaryKey, Item)>> {
        self.simulate_latency().await;
        Ok(self.tables.scan(table))
    }

    fn subscribe(&self, table: &str) -> ChangeStream {
        self.feed.subscribe(table)
    }
}
