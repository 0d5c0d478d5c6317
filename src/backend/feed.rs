//! Change feed
//!
//! Fans committed changes out to per-table subscribers. Subscribers that
//! have gone away are dropped on the next publish.

use parking_lot::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::ChangeRecord;

/// Receiving end of a table subscription
pub type ChangeStream = UnboundedReceiver<ChangeRecord>;

#[derive(Debug, Default)]
pub struct ChangeFeed {
    subscribers: Mutex<Vec<(String, UnboundedSender<ChangeRecord>)>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every change committed to `table` from now on
    pub fn subscribe(&self, table: &str) -> ChangeStream {
        let (tx, rx) = unbounded_channel();
        self.subscribers.lock().push((table.to_string(), tx));
        rx
    }

    /// Deliver changes to matching subscribers
    pub fn publish(&self, changes: Vec<ChangeRecord>) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        for change in changes {
            subscribers.retain(|(table, tx)| {
                if *table != change.table {
                    return !tx.is_closed();
                }
                tx.send(change.clone()).is_ok()
            });
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|(_, tx)| !tx.is_closed());
        subscribers.len()
    }
}
