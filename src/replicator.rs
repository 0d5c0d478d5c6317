//! Shadow Replicator
//!
//! Carries committed shadow-table changes into the search store.
//!
//! ```text
//! batch_write ──► shadow table ──► change feed ──► ShadowReplicator ──► SearchEngine
//!                 (atomic with       (commit          (upsert/delete     (queryable
//!                  primary row)       order)           per change)        after apply)
//! ```
//!
//! The gap between commit and apply is the eventual-consistency window of
//! list queries. A change that cannot be applied is logged and skipped;
//! writers never see replication failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::adapter::{read_error, search_error};
use crate::backend::{ChangeRecord, ChangeStream, KeyValueBackend};
use crate::error::Result;
use crate::search::{SearchEngine, SearchError};

/// Routing index and document body of a shadow row image
fn routing(image: &Value) -> Option<(&str, &Value)> {
    let index = image.get("index")?.as_str()?;
    let data = image.get("data")?;
    Some((index, data))
}

/// Consumes the shadow table's change feed
pub struct ShadowReplicator {
    engine: Arc<dyn SearchEngine>,
    changes: ChangeStream,
    applied: Arc<AtomicU64>,
}

impl ShadowReplicator {
    pub fn new(engine: Arc<dyn SearchEngine>, changes: ChangeStream) -> Self {
        Self {
            engine,
            changes,
            applied: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Counter of changes applied so far, readable while the replicator runs
    pub fn applied_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.applied)
    }

    /// Apply changes until the feed closes
    pub async fn run(mut self) {
        tracing::debug!("shadow replicator started");
        while let Some(change) = self.changes.recv().await {
            let sequence = change.sequence;
            match apply_change(self.engine.as_ref(), &change).await {
                Ok(()) => {
                    self.applied.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    tracing::warn!(
                        sequence,
                        key = %change.key,
                        error = %e,
                        "shadow change not applied"
                    );
                }
            }
        }
        tracing::debug!("shadow replicator stopped, change feed closed");
    }

    /// Run on the current tokio runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// Apply one shadow-table change to the search store
///
/// The row key fixes the scope, so an update never moves a document between
/// indexes.
pub async fn apply_change(
    engine: &dyn SearchEngine,
    change: &ChangeRecord,
) -> std::result::Result<(), SearchError> {
    let doc_id = change.key.document_id();
    let old = change.old_image.as_ref().and_then(routing);
    let new = change.new_image.as_ref().and_then(routing);

    match (old, new) {
        (_, Some((index, data))) => {
            engine.upsert(index, &doc_id, data.clone()).await?;
            tracing::debug!(index, %doc_id, "document upserted");
        }
        (Some((index, _)), None) => {
            delete_document(engine, index, &doc_id).await?;
            tracing::debug!(index, %doc_id, "document removed");
        }
        (None, None) => {
            return Err(SearchError::InvalidRequest(format!(
                "change {} for {} carries no routing index",
                change.sequence, change.key
            )));
        }
    }
    Ok(())
}

/// A document whose index is already gone needs no removal
async fn delete_document(
    engine: &dyn SearchEngine,
    index: &str,
    doc_id: &str,
) -> std::result::Result<(), SearchError> {
    match engine.delete(index, doc_id).await {
        Err(SearchError::IndexNotFound(_)) => Ok(()),
        other => other,
    }
}

/// Rebuild search documents from a full scan of the shadow table
///
/// Only indexes that already exist are rebuilt. Rows routed to a missing
/// index are skipped, so an uninstalled index stays uninstalled. Returns the
/// number of documents written.
pub async fn reindex(
    backend: &dyn KeyValueBackend,
    shadow_table: &str,
    engine: &dyn SearchEngine,
) -> Result<usize> {
    let rows = backend.scan(shadow_table).await.map_err(read_error)?;
    let mut written = 0;
    let mut present: HashMap<String, bool> = HashMap::new();

    for (key, row) in rows {
        let Some((index, data)) = routing(&row) else {
            tracing::warn!(%key, "shadow row without routing index skipped");
            continue;
        };

        let exists = match present.get(index) {
            Some(exists) => *exists,
            None => {
                let exists = engine.index_exists(index).await.map_err(search_error)?;
                present.insert(index.to_string(), exists);
                exists
            }
        };
        if !exists {
            tracing::warn!(%key, index, "shadow row for missing index skipped");
            continue;
        }
        engine
            .upsert(index, &key.document_id(), data.clone())
            .await
            .map_err(search_error)?;
        written += 1;
    }

    tracing::info!(table = shadow_table, documents = written, "reindex complete");
    Ok(written)
}
