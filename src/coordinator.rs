//! Dual-Write Coordinator
//!
//! The only component that writes to both stores in one logical operation.
//!
//! ## Responsibilities
//! - Build the write-set of a mutation: one primary op + one shadow op
//! - Commit it through the backend's atomic batch primitive
//! - Refuse creates into a missing index and updates/deletes of absent records
//!
//! ## Consistency
//! The batch covers the primary row and the shadow row. Propagation from the
//! shadow table into the search store happens after commit and is outside the
//! atomicity boundary.

use std::sync::Arc;
use std::time::Duration;

use crate::adapter::{bounded, write_error, RecordStoreAdapter, SearchShadowAdapter};
use crate::backend::{BatchOp, KeyValueBackend};
use crate::error::{Error, Result, WriteLeg};
use crate::keys::{PrimaryKey, Scope};
use crate::model::{Project, ENTITY_NAME};

/// The two operations of one mutation, applied together or not at all
#[derive(Debug, Clone, PartialEq)]
pub struct WriteSet {
    primary: BatchOp,
    shadow: BatchOp,
}

impl WriteSet {
    pub fn new(primary: BatchOp, shadow: BatchOp) -> Self {
        Self { primary, shadow }
    }

    pub fn primary(&self) -> &BatchOp {
        &self.primary
    }

    pub fn shadow(&self) -> &BatchOp {
        &self.shadow
    }

    /// Always two
    pub fn len(&self) -> usize {
        2
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        vec![self.primary, self.shadow]
    }
}

/// Applies create/update/delete to both stores as one unit
#[derive(Clone)]
pub struct DualWriteCoordinator {
    backend: Arc<dyn KeyValueBackend>,
    records: RecordStoreAdapter,
    shadow: SearchShadowAdapter,
    entity_type: String,
}

impl DualWriteCoordinator {
    pub fn new(
        backend: Arc<dyn KeyValueBackend>,
        records: RecordStoreAdapter,
        shadow: SearchShadowAdapter,
        entity_type: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            records,
            shadow,
            entity_type: entity_type.into(),
        }
    }

    fn key(&self, scope: &Scope, id: &str) -> PrimaryKey {
        scope.primary_key(&self.entity_type, id)
    }

    /// Write-set storing `project` in both stores
    pub fn upsert_set(&self, scope: &Scope, project: &Project) -> Result<WriteSet> {
        let key = self.key(scope, &project.id);
        let index = scope.routing_index(&self.entity_type);
        Ok(WriteSet::new(
            self.records.put_op(&key, project)?,
            self.shadow.upsert_op(&index, &key, project)?,
        ))
    }

    /// Write-set removing `id` from both stores
    pub fn delete_set(&self, scope: &Scope, id: &str) -> WriteSet {
        let key = self.key(scope, id);
        WriteSet::new(self.records.delete_op(&key), self.shadow.delete_op(&key))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Store a new record
    ///
    /// Fails with `INDEX_NOT_READY` before writing anything if the routing
    /// index does not exist.
    pub async fn apply_create(
        &self,
        scope: &Scope,
        project: &Project,
        limit: Duration,
    ) -> Result<()> {
        let index = scope.routing_index(&self.entity_type);
        let exists = bounded("index_exists", limit, self.shadow.index_exists(&index)).await?;
        if !exists {
            tracing::debug!(%index, id = %project.id, "create refused, index missing");
            return Err(Error::IndexNotReady { index });
        }

        let set = self.upsert_set(scope, project)?;
        self.commit("create", set, limit).await?;
        tracing::debug!(%scope, id = %project.id, "created");
        Ok(())
    }

    /// Replace an existing record with `merge(existing)`
    ///
    /// Reads the stored record first; fails with `NOT_FOUND` if it is absent.
    /// Returns the record as written.
    pub async fn apply_update<F>(
        &self,
        scope: &Scope,
        id: &str,
        merge: F,
        limit: Duration,
    ) -> Result<Project>
    where
        F: FnOnce(&Project) -> Project,
    {
        let existing = self.load(scope, id, limit).await?;
        let merged = merge(&existing);
        if merged.id != existing.id {
            return Err(Error::validation(format!(
                "update may not change the id ({} -> {})",
                existing.id, merged.id
            )));
        }

        let set = self.upsert_set(scope, &merged)?;
        self.commit("update", set, limit).await?;
        tracing::debug!(%scope, id, "updated");
        Ok(merged)
    }

    /// Remove an existing record; fails with `NOT_FOUND` if it is absent
    ///
    /// Returns the record as it was before removal.
    pub async fn apply_delete(&self, scope: &Scope, id: &str, limit: Duration) -> Result<Project> {
        let existing = self.load(scope, id, limit).await?;

        let set = self.delete_set(scope, id);
        self.commit("delete", set, limit).await?;
        tracing::debug!(%scope, id, "deleted");
        Ok(existing)
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    async fn load(&self, scope: &Scope, id: &str, limit: Duration) -> Result<Project> {
        let key = self.key(scope, id);
        bounded("get", limit, self.records.get(&key))
            .await?
            .ok_or_else(|| Error::not_found(ENTITY_NAME, id))
    }

    async fn commit(&self, operation: &str, set: WriteSet, limit: Duration) -> Result<()> {
        let write = async {
            self.backend
                .batch_write(set.into_ops())
                .await
                .map_err(|e| write_error(WriteLeg::Batch, e))
        };
        bounded(operation, limit, write).await.map_err(|e| {
            tracing::debug!(operation, code = e.code(), "write-set rejected");
            e
        })
    }
}
