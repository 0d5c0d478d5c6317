//! Record store adapter
//!
//! Primary rows live in the primary table under their two-part key:
//!
//! ```text
//! { "PK": "T#{scope}#project#{id}", "SK": "{id}", ...project, "appVersion": "x.y.z" }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{BatchOp, KeyValueBackend};
use crate::error::{Error, Result, WriteLeg};
use crate::keys::PrimaryKey;
use crate::model::Project;

use super::{read_error, write_error};

/// Primary table layout of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryRow {
    #[serde(rename = "PK")]
    pub pk: String,
    #[serde(rename = "SK")]
    pub sk: String,
    #[serde(flatten)]
    pub project: Project,
    #[serde(rename = "appVersion", default)]
    pub app_version: String,
}

/// Keyed access to primary rows
#[derive(Clone)]
pub struct RecordStoreAdapter {
    backend: Arc<dyn KeyValueBackend>,
    table: String,
    app_version: String,
}

impl RecordStoreAdapter {
    pub fn new(
        backend: Arc<dyn KeyValueBackend>,
        table: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            table: table.into(),
            app_version: app_version.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn row(&self, key: &PrimaryKey, project: &Project) -> PrimaryRow {
        PrimaryRow {
            pk: key.pk.clone(),
            sk: key.sk.clone(),
            project: project.clone(),
            app_version: self.app_version.clone(),
        }
    }

    /// Batch op writing `project` as the primary row at `key`
    pub fn put_op(&self, key: &PrimaryKey, project: &Project) -> Result<BatchOp> {
        let item = serde_json::to_value(self.row(key, project)).map_err(|e| Error::StoreWrite {
            leg: WriteLeg::Primary,
            code: "SERIALIZATION".to_string(),
            message: e.to_string(),
            context: None,
        })?;
        Ok(BatchOp::Put {
            table: self.table.clone(),
            key: key.clone(),
            item,
        })
    }

    /// Batch op removing the primary row at `key`
    pub fn delete_op(&self, key: &PrimaryKey) -> BatchOp {
        BatchOp::Delete {
            table: self.table.clone(),
            key: key.clone(),
        }
    }

    /// Read a record; `None` when the key is absent
    pub async fn get(&self, key: &PrimaryKey) -> Result<Option<Project>> {
        let item = self.backend.get(&self.table, key).await.map_err(read_error)?;
        let Some(item) = item else {
            tracing::debug!(table = %self.table, %key, "primary row absent");
            return Ok(None);
        };

        let row: PrimaryRow = serde_json::from_value(item).map_err(|e| Error::StoreRead {
            code: "MALFORMED_ROW".to_string(),
            message: format!("primary row {} does not decode: {}", key, e),
            context: None,
        })?;
        Ok(Some(row.project))
    }

    /// Write a record on its own, outside any write-set
    pub async fn put(&self, key: &PrimaryKey, project: &Project) -> Result<()> {
        let op = self.put_op(key, project)?;
        self.backend
            .batch_write(vec![op])
            .await
            .map_err(|e| write_error(WriteLeg::Primary, e))
    }

    /// Remove a record on its own, outside any write-set
    pub async fn delete(&self, key: &PrimaryKey) -> Result<()> {
        self.backend
            .batch_write(vec![self.delete_op(key)])
            .await
            .map_err(|e| write_error(WriteLeg::Primary, e))
    }
}
