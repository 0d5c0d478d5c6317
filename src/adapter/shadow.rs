//! Search shadow adapter
//!
//! Shadow rows live in the shadow table, the stream source the search store
//! is fed from. Each row names the routing index its document belongs in:
//!
//! ```text
//! { "PK", "SK", "index": "{scope}-project", "data": { ...project, "appVersion": "x.y.z" } }
//! ```
//!
//! Queries go straight to the search store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{BatchOp, KeyValueBackend};
use crate::error::{Error, Result, WriteLeg};
use crate::keys::PrimaryKey;
use crate::model::Project;
use crate::query::{encode_cursor, BoolQuery, PositionMarker, SortClause};
use crate::search::{SearchEngine, SearchError, SearchRequest};

use super::{search_error, write_error};

/// Search document body: the project plus its version marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowDocument {
    #[serde(flatten)]
    pub project: Project,
    #[serde(rename = "appVersion", default)]
    pub app_version: String,
}

/// Shadow table layout of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowRow {
    #[serde(rename = "PK")]
    pub pk: String,
    #[serde(rename = "SK")]
    pub sk: String,
    pub index: String,
    pub data: ShadowDocument,
}

/// One page of search results
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub items: Vec<Project>,
    /// Present only when more results follow
    pub next_cursor: Option<String>,
    pub has_more: bool,
    /// Matches before pagination
    pub total: u64,
}

/// Shadow writes, index lifecycle and search queries
#[derive(Clone)]
pub struct SearchShadowAdapter {
    backend: Arc<dyn KeyValueBackend>,
    engine: Arc<dyn SearchEngine>,
    table: String,
    app_version: String,
}

impl SearchShadowAdapter {
    pub fn new(
        backend: Arc<dyn KeyValueBackend>,
        engine: Arc<dyn SearchEngine>,
        table: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            engine,
            table: table.into(),
            app_version: app_version.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn row(&self, index: &str, key: &PrimaryKey, project: &Project) -> ShadowRow {
        ShadowRow {
            pk: key.pk.clone(),
            sk: key.sk.clone(),
            index: index.to_string(),
            data: ShadowDocument {
                project: project.clone(),
                app_version: self.app_version.clone(),
            },
        }
    }

    // =========================================================================
    // Shadow Writes
    // =========================================================================

    /// Batch op writing the shadow row of `project` into `index`
    pub fn upsert_op(&self, index: &str, key: &PrimaryKey, project: &Project) -> Result<BatchOp> {
        let item =
            serde_json::to_value(self.row(index, key, project)).map_err(|e| Error::StoreWrite {
                leg: WriteLeg::Shadow,
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

    /// Batch op removing the shadow row at `key`
    pub fn delete_op(&self, key: &PrimaryKey) -> BatchOp {
        BatchOp::Delete {
            table: self.table.clone(),
            key: key.clone(),
        }
    }

    /// Write a shadow row on its own; safe to repeat
    pub async fn upsert(&self, index: &str, key: &PrimaryKey, project: &Project) -> Result<()> {
        let op = self.upsert_op(index, key, project)?;
        self.backend
            .batch_write(vec![op])
            .await
            .map_err(|e| write_error(WriteLeg::Shadow, e))
    }

    /// Remove a shadow row on its own; safe to repeat
    ///
    /// The document leaves `index` once the removal reaches the search store.
    pub async fn delete(&self, index: &str, key: &PrimaryKey) -> Result<()> {
        tracing::debug!(index, %key, "removing shadow row");
        self.backend
            .batch_write(vec![self.delete_op(key)])
            .await
            .map_err(|e| write_error(WriteLeg::Shadow, e))
    }

    // =========================================================================
    // Index Lifecycle
    // =========================================================================

    pub async fn index_exists(&self, index: &str) -> Result<bool> {
        self.engine.index_exists(index).await.map_err(search_error)
    }

    /// Create `index`; `false` if it already existed
    pub async fn create_index(&self, index: &str) -> Result<bool> {
        match self.engine.create_index(index).await {
            Ok(()) => {
                tracing::info!(index, "search index created");
                Ok(true)
            }
            Err(SearchError::IndexAlreadyExists(_)) => Ok(false),
            Err(e) => Err(search_error(e)),
        }
    }

    pub async fn drop_index(&self, index: &str) -> Result<()> {
        self.engine.drop_index(index).await.map_err(search_error)?;
        tracing::info!(index, "search index dropped");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Fetch one page of at most `limit` projects
    ///
    /// Asks for one extra hit to learn whether another page follows. The
    /// cursor is the sort values of the last returned item.
    pub async fn query(
        &self,
        index: &str,
        query: Option<BoolQuery>,
        sort: Vec<SortClause>,
        after: Option<PositionMarker>,
        limit: usize,
    ) -> Result<SearchPage> {
        let request = SearchRequest {
            query,
            sort,
            search_after: after,
            size: limit + 1,
        };
        tracing::debug!(index, body = %request.to_json(), "search request");

        let response = self.engine.search(index, &request).await.map_err(search_error)?;

        let has_more = response.hits.len() > limit;
        let mut hits = response.hits;
        hits.truncate(limit);

        let next_cursor = if has_more {
            encode_cursor(hits.last().map(|hit| &hit.sort))
        } else {
            None
        };

        let items = hits
            .into_iter()
            .map(|hit| {
                serde_json::from_value::<ShadowDocument>(hit.source)
                    .map(|doc| doc.project)
                    .map_err(|e| Error::Search {
                        code: "MALFORMED_DOCUMENT".to_string(),
                        message: format!("search document {} does not decode: {}", hit.id, e),
                        context: None,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SearchPage {
            items,
            next_cursor,
            has_more,
            total: response.total,
        })
    }
}
