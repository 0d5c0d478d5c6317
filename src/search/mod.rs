//! Search Module
//!
//! The search store capability: named indexes of JSON documents queried with
//! boolean filters, compound sorts and search-after pagination.
//!
//! ## Implementations
//! - `MemorySearchEngine`: evaluates queries over in-memory documents

mod matcher;
mod memory;

pub use matcher::{compare_sort_values, compare_tuples, matches_query, sort_values, wildcard_match};
pub use memory::MemorySearchEngine;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::query::{query_to_json, sort_to_json, BoolQuery, PositionMarker, SortClause};

/// A query against one index
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// `None` matches every document
    pub query: Option<BoolQuery>,
    pub sort: Vec<SortClause>,
    /// Return only hits strictly after this position
    pub search_after: Option<PositionMarker>,
    pub size: usize,
}

impl SearchRequest {
    /// Full request body in the search store's JSON query language
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "query": query_to_json(self.query.as_ref()),
            "sort": sort_to_json(&self.sort),
            "size": self.size,
        });
        if let Some(after) = &self.search_after {
            body["search_after"] = Value::Array(after.clone());
        }
        body
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub source: Value,
    /// Sort values of this hit, usable as the next `search_after`
    pub sort: PositionMarker,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    /// Matches before pagination
    pub total: u64,
}

/// Search-store-native error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("index \"{0}\" not found")]
    IndexNotFound(String),

    #[error("index \"{0}\" already exists")]
    IndexAlreadyExists(String),

    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    #[error("[{code}] {message}")]
    Engine { code: String, message: String },
}

impl SearchError {
    pub fn code(&self) -> &str {
        match self {
            SearchError::IndexNotFound(_) => "index_not_found_exception",
            SearchError::IndexAlreadyExists(_) => "resource_already_exists_exception",
            SearchError::InvalidRequest(_) => "search_phase_execution_exception",
            SearchError::Engine { code, .. } => code,
        }
    }
}

/// Search store capability
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError>;

    async fn create_index(&self, index: &str) -> Result<(), SearchError>;

    async fn drop_index(&self, index: &str) -> Result<(), SearchError>;

    /// Create or replace a document
    async fn upsert(&self, index: &str, doc_id: &str, body: Value) -> Result<(), SearchError>;

    /// Remove a document (no-op if absent)
    async fn delete(&self, index: &str, doc_id: &str) -> Result<(), SearchError>;

    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, SearchError>;
}
