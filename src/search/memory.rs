//! In-memory search engine
//!
//! Indexes are maps of document id → JSON source. Searches evaluate the
//! boolean query against every document, sort the matches and cut the page
//! after the `search_after` position.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::matcher::{compare_tuples, matches_query, sort_values};
use super::{SearchEngine, SearchError, SearchHit, SearchRequest, SearchResponse};

type Index = BTreeMap<String, Value>;

#[derive(Debug, Default)]
pub struct MemorySearchEngine {
    indices: RwLock<HashMap<String, Index>>,
    /// Artificial delay applied to every call
    latency: Mutex<Option<Duration>>,
}

impl MemorySearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` (`None` to disable)
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Number of documents in an index (0 if it does not exist)
    pub fn document_count(&self, index: &str) -> usize {
        self.indices.read().get(index).map_or(0, BTreeMap::len)
    }

    /// Source of one document
    pub fn document(&self, index: &str, doc_id: &str) -> Option<Value> {
        self.indices
            .read()
            .get(index)
            .and_then(|docs| docs.get(doc_id).cloned())
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock();
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SearchEngine for MemorySearchEngine {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        self.simulate_latency().await;
        Ok(self.indices.read().contains_key(index))
    }

    async fn create_index(&self, index: &str) -> Result<(), SearchError> {
        self.simulate_latency().await;
        let mut indices = self.indices.write();
        if indices.contains_key(index) {
            return Err(SearchError::IndexAlreadyExists(index.to_string()));
        }
        indices.insert(index.to_string(), Index::new());
        Ok(())
    }

    async fn drop_index(&self, index: &str) -> Result<(), SearchError> {
        self.simulate_latency().await;
        match self.indices.write().remove(index) {
            Some(_) => Ok(()),
            None => Err(SearchError::IndexNotFound(index.to_string())),
        }
    }

    async fn upsert(&self, index: &str, doc_id: &str, body: Value) -> Result<(), SearchError> {
        self.simulate_latency().await;
        let mut indices = self.indices.write();
        let docs = indices
            .get_mut(index)
            .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))?;
        docs.insert(doc_id.to_string(), body);
        Ok(())
    }

    async fn delete(&self, index: &str, doc_id: &str) -> Result<(), SearchError> {
        self.simulate_latency().await;
        let mut indices = self.indices.write();
        let docs = indices
            .get_mut(index)
            .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))?;
        docs.remove(doc_id);
        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, SearchError> {
        self.simulate_latency().await;

        if let Some(after) = &request.search_after {
            if after.len() != request.sort.len() {
                return Err(SearchError::InvalidRequest(format!(
                    "search_after has {} values but the sort has {} clauses",
                    after.len(),
                    request.sort.len()
                )));
            }
        }

        let indices = self.indices.read();
        let docs = indices
            .get(index)
            .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))?;

        let mut matched: Vec<SearchHit> = docs
            .iter()
            .filter(|(_, source)| matches_query(source, request.query.as_ref()))
            .map(|(id, source)| SearchHit {
                id: id.clone(),
                source: source.clone(),
                sort: sort_values(source, &request.sort),
            })
            .collect();
        drop(indices);

        let total = matched.len() as u64;
        matched.sort_by(|a, b| compare_tuples(&a.sort, &b.sort, &request.sort));

        if let Some(after) = &request.search_after {
            matched.retain(|hit| {
                compare_tuples(&hit.sort, after, &request.sort) == std::cmp::Ordering::Greater
            });
        }
        matched.truncate(request.size);

        Ok(SearchResponse {
            hits: matched,
            total,
        })
    }
}
