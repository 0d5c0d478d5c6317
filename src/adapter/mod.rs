//! Adapter Module
//!
//! The two store adapters the core talks to. Each owns one half of the
//! persisted state and is the only place its store's native errors are
//! translated into `dualstore::Error`.
//!
//! ## Responsibilities
//! - `RecordStoreAdapter`: keyed CRUD on primary rows
//! - `SearchShadowAdapter`: shadow rows, index lifecycle and search queries
//! - `bounded`: every store call finishes or fails with `TIMEOUT`

mod record;
mod shadow;

pub use record::{PrimaryRow, RecordStoreAdapter};
pub use shadow::{SearchPage, SearchShadowAdapter, ShadowDocument, ShadowRow};

use std::future::Future;
use std::time::Duration;

use crate::backend::BackendError;
use crate::error::{Error, Result, WriteLeg};
use crate::search::SearchError;

/// Run a store call, failing with `TIMEOUT` once `limit` elapses
///
/// The pending call is dropped on expiry. A write the store has already
/// taken over may still commit after the `TIMEOUT` is returned.
pub async fn bounded<T, F>(operation: &str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(operation, after_ms = limit.as_millis() as u64, "store call timed out");
            Err(Error::Timeout {
                operation: operation.to_string(),
                after_ms: limit.as_millis() as u64,
            })
        }
    }
}

// =============================================================================
// Store Error Wrapping
// =============================================================================

pub(crate) fn write_error(leg: WriteLeg, error: BackendError) -> Error {
    Error::StoreWrite {
        leg,
        code: error.code,
        message: error.message,
        context: error.context,
    }
}

pub(crate) fn read_error(error: BackendError) -> Error {
    Error::StoreRead {
        code: error.code,
        message: error.message,
        context: error.context,
    }
}

/// A missing index is `INDEX_NOT_READY`, never an empty result
pub(crate) fn search_error(error: SearchError) -> Error {
    match error {
        SearchError::IndexNotFound(index) => Error::IndexNotReady { index },
        other => Error::Search {
            code: other.code().to_string(),
            message: other.to_string(),
            context: None,
        },
    }
}
