//! Error types for dualstore
//!
//! Every failure that crosses the core boundary is one of the kinds below.
//! Store-native errors (`BackendError`, `SearchError`) are caught at the
//! adapter boundary and re-wrapped here with their diagnostics preserved as
//! opaque context data.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Result type alias using dualstore's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Which leg of a mutation a store write error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WriteLeg {
    /// The combined primary + shadow batch submitted by the coordinator
    Batch,

    /// A primary-store-only write
    Primary,

    /// A shadow-only write (idempotent upsert/delete)
    Shadow,
}

/// Unified error type for dualstore operations
#[derive(Debug, Error)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("{entity} with id \"{id}\" not found.")]
    NotFound { entity: String, id: String },

    // -------------------------------------------------------------------------
    // Search Shadow Errors
    // -------------------------------------------------------------------------
    #[error("Search index \"{index}\" does not exist. Run the install operation to create it.")]
    IndexNotReady { index: String },

    #[error("Search store error [{code}]: {message}")]
    Search {
        code: String,
        message: String,
        context: Option<Value>,
    },

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("There is no tenant scope on the request.")]
    ScopeUnresolved,

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store write failed [{code}]: {message}")]
    StoreWrite {
        leg: WriteLeg,
        code: String,
        message: String,
        context: Option<Value>,
    },

    #[error("Store read failed [{code}]: {message}")]
    StoreRead {
        code: String,
        message: String,
        context: Option<Value>,
    },

    #[error("{operation} timed out after {after_ms} ms")]
    Timeout { operation: String, after_ms: u64 },
}

impl Error {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "NOT_FOUND",
            Error::IndexNotReady { .. } => "INDEX_NOT_READY",
            Error::Search { .. } => "SEARCH_ERROR",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::ScopeUnresolved => "SCOPE_UNRESOLVED",
            Error::StoreWrite { .. } => "STORE_WRITE_ERROR",
            Error::StoreRead { .. } => "STORE_READ_ERROR",
            Error::Timeout { .. } => "TIMEOUT",
        }
    }

    /// Structured diagnostics payload, if any
    pub fn data(&self) -> Option<Value> {
        match self {
            Error::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            Error::IndexNotReady { index } => Some(json!({ "index": index })),
            Error::Search {
                code,
                message,
                context,
            }
            | Error::StoreRead {
                code,
                message,
                context,
            } => Some(json!({ "code": code, "message": message, "context": context })),
            Error::StoreWrite {
                leg,
                code,
                message,
                context,
            } => Some(json!({
                "leg": leg,
                "code": code,
                "message": message,
                "context": context,
            })),
            Error::Timeout {
                operation,
                after_ms,
            } => Some(json!({ "operation": operation, "afterMs": after_ms })),
            Error::Validation(_) | Error::ScopeUnresolved => None,
        }
    }

    /// Whether the same call may be safely repeated
    ///
    /// Timeouts are retryable. Write failures are retryable only on the
    /// shadow leg, where upsert/delete are idempotent by key.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout { .. } => true,
            Error::StoreWrite { leg, .. } => *leg == WriteLeg::Shadow,
            _ => false,
        }
    }

    pub(crate) fn not_found(entity: &str, id: &str) -> Self {
        Error::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

/// Caller-facing error shape: code, message and optional diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<&Error> for ErrorResponse {
    fn from(error: &Error) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            data: error.data(),
        }
    }
}

impl From<Error> for ErrorResponse {
    fn from(error: Error) -> Self {
        Self::from(&error)
    }
}
