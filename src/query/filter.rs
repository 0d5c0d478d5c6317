//! Filter specification
//!
//! Field-operator pairs (`title_contains`, `id_not_in`, `createdOn_gt`, ...)
//! mapped to typed values. Built per request and translated immediately.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::Timestamp;

/// `where` argument of a list request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListWhere {
    // system fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_in: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_not: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_not_in: Option<Vec<String>>,
    #[serde(default, rename = "savedOn_gt", skip_serializing_if = "Option::is_none")]
    pub saved_on_gt: Option<Timestamp>,
    #[serde(default, rename = "savedOn_lt", skip_serializing_if = "Option::is_none")]
    pub saved_on_lt: Option<Timestamp>,
    #[serde(default, rename = "createdOn_gt", skip_serializing_if = "Option::is_none")]
    pub created_on_gt: Option<Timestamp>,
    #[serde(default, rename = "createdOn_lt", skip_serializing_if = "Option::is_none")]
    pub created_on_lt: Option<Timestamp>,

    // domain fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_not_contains: Option<String>,
    #[serde(default, rename = "isNice", skip_serializing_if = "Option::is_none")]
    pub is_nice: Option<bool>,
}

impl ListWhere {
    /// Parse from a JSON object, rejecting unknown field-operator pairs
    ///
    /// `null` yields an empty filter.
    pub fn from_json(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
            .map_err(|e| Error::validation(format!("invalid filter: {}", e)))
    }

    /// No field-operator pair is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
