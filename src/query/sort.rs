//! Sort translation
//!
//! `field_ASC` / `field_DESC` tokens become a compound native sort, applied
//! in the order given. Timestamp fields sort on the field itself with an
//! explicit date type hint; other fields sort on their exact-match variant.

use std::fmt;

use serde_json::{json, Value};

use crate::error::{Error, Result};

/// Fields a list may be sorted by
pub const SORTABLE_FIELDS: &[&str] = &["id", "title", "createdOn", "savedOn"];

/// Sorted as dates; may be absent on some documents
const DATE_FIELDS: &[&str] = &["createdOn", "savedOn"];

/// Field that breaks ties between otherwise equal sort tuples
pub const TIE_BREAK_FIELD: &str = "id.keyword";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("asc"),
            SortOrder::Desc => f.write_str("desc"),
        }
    }
}

/// One native sort clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortClause {
    pub field: String,
    pub order: SortOrder,
    /// Type to assume when the field is unmapped
    pub unmapped_type: Option<String>,
}

impl SortClause {
    pub fn to_json(&self) -> Value {
        let mut options = json!({ "order": self.order.to_string() });
        if let Some(unmapped) = &self.unmapped_type {
            options["unmapped_type"] = json!(unmapped);
        }
        json!({ self.field.as_str(): options })
    }
}

/// Parse one `field_DIRECTION` token
pub fn parse_sort_token(token: &str) -> Result<SortClause> {
    let (field, direction) = token.rsplit_once('_').ok_or_else(|| {
        Error::validation(format!("sort token {:?} is not field_DIRECTION", token))
    })?;

    let order = match direction {
        "ASC" => SortOrder::Asc,
        "DESC" => SortOrder::Desc,
        other => {
            return Err(Error::validation(format!(
                "sort direction {:?} in {:?} must be ASC or DESC",
                other, token
            )))
        }
    };

    if !SORTABLE_FIELDS.contains(&field) {
        return Err(Error::validation(format!(
            "cannot sort by {:?}; sortable fields are {}",
            field,
            SORTABLE_FIELDS.join(", ")
        )));
    }

    Ok(if DATE_FIELDS.contains(&field) {
        SortClause {
            field: field.to_string(),
            order,
            unmapped_type: Some("date".to_string()),
        }
    } else {
        SortClause {
            field: format!("{}.keyword", field),
            order,
            unmapped_type: None,
        }
    })
}

/// Translate sort tokens into a compound sort
///
/// No tokens sorts by creation time, most recent first. An `id` tie-breaker
/// closes the list (unless `id` is already sorted on) so every document has
/// a unique position.
pub fn translate_sort(tokens: Option<&[String]>) -> Result<Vec<SortClause>> {
    let mut clauses = match tokens {
        Some(tokens) if !tokens.is_empty() => tokens
            .iter()
            .map(|t| parse_sort_token(t))
            .collect::<Result<Vec<_>>>()?,
        _ => vec![SortClause {
            field: "createdOn".to_string(),
            order: SortOrder::Desc,
            unmapped_type: Some("date".to_string()),
        }],
    };

    if !clauses.iter().any(|c| c.field == TIE_BREAK_FIELD) {
        clauses.push(SortClause {
            field: TIE_BREAK_FIELD.to_string(),
            order: SortOrder::Asc,
            unmapped_type: None,
        });
    }
    Ok(clauses)
}

/// Render a compound sort
pub fn sort_to_json(clauses: &[SortClause]) -> Value {
    Value::Array(clauses.iter().map(SortClause::to_json).collect())
}
