//! Filter translation
//!
//! Every field-operator pair becomes exactly one clause in either the
//! `must` or the `must_not` list of a boolean query. An absent or empty
//! filter translates to `None`, which the search store reads as match-all.

use serde_json::{json, Value};

use super::ListWhere;

/// One native search clause
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Exact match
    Term { field: String, value: Value },

    /// Exact match against any of several values
    Terms { field: String, values: Vec<Value> },

    /// Half-open range; only the given bounds apply
    Range {
        field: String,
        gt: Option<Value>,
        lt: Option<Value>,
    },

    /// Wildcard text query
    QueryString {
        fields: Vec<String>,
        query: String,
        allow_leading_wildcard: bool,
    },
}

impl Clause {
    /// Render in the search store's JSON query language
    pub fn to_json(&self) -> Value {
        match self {
            Clause::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Clause::Terms { field, values } => json!({ "terms": { field.as_str(): values } }),
            Clause::Range { field, gt, lt } => {
                let mut bounds = serde_json::Map::new();
                if let Some(gt) = gt {
                    bounds.insert("gt".into(), gt.clone());
                }
                if let Some(lt) = lt {
                    bounds.insert("lt".into(), lt.clone());
                }
                json!({ "range": { field.as_str(): bounds } })
            }
            Clause::QueryString {
                fields,
                query,
                allow_leading_wildcard,
            } => json!({
                "query_string": {
                    "allow_leading_wildcard": allow_leading_wildcard,
                    "fields": fields,
                    "query": query,
                }
            }),
        }
    }
}

/// Boolean query: all `must` clauses match and no `must_not` clause does
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    pub must: Vec<Clause>,
    pub must_not: Vec<Clause>,
}

impl BoolQuery {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "bool": {
                "must": self.must.iter().map(Clause::to_json).collect::<Vec<_>>(),
                "must_not": self.must_not.iter().map(Clause::to_json).collect::<Vec<_>>(),
            }
        })
    }
}

/// Render an optional query; `None` is match-all
pub fn query_to_json(query: Option<&BoolQuery>) -> Value {
    match query {
        Some(query) => query.to_json(),
        None => json!({ "match_all": {} }),
    }
}

/// Translate a filter into a boolean query
pub fn translate_filter(filter: Option<&ListWhere>) -> Option<BoolQuery> {
    let filter = filter?;
    let mut query = BoolQuery::default();

    if let Some(id) = non_empty(&filter.id) {
        query.must.push(term("id.keyword", json!(id)));
    }
    if let Some(ids) = &filter.id_in {
        query.must.push(terms("id.keyword", ids));
    }
    if let Some(id) = non_empty(&filter.id_not) {
        query.must_not.push(term("id.keyword", json!(id)));
    }
    if let Some(ids) = &filter.id_not_in {
        query.must_not.push(terms("id.keyword", ids));
    }

    if let Some(ts) = &filter.saved_on_gt {
        query.must.push(range("savedOn", Some(json!(ts)), None));
    }
    if let Some(ts) = &filter.saved_on_lt {
        query.must.push(range("savedOn", None, Some(json!(ts))));
    }
    if let Some(ts) = &filter.created_on_gt {
        query.must.push(range("createdOn", Some(json!(ts)), None));
    }
    if let Some(ts) = &filter.created_on_lt {
        query.must.push(range("createdOn", None, Some(json!(ts))));
    }

    if let Some(text) = non_empty(&filter.title_contains) {
        query.must.push(contains("title", text));
    }
    if let Some(text) = non_empty(&filter.title_not_contains) {
        query.must_not.push(contains("title", text));
    }
    if let Some(is_nice) = filter.is_nice {
        query.must.push(term("isNice.keyword", json!(is_nice)));
    }

    if query.is_empty() {
        None
    } else {
        Some(query)
    }
}

/// Escape query_string syntax so `text` is matched literally
pub fn escape_query_string(text: &str) -> String {
    const RESERVED: &[char] = &[
        '+', '-', '=', '&', '|', '>', '<', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~',
        '*', '?', ':', '\\', '/',
    ];
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) || c.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn term(field: &str, value: Value) -> Clause {
    Clause::Term {
        field: field.to_string(),
        value,
    }
}

fn terms(field: &str, values: &[String]) -> Clause {
    Clause::Terms {
        field: field.to_string(),
        values: values.iter().map(|v| json!(v)).collect(),
    }
}

fn range(field: &str, gt: Option<Value>, lt: Option<Value>) -> Clause {
    Clause::Range {
        field: field.to_string(),
        gt,
        lt,
    }
}

fn contains(field: &str, text: &str) -> Clause {
    Clause::QueryString {
        fields: vec![field.to_string()],
        query: format!("*{}*", escape_query_string(text)),
        allow_leading_wildcard: true,
    }
}
