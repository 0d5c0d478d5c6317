//! Query evaluation over JSON documents
//!
//! Field names may carry a `.keyword` suffix (exact-match variant); it
//! resolves to the field itself. Dotted paths walk nested objects.

use std::cmp::Ordering;

use serde_json::Value;

use crate::query::{BoolQuery, Clause, SortClause, SortOrder};

const KEYWORD_SUFFIX: &str = ".keyword";

static MISSING: Value = Value::Null;

/// Look up a field, `Value::Null` when absent
fn resolve<'a>(doc: &'a Value, field: &str) -> &'a Value {
    let path = field.strip_suffix(KEYWORD_SUFFIX).unwrap_or(field);
    let mut current = doc;
    for part in path.split('.') {
        current = match current.get(part) {
            Some(value) => value,
            None => return &MISSING,
        };
    }
    current
}

/// Equality with the search store's leniency: `"true"` matches `true`
fn values_equal(doc_value: &Value, query_value: &Value) -> bool {
    if doc_value == query_value {
        return true;
    }
    match (doc_value, query_value) {
        (Value::String(s), other @ (Value::Bool(_) | Value::Number(_)))
        | (other @ (Value::Bool(_) | Value::Number(_)), Value::String(s)) => {
            *s == other.to_string()
        }
        _ => false,
    }
}

/// Any element of an array field counts
fn field_matches<F>(doc_value: &Value, mut predicate: F) -> bool
where
    F: FnMut(&Value) -> bool,
{
    match doc_value {
        Value::Null => false,
        Value::Array(items) => items.iter().any(|item| predicate(item)),
        value => predicate(value),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON scalars; mixed types order by type
pub fn compare_sort_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn clause_matches(doc: &Value, clause: &Clause) -> bool {
    match clause {
        Clause::Term { field, value } => {
            field_matches(resolve(doc, field), |v| values_equal(v, value))
        }
        Clause::Terms { field, values } => field_matches(resolve(doc, field), |v| {
            values.iter().any(|candidate| values_equal(v, candidate))
        }),
        Clause::Range { field, gt, lt } => field_matches(resolve(doc, field), |v| {
            let above = gt
                .as_ref()
                .map_or(true, |gt| compare_sort_values(v, gt) == Ordering::Greater);
            let below = lt
                .as_ref()
                .map_or(true, |lt| compare_sort_values(v, lt) == Ordering::Less);
            above && below
        }),
        Clause::QueryString { fields, query, .. } => fields.iter().any(|field| {
            field_matches(resolve(doc, field), |v| match v {
                Value::String(s) => wildcard_match(query, s),
                other => wildcard_match(query, &other.to_string()),
            })
        }),
    }
}

/// Whether a document satisfies a query (`None` matches everything)
pub fn matches_query(doc: &Value, query: Option<&BoolQuery>) -> bool {
    let Some(query) = query else {
        return true;
    };
    query.must.iter().all(|c| clause_matches(doc, c))
        && !query.must_not.iter().any(|c| clause_matches(doc, c))
}

/// Sort values of a document, one per clause (`Null` when missing)
pub fn sort_values(doc: &Value, sort: &[SortClause]) -> Vec<Value> {
    sort.iter().map(|c| resolve(doc, &c.field).clone()).collect()
}

/// Order two sort tuples; missing values sort last in either direction
pub fn compare_tuples(a: &[Value], b: &[Value], sort: &[SortClause]) -> Ordering {
    for (i, clause) in sort.iter().enumerate() {
        let (x, y) = (&a[i], &b[i]);
        let ordering = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let natural = compare_sort_values(x, y);
                match clause.order {
                    SortOrder::Asc => natural,
                    SortOrder::Desc => natural.reverse(),
                }
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Literal(char),
    AnyOne,
    AnyMany,
}

fn compile(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '\\' => match chars.next() {
                Some(escaped) => Token::Literal(escaped),
                None => Token::Literal('\\'),
            },
            '*' => Token::AnyMany,
            '?' => Token::AnyOne,
            c => Token::Literal(c),
        });
    }
    tokens
}

/// Case-insensitive wildcard match (`*` any run, `?` any one, `\` escapes)
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let tokens = compile(&pattern.to_lowercase());
    let text: Vec<char> = text.to_lowercase().chars().collect();

    let (mut t, mut p) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(Token::AnyMany) => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(Token::AnyOne) => {
                p += 1;
                t += 1;
            }
            Some(Token::Literal(c)) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    backtrack = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    tokens[p..].iter().all(|token| *token == Token::AnyMany)
}
