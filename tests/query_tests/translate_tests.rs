//! Tests for the Query Translator
//!
//! These tests verify:
//! - Each field-operator pair maps to exactly one clause
//! - Absent and empty filters both mean match-all
//! - Sort tokens, the default sort and the id tie-breaker
//! - Rejection of unknown filter keys and malformed sort tokens

use dualstore::query::{
    escape_query_string, parse_sort_token, query_to_json, sort_to_json, translate_filter,
    translate_sort, Clause, ListWhere, SortOrder, TIE_BREAK_FIELD,
};
use dualstore::Timestamp;
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn translate(value: serde_json::Value) -> serde_json::Value {
    let filter = ListWhere::from_json(value).unwrap();
    query_to_json(translate_filter(Some(&filter)).as_ref())
}

fn sort(list: &[&str]) -> dualstore::Result<Vec<dualstore::query::SortClause>> {
    let tokens: Vec<String> = list.iter().map(|s| s.to_string()).collect();
    translate_sort(Some(tokens.as_slice()))
}

// =============================================================================
// Filter Translation Tests
// =============================================================================

#[test]
fn test_empty_filter_is_match_all() {
    assert_eq!(translate_filter(None), None);
    assert_eq!(translate_filter(Some(&ListWhere::default())), None);
    assert_eq!(
        translate_filter(Some(&ListWhere::default())),
        translate_filter(None)
    );
    assert_eq!(translate(json!({})), json!({ "match_all": {} }));
    assert_eq!(translate(json!(null)), json!({ "match_all": {} }));
}

#[test]
fn test_id_operators() {
    assert_eq!(
        translate(json!({ "id": "a", "id_in": ["b", "c"], "id_not": "d", "id_not_in": ["e"] })),
        json!({
            "bool": {
                "must": [
                    { "term": { "id.keyword": "a" } },
                    { "terms": { "id.keyword": ["b", "c"] } }
                ],
                "must_not": [
                    { "term": { "id.keyword": "d" } },
                    { "terms": { "id.keyword": ["e"] } }
                ]
            }
        })
    );
}

#[test]
fn test_ranges_target_the_field_itself() {
    let value = translate(json!({
        "savedOn_gt": "2021-01-01T00:00:00.000Z",
        "createdOn_lt": "2021-02-01T00:00:00Z"
    }));

    assert_eq!(
        value,
        json!({
            "bool": {
                "must": [
                    { "range": { "savedOn": { "gt": "2021-01-01T00:00:00.000Z" } } },
                    { "range": { "createdOn": { "lt": "2021-02-01T00:00:00.000Z" } } }
                ],
                "must_not": []
            }
        })
    );
}

#[test]
fn test_contains_builds_escaped_wildcards() {
    let filter = ListWhere {
        title_contains: Some("a+b (c)".into()),
        title_not_contains: Some("draft".into()),
        ..Default::default()
    };
    let query = translate_filter(Some(&filter)).unwrap();

    assert_eq!(
        query.must,
        vec![Clause::QueryString {
            fields: vec!["title".into()],
            query: r"*a\+b\ \(c\)*".into(),
            allow_leading_wildcard: true,
        }]
    );
    assert_eq!(
        query.must_not[0].to_json(),
        json!({
            "query_string": {
                "allow_leading_wildcard": true,
                "fields": ["title"],
                "query": "*draft*"
            }
        })
    );
}

#[test]
fn test_boolean_field_uses_keyword_variant() {
    assert_eq!(
        translate(json!({ "isNice": false })),
        json!({ "bool": { "must": [ { "term": { "isNice.keyword": false } } ], "must_not": [] } })
    );
}

#[test]
fn test_empty_strings_add_no_clause() {
    let filter = ListWhere {
        id: Some(String::new()),
        title_contains: Some(String::new()),
        ..Default::default()
    };
    assert_eq!(translate_filter(Some(&filter)), None);
}

#[test]
fn test_unknown_filter_keys_are_rejected() {
    let err = ListWhere::from_json(json!({ "title_startsWith": "x" })).unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let err = ListWhere::from_json(json!({ "createdOn_gt": "not a date" })).unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn test_filter_round_trips_through_json() {
    let filter = ListWhere {
        saved_on_gt: Some(Timestamp::parse("2021-01-01T00:00:00.000Z").unwrap()),
        is_nice: Some(true),
        ..Default::default()
    };
    let value = serde_json::to_value(&filter).unwrap();
    assert_eq!(value, json!({ "savedOn_gt": "2021-01-01T00:00:00.000Z", "isNice": true }));
    assert_eq!(ListWhere::from_json(value).unwrap(), filter);
}

#[test]
fn test_escape_query_string() {
    assert_eq!(escape_query_string("plain"), "plain");
    assert_eq!(escape_query_string("a:b/c"), r"a\:b\/c");
    assert_eq!(escape_query_string(r"50% \o/"), r"50%\ \\o\/");
}

// =============================================================================
// Sort Translation Tests
// =============================================================================

#[test]
fn test_default_sort_is_newest_first() {
    let default = translate_sort(None).unwrap();
    assert_eq!(default, sort(&[]).unwrap());

    assert_eq!(
        sort_to_json(&default),
        json!([
            { "createdOn": { "order": "desc", "unmapped_type": "date" } },
            { "id.keyword": { "order": "asc" } }
        ])
    );
}

#[test]
fn test_sort_tokens_apply_in_order() {
    let clauses = sort(&["title_DESC", "savedOn_ASC"]).unwrap();

    assert_eq!(
        sort_to_json(&clauses),
        json!([
            { "title.keyword": { "order": "desc" } },
            { "savedOn": { "order": "asc", "unmapped_type": "date" } },
            { "id.keyword": { "order": "asc" } }
        ])
    );
}

#[test]
fn test_tie_breaker_is_not_repeated() {
    let clauses = sort(&["id_DESC"]).unwrap();
    assert_eq!(clauses.len(), 1);
    assert_eq!(clauses[0].field, TIE_BREAK_FIELD);
    assert_eq!(clauses[0].order, SortOrder::Desc);
}

#[test]
fn test_field_names_may_contain_underscores_before_direction() {
    // Direction is taken from the last underscore
    let err = parse_sort_token("created_On_ASC").unwrap_err();
    assert!(err.to_string().contains("created_On"));
}

#[test]
fn test_malformed_sort_tokens_are_rejected() {
    for token in ["title", "title_asc", "title_", "_ASC", "unknown_DESC", ""] {
        let err = parse_sort_token(token).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR", "token {:?}", token);
    }
    assert!(sort(&["title_ASC", "bogus"]).is_err());
}
