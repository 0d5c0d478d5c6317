//! Query Module
//!
//! Turns a declarative list request into the search store's native query.
//!
//! ## Responsibilities
//! - Filter specification (`ListWhere`) → boolean query (`must` / `must_not`)
//! - Sort tokens → compound sort with a default of newest first
//! - Opaque cursor ↔ position marker
//!
//! ## Native Query Shape
//! ```text
//! {
//!   "query": { "bool": { "must": [...], "must_not": [...] } }  | { "match_all": {} },
//!   "sort": [ { "createdOn": { "order": "desc", "unmapped_type": "date" } },
//!             { "id.keyword": { "order": "asc" } } ],
//!   "size": 51,
//!   "search_after": [ ... ]
//! }
//! ```

mod cursor;
mod filter;
mod sort;
mod translate;

pub use cursor::{decode_cursor, encode_cursor, PositionMarker, MAX_CURSOR_LEN};
pub use filter::ListWhere;
pub use sort::{
    parse_sort_token, sort_to_json, translate_sort, SortClause, SortOrder, SORTABLE_FIELDS,
    TIE_BREAK_FIELD,
};
pub use translate::{escape_query_string, query_to_json, translate_filter, BoolQuery, Clause};
