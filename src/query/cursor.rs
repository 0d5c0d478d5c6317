//! Pagination cursor codec
//!
//! A cursor is the search store's position marker (the sort values of the
//! last returned hit) rendered as base64 JSON. Callers treat it as opaque:
//! it comes from one list response and goes into the next list request.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;

use crate::error::{Error, Result};

/// Search-after tuple: one value per sort clause
pub type PositionMarker = Vec<Value>;

// Decode bound for untrusted token input.
pub const MAX_CURSOR_LEN: usize = 8 * 1024;

/// Encode a position marker; `None` stays `None`
pub fn encode_cursor(marker: Option<&PositionMarker>) -> Option<String> {
    let marker = marker?;
    // A Vec<Value> always serializes.
    let json = serde_json::to_vec(marker).ok()?;
    Some(BASE64.encode(json))
}

/// Decode a cursor token; `None` or an empty token yields `None`
///
/// Anything that is not a base64 JSON array is a client error.
pub fn decode_cursor(token: Option<&str>) -> Result<Option<PositionMarker>> {
    let token = match token.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(token) => token,
    };

    if token.len() > MAX_CURSOR_LEN {
        return Err(Error::validation(format!(
            "cursor is {} characters long (max {})",
            token.len(),
            MAX_CURSOR_LEN
        )));
    }

    let bytes = BASE64
        .decode(token)
        .map_err(|e| Error::validation(format!("malformed cursor: {}", e)))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Array(marker)) => Ok(Some(marker)),
        Ok(_) => Err(Error::validation("malformed cursor: not a position marker")),
        Err(e) => Err(Error::validation(format!("malformed cursor: {}", e))),
    }
}
