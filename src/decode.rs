use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;

use crate::{RequestError, Result};

/// Parses a success body. An empty body decodes to `null`.
pub(crate) fn parse_body(body: &str) -> Result<JsonValue> {
    if body.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    serde_json::from_str(body).map_err(|err| {
        RequestError::Decode(format!("invalid response JSON: {err}; body: {}", truncate(body)))
    })
}

pub(crate) fn decode_data<T: DeserializeOwned>(value: JsonValue) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|err| RequestError::Decode(format!("unexpected response shape: {err}")))
}

pub(crate) fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<JsonValue> {
    serde_json::to_value(body)
        .map_err(|err| RequestError::Encode(format!("invalid request body: {err}")))
}

fn truncate(body: &str) -> &str {
    const LIMIT: usize = 256;
    if body.len() <= LIMIT {
        return body;
    }
    let mut end = LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
