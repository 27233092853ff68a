//! Converts raw request failures into [`ApiError`].

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{wire::ErrorBody, RequestError, TransportError};

/// Status used when no backend status is available.
pub const DEFAULT_ERROR_CODE: u16 = 500;

const UNKNOWN_ERROR: &str = "Unknown error";

/// Uniform error shape for every failure surfaced by the client.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApiError {
    /// HTTP status of the backend response, or 500.
    pub code: u16,
    pub message: String,
    /// Backend error payload, when one was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for ApiError {}

/// Builds an [`ApiError`] from any request failure.
///
/// The code is the backend status or [`DEFAULT_ERROR_CODE`]; the message is
/// the backend's `message`/`error` field, then the failure description,
/// then `"Unknown error"`.
pub fn normalize(err: &RequestError) -> ApiError {
    let details = match err {
        RequestError::Http { body, .. } => parse_details(body),
        _ => None,
    };

    let backend_message = details
        .as_ref()
        .and_then(|details| serde_json::from_value::<ErrorBody>(details.clone()).ok())
        .and_then(ErrorBody::into_message);

    let message = backend_message
        .or_else(|| describe(err))
        .unwrap_or_else(|| UNKNOWN_ERROR.to_owned());

    ApiError {
        code: err.status().unwrap_or(DEFAULT_ERROR_CODE),
        message,
        details,
    }
}

fn parse_details(body: &str) -> Option<JsonValue> {
    if body.trim().is_empty() {
        return None;
    }
    Some(
        serde_json::from_str(body).unwrap_or_else(|_| JsonValue::String(body.to_owned())),
    )
}

fn describe(err: &RequestError) -> Option<String> {
    let detail = match err {
        RequestError::Transport(
            TransportError::Timeout(detail)
            | TransportError::Connect(detail)
            | TransportError::Other(detail),
        ) => detail.as_str(),
        RequestError::Encode(detail) | RequestError::Decode(detail) => detail.as_str(),
        RequestError::Http { .. } => return Some(err.to_string()),
    };
    (!detail.trim().is_empty()).then(|| err.to_string())
}
