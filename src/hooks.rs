//! Before/after interception points around each request attempt.
//!
//! Hooks observe; they cannot alter a request, its outcome, or retry flow.

use std::{fmt, time::Duration};

use serde_json::Value as JsonValue;

use crate::{Method, Params};

/// Emitted before each attempt.
#[derive(Debug)]
pub struct RequestStarted<'a> {
    pub method: Method,
    pub url: &'a str,
    pub params: &'a Params,
    /// JSON body of a write, if any.
    pub body: Option<&'a JsonValue>,
    pub attempt: u32,
}

/// How an attempt ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttemptOutcome<'a> {
    /// A response was received with this status.
    Status(u16),
    /// No response; carries the transport description.
    TransportFailure(&'a str),
}

/// Emitted after each attempt.
#[derive(Debug)]
pub struct RequestFinished<'a> {
    pub method: Method,
    pub url: &'a str,
    pub attempt: u32,
    pub outcome: AttemptOutcome<'a>,
    pub elapsed: Duration,
}

pub trait RequestHook: Send + Sync + fmt::Debug {
    fn on_request(&self, _event: &RequestStarted<'_>) {}

    fn on_response(&self, _event: &RequestFinished<'_>) {}
}

/// Logs every attempt through `tracing`.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingHook;

#[cfg(feature = "tracing")]
impl RequestHook for TracingHook {
    fn on_request(&self, event: &RequestStarted<'_>) {
        tracing::debug!(
            method = %event.method,
            url = event.url,
            params = %event.params.canonical(),
            body = ?event.body,
            attempt = event.attempt,
            "api request"
        );
    }

    fn on_response(&self, event: &RequestFinished<'_>) {
        let elapsed_ms = event.elapsed.as_millis() as u64;
        match event.outcome {
            AttemptOutcome::Status(status) => tracing::debug!(
                method = %event.method,
                url = event.url,
                status,
                elapsed_ms,
                "api response"
            ),
            AttemptOutcome::TransportFailure(error) => tracing::debug!(
                method = %event.method,
                url = event.url,
                error,
                elapsed_ms,
                "api request failed without response"
            ),
        }
    }
}
