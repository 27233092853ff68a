/// Failure raised by a [`Transport`](crate::Transport) when no response was received.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// The attempt exceeded its per-request timeout.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// DNS resolution or TCP/TLS connection failed.
    #[error("connection failed: {0}")]
    Connect(String),
    /// Any other failure before a status line was read.
    #[error("transport error: {0}")]
    Other(String),
}

/// Raw failure of a single request attempt.
///
/// This never crosses the client boundary; [`normalize`](crate::normalize::normalize)
/// turns it into an [`ApiError`](crate::ApiError).
#[derive(Clone, Debug, thiserror::Error)]
pub enum RequestError {
    /// No response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Non-success HTTP status code with raw response body.
    #[error("request failed with status code {status}")]
    Http { status: u16, body: String },
    /// The request body could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),
    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl RequestError {
    /// HTTP status attached to this failure, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Misconfiguration detected while building a client.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("retries must be at least 1, got {0}")]
    ZeroRetries(u32),
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    #[error("invalid base url '{url}': {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },
    #[error("invalid value for {var}: '{value}'")]
    Env { var: String, value: String },
    #[error("failed to build http client: {0}")]
    Http(String),
}
