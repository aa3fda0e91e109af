//! Error types for the Graphlink client.

use thiserror::Error;

/// Main error type for remote operations.
///
/// Only the retry executor decides whether an error is worth another
/// attempt; every other layer either recovers locally or turns the
/// error into a terminal text result.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The remote service answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request never produced a usable response (connect failure,
    /// reset, body read error).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// A deadline elapsed before a terminal event or status arrived.
    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// The stream delivered an explicit error event.
    #[error("Stream error: {message}")]
    Stream { message: String },

    /// A response unit could not be decoded.
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// A workspace operation was rejected locally or remotely.
    #[error("Session error: {message}")]
    Session { message: String },

    /// Client configuration is unusable.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ClientError {
    /// Create an HTTP status error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a stream error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream { message: message.into() }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }

    /// Create a session error.
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session { message: message.into() }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Whether the retry executor may attempt this operation again.
    ///
    /// Authentication and malformed-request conditions are final:
    /// HTTP 400/401/403 by status, or any error whose message signals
    /// one of those conditions. Timeouts are final too; a stream that
    /// sat idle for the full window is not worth re-running. Everything
    /// else (transport faults, 5xx, other 4xx) is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => !matches!(status, 400 | 401 | 403),
            Self::Timeout { .. } => false,
            other => {
                let message = other.to_string().to_lowercase();
                !["400", "401", "403", "unauthorized", "forbidden", "bad request"]
                    .iter()
                    .any(|marker| message.contains(marker))
            }
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::http(status.as_u16(), err.to_string()),
            None => Self::transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_bad_request_statuses_are_final() {
        assert!(!ClientError::http(400, "bad request").is_retryable());
        assert!(!ClientError::http(401, "unauthorized").is_retryable());
        assert!(!ClientError::http(403, "forbidden").is_retryable());
    }

    #[test]
    fn server_and_other_client_statuses_are_retryable() {
        assert!(ClientError::http(500, "internal").is_retryable());
        assert!(ClientError::http(503, "unavailable").is_retryable());
        assert!(ClientError::http(429, "too many requests").is_retryable());
        assert!(ClientError::http(404, "not found").is_retryable());
    }

    #[test]
    fn message_markers_make_non_http_errors_final() {
        assert!(!ClientError::transport("server said 401").is_retryable());
        assert!(!ClientError::transport("Forbidden by proxy").is_retryable());
        assert!(ClientError::transport("connection reset").is_retryable());
        assert!(ClientError::stream("chunk decode gave up").is_retryable());
    }

    #[test]
    fn timeouts_are_final() {
        assert!(!ClientError::timeout("event stream", 300_000).is_retryable());
    }
}
