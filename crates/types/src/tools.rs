//! Tool invocation results and remote tool descriptors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform result of one tool invocation.
///
/// Every response shape the remote service can produce (single
/// document, SSE stream, line-delimited stream, queued result) is
/// reduced to this one form before it crosses the adapter boundary.
/// Failures are carried the same way; no error type ever leaves the
/// facade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolResult {
    /// Plain text payload, possibly pretty-printed JSON.
    Text {
        /// The rendered result or error message.
        text: String,
        /// Marks failure texts so callers can refuse to cache or
        /// post-process them. In-process only; never crosses the wire.
        #[serde(skip)]
        is_error: bool,
    },
}

impl ToolResult {
    /// Build a text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            is_error: false,
        }
    }

    /// Build a user-facing error result.
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self::Text {
            text: format!("Error: {}", message),
            is_error: true,
        }
    }

    /// Build a failure result whose text is already fully formatted.
    pub fn failure(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            is_error: true,
        }
    }

    /// Borrow the textual payload.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text { text, .. } => text,
        }
    }

    /// Whether this result reports a failure.
    pub fn is_error(&self) -> bool {
        match self {
            Self::Text { is_error, .. } => *is_error,
        }
    }
}

/// Metadata for one tool exposed by the remote catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool identifier used when invoking it.
    pub name: String,
    /// Human-friendly description supplied by the service.
    #[serde(default)]
    pub description: Option<String>,
    /// JSON schema describing the expected arguments.
    #[serde(default)]
    pub input_schema: Value,
}
