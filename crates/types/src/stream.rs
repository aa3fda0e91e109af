//! Event model for streaming responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classified kind of one streamed event.
///
/// The remote service uses several wire names for the same concept;
/// classification happens once, when the event is parsed, so the
/// aggregation logic never re-inspects wire strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventKind {
    /// Explicit query result carried in a single event.
    Data,
    /// Terminal error for the operation.
    Error,
    /// Partial tabular result (columns/rows).
    Chunk,
    /// Informational progress report; never part of the final result.
    Progress,
    /// Operation finished; may carry a final result.
    Completion,
    /// Anything the adapter does not recognize.
    Unknown,
}

impl StreamEventKind {
    /// Map a wire-level event type name onto a kind.
    pub fn from_wire(name: &str) -> Self {
        match name {
            "query_result" | "data" => Self::Data,
            "error" | "operation_error" => Self::Error,
            "query_chunk" | "chunk" => Self::Chunk,
            "progress" | "operation_progress" => Self::Progress,
            "complete" | "completed" | "operation_completed" | "query_completed" => Self::Completion,
            _ => Self::Unknown,
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error | Self::Completion)
    }
}

/// One event observed while normalizing a streaming response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Classified event kind.
    pub kind: StreamEventKind,
    /// Full structured payload as received.
    pub payload: Value,
}

impl StreamEvent {
    /// Parse an event from its structured payload, classifying it by
    /// the payload's `type` field.
    pub fn from_payload(payload: Value) -> Self {
        let kind = payload
            .get("type")
            .and_then(Value::as_str)
            .map(StreamEventKind::from_wire)
            .unwrap_or(StreamEventKind::Unknown);
        Self { kind, payload }
    }

    /// The error message carried by an error event, when present.
    pub fn error_message(&self) -> Option<&str> {
        self.payload
            .get("message")
            .or_else(|| self.payload.get("error"))
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_map_to_kinds() {
        assert_eq!(StreamEventKind::from_wire("query_chunk"), StreamEventKind::Chunk);
        assert_eq!(StreamEventKind::from_wire("chunk"), StreamEventKind::Chunk);
        assert_eq!(StreamEventKind::from_wire("operation_completed"), StreamEventKind::Completion);
        assert_eq!(StreamEventKind::from_wire("operation_progress"), StreamEventKind::Progress);
        assert_eq!(StreamEventKind::from_wire("something_else"), StreamEventKind::Unknown);
    }

    #[test]
    fn terminal_kinds() {
        assert!(StreamEventKind::Error.is_terminal());
        assert!(StreamEventKind::Completion.is_terminal());
        assert!(!StreamEventKind::Progress.is_terminal());
        assert!(!StreamEventKind::Chunk.is_terminal());
    }

    #[test]
    fn event_classified_from_type_field() {
        let event = StreamEvent::from_payload(json!({"type": "error", "message": "boom"}));
        assert_eq!(event.kind, StreamEventKind::Error);
        assert_eq!(event.error_message(), Some("boom"));
    }

    #[test]
    fn missing_type_is_unknown() {
        let event = StreamEvent::from_payload(json!({"rows": []}));
        assert_eq!(event.kind, StreamEventKind::Unknown);
    }
}
