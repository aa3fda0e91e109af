//! Line-delimited (NDJSON) stream collection.
//!
//! Reads the body incrementally, splitting on line boundaries. The
//! trailing partial line is retained across reads and parsed once the
//! stream ends. A line that fails to parse is dropped with a note and
//! the stream continues.

use futures_util::StreamExt;
use tracing::warn;

use graphlink_types::StreamEvent;

use crate::error::ClientError;

/// Collect one event per complete line from an NDJSON body.
pub(crate) async fn collect_events(response: reqwest::Response) -> Result<Vec<StreamEvent>, ClientError> {
    let mut stream = response.bytes_stream();
    let mut buf = Vec::<u8>::new();
    let mut events = Vec::new();

    while let Some(chunk) = stream.next().await {
        let bytes = chunk.map_err(|e| ClientError::transport(e.to_string()))?;
        buf.extend_from_slice(&bytes);
        while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buf.drain(..=pos).collect();
            push_line(&line[..pos], &mut events);
        }
    }
    // The stream may end without a final newline.
    push_line(&buf, &mut events);

    Ok(events)
}

fn push_line(raw: &[u8], events: &mut Vec<StreamEvent>) {
    let Ok(text) = std::str::from_utf8(raw) else {
        warn!(target: "graphlink_ndjson", "dropping non-UTF-8 line");
        return;
    };
    let line = text.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str(line) {
        Ok(payload) => events.push(StreamEvent::from_payload(payload)),
        Err(err) => {
            warn!(target: "graphlink_ndjson", error = %err, "dropping undecodable line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlink_types::StreamEventKind;

    #[test]
    fn lines_parse_into_events() {
        let mut events = Vec::new();
        push_line(br#"{"type": "chunk", "data": [[1]]}"#, &mut events);
        push_line(br#"{"type": "complete"}"#, &mut events);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, StreamEventKind::Chunk);
        assert_eq!(events[1].kind, StreamEventKind::Completion);
    }

    #[test]
    fn undecodable_lines_are_dropped_without_failing() {
        let mut events = Vec::new();
        push_line(br#"{"type": "chunk"}"#, &mut events);
        push_line(b"not json at all", &mut events);
        push_line(br#"{"type": "complete"}"#, &mut events);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn blank_lines_are_ignored() {
        let mut events = Vec::new();
        push_line(b"", &mut events);
        push_line(b"   ", &mut events);
        assert!(events.is_empty());
    }
}
