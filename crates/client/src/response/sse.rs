//! Server-Sent Events collection and frame parsing.
//!
//! Reads an event-stream body incrementally, parsing complete frames
//! out of a byte buffer and classifying each `data:` payload into a
//! [`StreamEvent`]. Collection ends on a terminal event, on stream
//! end, or when the governing pooled connection is closed. A dedicated
//! timeout bounds how long the adapter waits for a terminal event.

use std::time::Duration;

use futures_util::StreamExt;
use tracing::{debug, warn};

use graphlink_types::{StreamEvent, StreamEventKind};

use crate::error::ClientError;
use crate::pool::StreamConnection;

/// Abort the stream if no terminal event arrives in time.
pub const SSE_TIMEOUT: Duration = Duration::from_secs(300);

/// Collect events from an SSE response, bounded by [`SSE_TIMEOUT`].
///
/// The connection is closed on timeout; callers release it from the
/// pool regardless of the outcome.
pub(crate) async fn collect_events(
    response: reqwest::Response,
    conn: &StreamConnection,
) -> Result<Vec<StreamEvent>, ClientError> {
    match tokio::time::timeout(SSE_TIMEOUT, collect(response, conn)).await {
        Ok(events) => events,
        Err(_) => {
            conn.close();
            Err(ClientError::timeout("event stream", SSE_TIMEOUT.as_millis() as u64))
        }
    }
}

async fn collect(
    response: reqwest::Response,
    conn: &StreamConnection,
) -> Result<Vec<StreamEvent>, ClientError> {
    let mut stream = response.bytes_stream();
    let mut buf = Vec::<u8>::new();
    let mut events = Vec::new();

    loop {
        let chunk = tokio::select! {
            _ = conn.cancelled() => {
                // The pool closed the connection underneath us.
                return partial_or_err(events, "connection closed while streaming");
            }
            chunk = stream.next() => chunk,
        };

        let bytes = match chunk {
            // Stream ended without an explicit terminal event; whatever
            // arrived is the result.
            None => return Ok(events),
            Some(Ok(bytes)) => bytes,
            Some(Err(err)) => {
                // Hard transport error: partial results are preferred
                // over total failure.
                conn.close();
                return partial_or_err(events, &err.to_string());
            }
        };

        buf.extend_from_slice(&bytes);
        while let Some((end, sep_len)) = find_frame_end(&buf) {
            let frame_bytes: Vec<u8> = buf.drain(..end + sep_len).collect();
            let Ok(text) = std::str::from_utf8(&frame_bytes[..end]) else {
                warn!(target: "graphlink_sse", "dropping non-UTF-8 frame");
                continue;
            };
            let Some(data) = parse_sse_frame(text) else {
                continue;
            };
            match serde_json::from_str(&data) {
                Ok(payload) => {
                    let event = StreamEvent::from_payload(payload);
                    match event.kind {
                        StreamEventKind::Error => {
                            let message = event
                                .error_message()
                                .unwrap_or("stream reported an error")
                                .to_string();
                            conn.close();
                            return Err(ClientError::stream(message));
                        }
                        StreamEventKind::Completion => {
                            events.push(event);
                            conn.close();
                            return Ok(events);
                        }
                        StreamEventKind::Progress => {
                            debug!(target: "graphlink_sse", payload = %event.payload, "progress");
                            events.push(event);
                        }
                        _ => events.push(event),
                    }
                }
                Err(err) => {
                    // Malformed data is non-fatal; skip the frame.
                    warn!(target: "graphlink_sse", error = %err, "dropping undecodable frame");
                }
            }
        }
    }
}

/// A transport-level failure still succeeds when events were already
/// collected.
fn partial_or_err(events: Vec<StreamEvent>, message: &str) -> Result<Vec<StreamEvent>, ClientError> {
    if events.is_empty() {
        Err(ClientError::transport(message))
    } else {
        debug!(target: "graphlink_sse", collected = events.len(), "keeping partial results: {}", message);
        Ok(events)
    }
}

/// Find the end of the first complete SSE frame, returning the frame
/// length and the separator length.
fn find_frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    for i in 0..buf.len() {
        if buf[i..].starts_with(b"\r\n\r\n") {
            return Some((i, 4));
        }
        if buf[i..].starts_with(b"\n\n") {
            return Some((i, 2));
        }
    }
    None
}

/// Extract the joined `data:` payload from one SSE frame, ignoring
/// comments and non-data fields.
fn parse_sse_frame(frame_text: &str) -> Option<String> {
    let mut data_lines = Vec::new();
    for line in frame_text.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}
