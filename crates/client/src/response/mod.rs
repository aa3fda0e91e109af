//! Response classification and normalization.
//!
//! The raw response's shape is decided exactly once, at the boundary,
//! into [`RawResponse`]; everything downstream dispatches on the tag
//! instead of re-checking content-type strings. Each shape is then
//! normalized into one `{kind: text, text}` result.

pub mod aggregate;
pub(crate) mod lines;
pub(crate) mod queued;
pub(crate) mod sse;

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::header;
use serde_json::Value;
use tracing::debug;

use graphlink_types::{QueuedJob, ToolResult};

use crate::error::ClientError;
use crate::http::{self, GraphlinkHttp};
use crate::pool::ConnectionPool;

/// Counter feeding generated operation ids when the service does not
/// supply one.
static FALLBACK_OP_ID: AtomicU64 = AtomicU64::new(0);

/// A raw response, classified once.
pub(crate) enum RawResponse {
    /// Plain JSON document.
    Document(Value),
    /// Server-sent event stream scoped to an operation id.
    EventStream {
        operation_id: String,
        response: reqwest::Response,
    },
    /// Line-delimited JSON stream.
    LineStream(reqwest::Response),
    /// Accepted for deferred execution.
    Queued(QueuedJob),
}

/// Decide a response's shape from its status and headers.
pub(crate) async fn classify(response: reqwest::Response) -> Result<RawResponse, ClientError> {
    if response.status() == reqwest::StatusCode::ACCEPTED {
        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::parse(format!("202 envelope: {}", e)))?;
        let job: QueuedJob = serde_json::from_value(body)
            .map_err(|e| ClientError::parse(format!("202 envelope: {}", e)))?;
        return Ok(RawResponse::Queued(job));
    }

    let response = http::error_for_status(response).await?;

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.contains("text/event-stream") {
        let operation_id = response
            .headers()
            .get("x-operation-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| format!("op-{}", FALLBACK_OP_ID.fetch_add(1, Ordering::Relaxed)));
        return Ok(RawResponse::EventStream { operation_id, response });
    }

    if content_type.contains("application/x-ndjson") {
        return Ok(RawResponse::LineStream(response));
    }

    let text = response.text().await.map_err(ClientError::from)?;
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok(RawResponse::Document(body))
}

/// Normalize a classified response into one result.
pub(crate) async fn normalize(
    http: &GraphlinkHttp,
    pool: &ConnectionPool,
    raw: RawResponse,
) -> Result<ToolResult, ClientError> {
    match raw {
        RawResponse::Document(body) => Ok(normalize_document(body)),
        RawResponse::EventStream { operation_id, response } => {
            debug!(%operation_id, "normalizing event stream");
            let conn = pool.acquire(&operation_id).await;
            let outcome = sse::collect_events(response, &conn).await;
            pool.release(&operation_id).await;
            let events = outcome?;
            Ok(aggregate::aggregate_events(&events))
        }
        RawResponse::LineStream(response) => {
            let events = lines::collect_events(response).await?;
            Ok(aggregate::aggregate_events(&events))
        }
        RawResponse::Queued(job) => Ok(queued::resolve(http, &job).await),
    }
}

/// Normalize a single JSON document.
///
/// A unary envelope `{result: {kind: "text", text: ...}}` has its
/// inner text re-serialized pretty-printed when it parses as JSON;
/// otherwise the inner text passes through unchanged. Any other
/// `result` field passes through verbatim; a missing one becomes a
/// placeholder.
fn normalize_document(body: Value) -> ToolResult {
    let Some(result) = body.get("result") else {
        return ToolResult::text("No result");
    };

    if let Some(text) = unary_text_envelope(result) {
        return match serde_json::from_str::<Value>(text) {
            Ok(parsed) => ToolResult::text(aggregate::stringify(&parsed)),
            Err(_) => ToolResult::text(text),
        };
    }

    ToolResult::text(aggregate::stringify(result))
}

/// The inner text of a `{kind: "text", text: <string>}` envelope.
fn unary_text_envelope(result: &Value) -> Option<&str> {
    if result.get("kind").and_then(Value::as_str) != Some("text") {
        return None;
    }
    result.get("text").and_then(Value::as_str)
}
