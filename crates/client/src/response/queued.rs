//! Deferred/queued result resolution.
//!
//! A 202 response hands back a queue id; the adapter polls the status
//! endpoint with multiplicative backoff until the operation reaches a
//! terminal status or the attempt budget runs out. Individual polling
//! failures are logged and treated as "not yet complete".

use std::time::Duration;

use tracing::{debug, warn};

use graphlink_types::{QueuedJob, ToolResult};

use crate::http::GraphlinkHttp;
use crate::response::aggregate::stringify;

/// Delay before the first status poll.
pub const POLL_INITIAL_DELAY: Duration = Duration::from_millis(1000);
/// Multiplier applied to the delay after each poll.
pub const POLL_BACKOFF_FACTOR: f64 = 1.5;
/// Upper bound on the poll delay.
pub const POLL_MAX_DELAY: Duration = Duration::from_millis(10_000);
/// Total poll attempts before giving up.
pub const POLL_MAX_ATTEMPTS: u32 = 30;

/// Poll a queued operation to completion and render its result.
///
/// Every outcome is a text result; polling never raises past this
/// function.
pub(crate) async fn resolve(http: &GraphlinkHttp, job: &QueuedJob) -> ToolResult {
    let status_url = job
        .status_url
        .clone()
        .unwrap_or_else(|| http.queue_status_path(&job.queue_id));
    let result_url = job
        .result_url
        .clone()
        .unwrap_or_else(|| http.queue_result_path(&job.queue_id));

    let mut delay = POLL_INITIAL_DELAY;
    for attempt in 0..POLL_MAX_ATTEMPTS {
        tokio::time::sleep(delay).await;
        delay = Duration::from_millis(
            ((delay.as_millis() as f64 * POLL_BACKOFF_FACTOR) as u64).min(POLL_MAX_DELAY.as_millis() as u64),
        );

        let status_body = match http.get_json(&status_url).await {
            Ok(body) => body,
            Err(err) => {
                // A failed poll is not fatal; the next attempt may see
                // the operation complete.
                warn!(queue_id = %job.queue_id, attempt, error = %err, "status poll failed");
                continue;
            }
        };

        let status = status_body
            .get("status")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("pending");
        debug!(queue_id = %job.queue_id, attempt, status, "queued operation status");

        match status {
            "completed" => {
                return match http.get_json(&result_url).await {
                    Ok(payload) => ToolResult::text(stringify(&payload)),
                    Err(err) => ToolResult::error(format!(
                        "queued operation {} completed but the result could not be fetched: {}",
                        job.queue_id, err
                    )),
                };
            }
            "failed" => {
                let reason = status_body
                    .get("error")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("no error detail provided");
                return ToolResult::error(format!("queued operation {} failed: {}", job.queue_id, reason));
            }
            "cancelled" => {
                return ToolResult::failure(format!("Queued operation {} was cancelled", job.queue_id));
            }
            _ => {}
        }
    }

    ToolResult::error(format!(
        "queued operation {} timed out after {} status checks",
        job.queue_id, POLL_MAX_ATTEMPTS
    ))
}
