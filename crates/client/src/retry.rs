//! Bounded retry executor.
//!
//! Wraps one fallible asynchronous operation in up to three attempts
//! with exponential backoff. Failures that signal authentication or
//! malformed-request conditions are never retried. The executor never
//! raises: an exhausted or non-retryable failure is surfaced as a
//! user-facing [`ToolResult`].

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use graphlink_types::ToolResult;

use crate::error::ClientError;

/// Maximum number of attempts, including the first.
pub const MAX_ATTEMPTS: u32 = 3;
/// Base backoff delay; doubles after every failed attempt.
pub const BASE_DELAY: Duration = Duration::from_millis(1000);

/// Invoke `operation` up to [`MAX_ATTEMPTS`] times.
///
/// Returns the first success untouched. A non-retryable failure is
/// returned immediately as an error result; exhausting every attempt
/// yields a result explaining the final failure. The backoff sleep is
/// a suspension point; concurrent work proceeds while waiting.
pub async fn run_with_retry<T, F, Fut>(mut operation: F) -> Result<T, ToolResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut last_error: Option<ClientError> = None;

    for attempt in 0..MAX_ATTEMPTS {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => {
                debug!(attempt, error = %err, "non-retryable failure");
                return Err(ToolResult::error(&err));
            }
            Err(err) => {
                warn!(attempt, error = %err, "attempt failed");
                last_error = Some(err);
                if attempt + 1 < MAX_ATTEMPTS {
                    let delay = BASE_DELAY * 2u32.pow(attempt);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    let last = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "unknown error".into());
    Err(ToolResult::failure(format!(
        "Error after {} attempts: {}",
        MAX_ATTEMPTS, last
    )))
}
