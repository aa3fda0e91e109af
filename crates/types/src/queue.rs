//! Deferred/queued result envelope.

use serde::{Deserialize, Serialize};

/// Envelope returned by the service when a call is accepted for
/// deferred execution (HTTP 202). Carries the queue identifier and
/// optional status/result URLs; absent URLs fall back to the default
/// queue endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    /// Identifier for the queued operation.
    pub queue_id: String,
    /// Endpoint to poll for completion, when supplied.
    #[serde(default)]
    pub status_url: Option<String>,
    /// Endpoint to fetch the final payload from, when supplied.
    #[serde(default)]
    pub result_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_parses_with_urls_absent() {
        let job: QueuedJob = serde_json::from_value(json!({"queue_id": "q-9"})).unwrap();
        assert_eq!(job.queue_id, "q-9");
        assert!(job.status_url.is_none());
        assert!(job.result_url.is_none());
    }
}
