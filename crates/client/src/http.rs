//! HTTP plumbing for the Graphlink API.
//!
//! Thin wrapper around a configured `reqwest::Client`. It owns header
//! construction (bearer credential, content type, client identity) and
//! knows the endpoint shapes:
//!
//! - `GET {base}/v1/graphs/{id}/mcp/tools`
//! - `POST {base}/v1/graphs/{id}/mcp/call-tool`
//! - `GET {base}/v1/queue/{id}/status` / `.../result`
//!
//! Call-tool requests advertise every response shape the normalizer
//! understands, in preference order, via the Accept header.

use std::env;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::{Map as JsonMap, Value};
use tracing::debug;

use graphlink_types::ToolDescriptor;

use crate::config::GraphlinkConfig;
use crate::error::ClientError;

/// Accept header sent on call-tool requests, listing streaming and
/// non-streaming media types in preference order.
const CALL_TOOL_ACCEPT: &str = "text/event-stream, application/x-ndjson, application/json";

/// Configured HTTP client for the Graphlink API.
#[derive(Debug, Clone)]
pub struct GraphlinkHttp {
    base_url: url::Url,
    http: reqwest::Client,
    user_agent: String,
}

impl GraphlinkHttp {
    /// Build a client from configuration, installing default headers.
    pub fn new(config: &GraphlinkConfig) -> Result<Self, ClientError> {
        let mut default_headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| ClientError::config(format!("invalid API key: {}", e)))?;
            default_headers.insert(header::AUTHORIZATION, value);
        }
        default_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(default_headers)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::config(format!("build http client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            http,
            user_agent: format!("graphlink-mcp/0.1; {}", env::consts::OS),
        })
    }

    /// The validated base URL this client targets.
    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    /// Join an API-relative path onto the base URL.
    fn endpoint(&self, path: &str) -> Result<url::Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::config(format!("failed to join path '{}': {}", path, e)))
    }

    /// Fetch the tool catalog for a graph.
    pub async fn list_tools(&self, graph_id: &str) -> Result<Vec<ToolDescriptor>, ClientError> {
        let url = self.endpoint(&format!("v1/graphs/{}/mcp/tools", graph_id))?;
        debug!(%url, "listing tools");
        let response = self
            .http
            .get(url)
            .header(header::USER_AGENT, &self.user_agent)
            .send()
            .await?;
        let response = error_for_status(response).await?;
        let body: Value = response.json().await?;
        // The catalog arrives either as a bare array or wrapped in {tools: [...]}.
        let tools = body
            .get("tools")
            .cloned()
            .unwrap_or(body);
        serde_json::from_value(tools).map_err(|e| ClientError::parse(format!("tool catalog: {}", e)))
    }

    /// Invoke a tool and return the raw response for classification.
    pub async fn call_tool(
        &self,
        graph_id: &str,
        name: &str,
        arguments: &JsonMap<String, Value>,
    ) -> Result<reqwest::Response, ClientError> {
        let url = self.endpoint(&format!("v1/graphs/{}/mcp/call-tool", graph_id))?;
        debug!(%url, tool = name, "invoking tool");
        let response = self
            .http
            .post(url)
            .header(header::USER_AGENT, &self.user_agent)
            .header(header::ACCEPT, CALL_TOOL_ACCEPT)
            .json(&serde_json::json!({"name": name, "arguments": arguments}))
            .send()
            .await?;
        Ok(response)
    }

    /// Invoke a tool expecting a plain JSON answer. Used by the
    /// session manager, whose operations never stream.
    pub async fn call_tool_json(
        &self,
        graph_id: &str,
        name: &str,
        arguments: &JsonMap<String, Value>,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint(&format!("v1/graphs/{}/mcp/call-tool", graph_id))?;
        debug!(%url, tool = name, "invoking session tool");
        let response = self
            .http
            .post(url)
            .header(header::USER_AGENT, &self.user_agent)
            .header(header::ACCEPT, "application/json")
            .json(&serde_json::json!({"name": name, "arguments": arguments}))
            .send()
            .await?;
        let response = error_for_status(response).await?;
        Ok(response.json().await?)
    }

    /// GET a JSON document from an absolute or API-relative URL. Used
    /// by the queued-result poller.
    pub async fn get_json(&self, url: &str) -> Result<Value, ClientError> {
        let url = match url::Url::parse(url) {
            Ok(absolute) => absolute,
            Err(_) => self.endpoint(url)?,
        };
        let response = self
            .http
            .get(url)
            .header(header::USER_AGENT, &self.user_agent)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        let response = error_for_status(response).await?;
        Ok(response.json().await?)
    }

    /// Default status endpoint for a queued operation.
    pub fn queue_status_path(&self, queue_id: &str) -> String {
        format!("v1/queue/{}/status", queue_id)
    }

    /// Default result endpoint for a queued operation.
    pub fn queue_result_path(&self, queue_id: &str) -> String {
        format!("v1/queue/{}/result", queue_id)
    }
}

/// Convert a non-success response into a [`ClientError::Http`],
/// carrying as much of the body as is available.
pub(crate) async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    };
    Err(ClientError::http(status.as_u16(), message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GraphlinkConfig {
        GraphlinkConfig::new("https://api.graphlink.dev", "graph-main").unwrap()
    }

    #[test]
    fn endpoint_joins_relative_paths() {
        let http = GraphlinkHttp::new(&config()).unwrap();
        let url = http.endpoint("v1/graphs/g1/mcp/tools").unwrap();
        assert_eq!(url.as_str(), "https://api.graphlink.dev/v1/graphs/g1/mcp/tools");
        // Leading slash is tolerated.
        let url = http.endpoint("/v1/queue/q/status").unwrap();
        assert_eq!(url.as_str(), "https://api.graphlink.dev/v1/queue/q/status");
    }

    #[test]
    fn endpoint_preserves_a_prefixed_base_path() {
        let config = GraphlinkConfig::new("https://api.graphlink.dev/api", "graph-main").unwrap();
        let http = GraphlinkHttp::new(&config).unwrap();
        let url = http.endpoint("v1/graphs/g1/mcp/tools").unwrap();
        assert_eq!(url.as_str(), "https://api.graphlink.dev/api/v1/graphs/g1/mcp/tools");
    }

    #[test]
    fn queue_paths_use_queue_id() {
        let http = GraphlinkHttp::new(&config()).unwrap();
        assert_eq!(http.queue_status_path("q-1"), "v1/queue/q-1/status");
        assert_eq!(http.queue_result_path("q-1"), "v1/queue/q-1/result");
    }
}
