//! Client configuration.
//!
//! Configuration is read from the environment:
//!
//! - `GRAPHLINK_API_BASE`: base URL of the remote service (required)
//! - `GRAPHLINK_API_KEY`: bearer token sent on every request
//! - `GRAPHLINK_PRIMARY_GRAPH`: identifier of the primary graph
//!
//! Non-localhost hosts must use HTTPS.

use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ClientError;

/// Hostnames allowed with any scheme for local development.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Default bound on concurrently pooled streaming connections.
pub const DEFAULT_POOL_CAPACITY: usize = 5;
/// Default idle expiry for pooled connections, measured from creation.
pub const DEFAULT_POOL_IDLE_TTL: Duration = Duration::from_secs(30);

/// Configuration for a [`GraphlinkClient`](crate::GraphlinkClient).
#[derive(Debug, Clone)]
pub struct GraphlinkConfig {
    /// Validated base URL of the remote service.
    pub base_url: Url,
    /// API key sent as a bearer credential, when configured.
    pub api_key: Option<String>,
    /// Identifier of the primary (root, non-deletable) graph.
    pub primary_graph_id: String,
    /// Maximum number of pooled streaming connections.
    pub pool_capacity: usize,
    /// Idle expiry for pooled connections.
    pub pool_idle_ttl: Duration,
}

impl GraphlinkConfig {
    /// Build a configuration from an explicit base URL and primary
    /// graph id.
    pub fn new(base_url: &str, primary_graph_id: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = validate_base_url(base_url)?;
        Ok(Self {
            base_url,
            api_key: None,
            primary_graph_id: primary_graph_id.into(),
            pool_capacity: DEFAULT_POOL_CAPACITY,
            pool_idle_ttl: DEFAULT_POOL_IDLE_TTL,
        })
    }

    /// Build a configuration from `GRAPHLINK_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        let base = env::var("GRAPHLINK_API_BASE")
            .map_err(|_| ClientError::config("GRAPHLINK_API_BASE is not set"))?;
        let primary = env::var("GRAPHLINK_PRIMARY_GRAPH")
            .map_err(|_| ClientError::config("GRAPHLINK_PRIMARY_GRAPH is not set"))?;
        let mut config = Self::new(&base, primary)?;
        config.api_key = env::var("GRAPHLINK_API_KEY").ok();
        Ok(config)
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the pool capacity.
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Override the pool idle TTL.
    pub fn with_pool_idle_ttl(mut self, ttl: Duration) -> Self {
        self.pool_idle_ttl = ttl;
        self
    }
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: the scheme must be HTTPS
///
/// The path is normalized to end in `/` so that joining request paths
/// preserves any prefix segment instead of replacing it.
fn validate_base_url(base: &str) -> Result<Url, ClientError> {
    let mut parsed = Url::parse(base)
        .map_err(|e| ClientError::config(format!("invalid GRAPHLINK_API_BASE '{}': {}", base, e)))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| ClientError::config("GRAPHLINK_API_BASE must include a host"))?;

    let is_local = LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host.eq_ignore_ascii_case(allowed));
    if !is_local && parsed.scheme() != "https" {
        return Err(ClientError::config(format!(
            "GRAPHLINK_API_BASE must use https for non-localhost hosts; got '{}://'",
            parsed.scheme()
        )));
    }

    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_base_is_accepted() {
        let config = GraphlinkConfig::new("https://api.graphlink.dev", "graph-main").unwrap();
        assert_eq!(config.base_url.host_str(), Some("api.graphlink.dev"));
        assert_eq!(config.primary_graph_id, "graph-main");
        assert_eq!(config.pool_capacity, DEFAULT_POOL_CAPACITY);
    }

    #[test]
    fn plain_http_is_rejected_for_remote_hosts() {
        let err = GraphlinkConfig::new("http://api.graphlink.dev", "graph-main").unwrap_err();
        assert!(err.to_string().contains("https"));
    }

    #[test]
    fn localhost_allows_any_scheme() {
        assert!(GraphlinkConfig::new("http://localhost:8080", "g").is_ok());
        assert!(GraphlinkConfig::new("http://127.0.0.1:8080", "g").is_ok());
    }

    #[test]
    fn missing_host_is_rejected() {
        assert!(GraphlinkConfig::new("not a url", "g").is_err());
    }

    #[test]
    fn path_bearing_base_keeps_its_prefix() {
        let config = GraphlinkConfig::new("https://host.example/api", "g").unwrap();
        assert_eq!(config.base_url.as_str(), "https://host.example/api/");
        let joined = config.base_url.join("v1/graphs/g/mcp/tools").unwrap();
        assert_eq!(joined.as_str(), "https://host.example/api/v1/graphs/g/mcp/tools");
    }
}
