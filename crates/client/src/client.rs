//! Client facade.
//!
//! `GraphlinkClient` orchestrates the session manager, result cache,
//! retry executor, and response normalizer. Session tool names route
//! straight to the session manager; everything else flows through
//! cache lookup, a retried remote invocation, and normalization.
//! Callers always receive a `ToolResult`; no error crosses this
//! boundary.

use serde::de::DeserializeOwned;
use serde_json::{Map as JsonMap, Value, json};
use tracing::debug;

use graphlink_types::{ToolDescriptor, ToolResult};

use crate::cache::{CachePolicy, CacheStats, ResultCache};
use crate::config::GraphlinkConfig;
use crate::error::ClientError;
use crate::http::GraphlinkHttp;
use crate::pool::ConnectionPool;
use crate::response;
use crate::retry::run_with_retry;
use crate::session::{
    CreateWorkspaceArgs, DeleteWorkspaceArgs, SessionManager, SwitchWorkspaceArgs, WorkspaceListing,
};

/// Protocol adapter between an AI-agent host and the Graphlink API.
pub struct GraphlinkClient {
    http: GraphlinkHttp,
    pool: ConnectionPool,
    cache: ResultCache,
    policy: CachePolicy,
    session: SessionManager,
}

impl GraphlinkClient {
    /// Build a client, seeding the primary workspace from the
    /// configuration.
    pub fn new(config: GraphlinkConfig) -> Result<Self, ClientError> {
        let http = GraphlinkHttp::new(&config)?;
        let session = SessionManager::new(http.clone(), config.primary_graph_id.clone());
        Ok(Self {
            pool: ConnectionPool::new(config.pool_capacity, config.pool_idle_ttl),
            cache: ResultCache::new(),
            policy: CachePolicy::default(),
            session,
            http,
        })
    }

    /// Replace the cacheable-tool policy.
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The session manager for this client.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Fetch tool descriptors for the active graph.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ClientError> {
        let active = self.session.active_id().await;
        self.http.list_tools(&active).await
    }

    /// Handle one tool invocation.
    ///
    /// Session tool names bypass caching and retry. Every outcome,
    /// including every failure, is a text result.
    pub async fn handle_tool_call(&self, name: &str, arguments: JsonMap<String, Value>) -> ToolResult {
        match name {
            "create-workspace" => match parse_args::<CreateWorkspaceArgs>(name, arguments) {
                Ok(args) => self.session.create_workspace(args).await,
                Err(failure) => failure,
            },
            "switch-workspace" => match parse_args::<SwitchWorkspaceArgs>(name, arguments) {
                Ok(args) => self.session.switch_workspace(args).await,
                Err(failure) => failure,
            },
            "delete-workspace" => match parse_args::<DeleteWorkspaceArgs>(name, arguments) {
                Ok(args) => self.session.delete_workspace(args).await,
                Err(failure) => failure,
            },
            "list-workspaces" => render_listing(self.session.list_workspaces().await),
            _ => self.invoke(name, arguments).await,
        }
    }

    /// Cache → retry → network → normalize → cache.
    async fn invoke(&self, name: &str, arguments: JsonMap<String, Value>) -> ToolResult {
        let context_id = self.session.active_id().await;
        let cache_ttl = self.policy.ttl_for(name);

        if cache_ttl.is_some() {
            if let Some(hit) = self.cache.lookup(name, &arguments, &context_id).await {
                return hit;
            }
        }

        let http = &self.http;
        let pool = &self.pool;
        let arguments_ref = &arguments;
        let graph_id = context_id.as_str();
        let outcome = run_with_retry(move || async move {
            let response = http.call_tool(graph_id, name, arguments_ref).await?;
            let raw = response::classify(response).await?;
            response::normalize(http, pool, raw).await
        })
        .await;

        match outcome {
            Ok(result) => {
                if let Some(ttl) = cache_ttl {
                    // A normalized failure text would otherwise be
                    // served stale for the full TTL.
                    if result.is_error() {
                        debug!(tool = name, "not caching failure result");
                    } else {
                        debug!(tool = name, "caching result");
                        self.cache.store(name, &arguments, result.clone(), ttl, &context_id).await;
                    }
                }
                result
            }
            Err(failure) => failure,
        }
    }

    /// Point-in-time cache counters.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Drop every cached result.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Release every pooled streaming connection.
    pub async fn shutdown(&self) {
        self.pool.release_all().await;
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: JsonMap<String, Value>) -> Result<T, ToolResult> {
    serde_json::from_value(Value::Object(arguments)).map_err(|err| {
        ToolResult::failure(
            serde_json::to_string_pretty(&json!({
                "operation": tool,
                "error": format!("invalid arguments: {}", err),
            }))
            .unwrap_or_else(|_| format!("Error: invalid arguments for {}", tool)),
        )
    })
}

fn render_listing(listing: WorkspaceListing) -> ToolResult {
    let (workspaces, source, error) = match listing {
        WorkspaceListing::Authoritative(workspaces) => (workspaces, "remote", None),
        WorkspaceListing::Fallback { workspaces, error } => (workspaces, "local-fallback", Some(error)),
    };
    let entries: Vec<Value> = workspaces
        .iter()
        .map(|info| {
            json!({
                "id": info.workspace.id,
                "kind": info.workspace.kind,
                "name": info.workspace.name,
                "description": info.workspace.description,
                "active": info.active,
            })
        })
        .collect();
    let mut body = json!({"workspaces": entries, "source": source});
    if let Some(error) = error {
        body["error"] = json!(error);
    }
    ToolResult::text(serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GraphlinkClient {
        let config = GraphlinkConfig::new("http://localhost:9", "graph-main").unwrap();
        GraphlinkClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn session_tools_route_without_touching_the_network_path() {
        let client = client();
        let mut arguments = JsonMap::new();
        arguments.insert("workspace".into(), json!("primary"));
        let result = client.handle_tool_call("switch-workspace", arguments).await;
        assert!(result.as_text().contains("Already on"));
    }

    #[tokio::test]
    async fn malformed_session_arguments_become_a_failure_payload() {
        let client = client();
        // switch-workspace requires a workspace id.
        let result = client.handle_tool_call("switch-workspace", JsonMap::new()).await;
        assert!(result.as_text().contains("invalid arguments"));
    }

    #[tokio::test]
    async fn listing_renders_the_fallback_flag() {
        let client = client();
        let result = client.handle_tool_call("list-workspaces", JsonMap::new()).await;
        let body: Value = serde_json::from_str(result.as_text()).unwrap();
        assert_eq!(body["source"], json!("local-fallback"));
        assert_eq!(body["workspaces"][0]["id"], json!("graph-main"));
        assert_eq!(body["workspaces"][0]["active"], json!(true));
    }
}
