//! Response-handling and session core for the Graphlink MCP adapter.
//!
//! The adapter receives tool-invocation requests from an AI-agent host
//! and fulfills them against the remote Graphlink HTTP API, reducing
//! every response shape the service produces (single JSON document,
//! SSE stream, line-delimited stream, deferred/queued result) to one
//! uniform text result.
//!
//! Entry point: [`GraphlinkClient`], built from a [`GraphlinkConfig`].
//!
//! ```ignore
//! use graphlink_client::{GraphlinkClient, GraphlinkConfig};
//! use serde_json::Map;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = GraphlinkClient::new(GraphlinkConfig::from_env()?)?;
//! let result = client.handle_tool_call("get-schema", Map::new()).await;
//! println!("{}", result.as_text());
//! # Ok(())
//! # }
//! ```

pub mod cache;
mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod pool;
pub mod response;
pub mod retry;
pub mod session;

pub use cache::{CachePolicy, CacheStats, ResultCache};
pub use client::GraphlinkClient;
pub use config::GraphlinkConfig;
pub use error::ClientError;
pub use http::GraphlinkHttp;
pub use pool::{ConnectionPool, StreamConnection};
pub use session::{
    CreateWorkspaceArgs, DeleteWorkspaceArgs, SessionManager, SwitchWorkspaceArgs, WorkspaceInfo,
    WorkspaceListing,
};
