//! Shared type definitions for the Graphlink MCP adapter.
//!
//! These types cross crate boundaries: tool results handed back to the
//! host, tool descriptors fetched from the remote catalog, workspace
//! records mirrored from the remote service, and the stream-event model
//! used while normalizing streaming responses.

mod queue;
mod stream;
mod tools;
mod workspace;

pub use queue::QueuedJob;
pub use stream::{StreamEvent, StreamEventKind};
pub use tools::{ToolDescriptor, ToolResult};
pub use workspace::{SubgraphKind, Workspace, WorkspaceKind};
