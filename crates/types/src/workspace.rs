//! Workspace records mirrored from the remote service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a workspace is the root context or a derived one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceKind {
    /// The root, non-deletable context established at client
    /// construction. Exactly one exists per client instance.
    Primary,
    /// An isolated context created under the primary.
    Derived,
}

/// Backing kind for a derived workspace's subgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubgraphKind {
    /// Immutable snapshot of the parent graph.
    #[default]
    Static,
    /// Mutable in-memory subgraph.
    Memory,
}

impl SubgraphKind {
    /// Parse a wire-level kind name. The set is closed; anything else
    /// is rejected.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "static" => Some(Self::Static),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// One known workspace. The local set is a cache of remote truth,
/// rebuildable in full from a remote listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    /// Remote identifier, also the graph id used in request paths.
    pub id: String,
    /// Primary or derived.
    pub kind: WorkspaceKind,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Parent workspace id for derived workspaces.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Workspace {
    /// Build the primary workspace record for a client instance.
    pub fn primary(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind: WorkspaceKind::Primary,
            description: None,
            parent_id: None,
            created_at: Utc::now(),
        }
    }

    /// Build a derived workspace record.
    pub fn derived(id: impl Into<String>, name: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: WorkspaceKind::Derived,
            name: name.into(),
            description: None,
            parent_id: Some(parent_id.into()),
            created_at: Utc::now(),
        }
    }

    /// Whether this workspace is the primary context.
    pub fn is_primary(&self) -> bool {
        matches!(self.kind, WorkspaceKind::Primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subgraph_kind_is_a_closed_set() {
        assert_eq!(SubgraphKind::parse("static"), Some(SubgraphKind::Static));
        assert_eq!(SubgraphKind::parse("memory"), Some(SubgraphKind::Memory));
        assert_eq!(SubgraphKind::parse("dynamic"), None);
    }

    #[test]
    fn primary_workspace_has_no_parent() {
        let ws = Workspace::primary("graph-main");
        assert!(ws.is_primary());
        assert!(ws.parent_id.is_none());
        assert_eq!(ws.name, "graph-main");
    }

    #[test]
    fn derived_workspace_records_parent() {
        let ws = Workspace::derived("ws-1", "scratch", "graph-main");
        assert!(!ws.is_primary());
        assert_eq!(ws.parent_id.as_deref(), Some("graph-main"));
    }
}
