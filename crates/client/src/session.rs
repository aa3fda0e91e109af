//! Workspace and session management.
//!
//! Owns the notion of the "active remote context". Exactly one
//! primary workspace exists for the lifetime of the client; it is
//! seeded at construction and can never be deleted. Derived
//! workspaces are created and deleted only through round-trips to the
//! remote service; the local set is a cache of remote truth,
//! rebuildable in full from a remote listing.
//!
//! Session operations bypass the result cache and the retry executor:
//! session mutations must never be silently retried or served stale.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map as JsonMap, Value, json};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use graphlink_types::{SubgraphKind, ToolResult, Workspace};

use crate::http::GraphlinkHttp;

/// Alias accepted anywhere a workspace id is expected.
const PRIMARY_ALIAS: &str = "primary";

/// Arguments for the `create-workspace` tool.
#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceArgs {
    /// Display name for the new workspace.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the new workspace starts from the parent's content.
    #[serde(default)]
    pub fork_from_parent: bool,
    /// Backing subgraph kind; must be `static` or `memory`.
    #[serde(default = "default_subgraph_kind")]
    pub subgraph_kind: String,
}

fn default_subgraph_kind() -> String {
    "static".to_string()
}

/// Arguments for the `switch-workspace` tool.
#[derive(Debug, Deserialize)]
pub struct SwitchWorkspaceArgs {
    /// Target workspace id, or the alias `primary`.
    #[serde(alias = "id")]
    pub workspace: String,
}

/// Arguments for the `delete-workspace` tool.
#[derive(Debug, Deserialize)]
pub struct DeleteWorkspaceArgs {
    /// Workspace id to delete.
    #[serde(alias = "id")]
    pub workspace: String,
    /// Whether to delete even if the workspace has content.
    #[serde(default)]
    pub force: bool,
}

/// One entry of a workspace listing.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceInfo {
    /// The workspace record.
    pub workspace: Workspace,
    /// Whether this is the active context.
    pub active: bool,
}

/// Outcome of `list-workspaces`.
///
/// The two branches are deliberate: callers can tell a reconciled
/// remote listing from a stale local fallback.
#[derive(Debug)]
pub enum WorkspaceListing {
    /// The remote listing, after full local reconciliation.
    Authoritative(Vec<WorkspaceInfo>),
    /// The local (possibly stale) set, served because the remote
    /// listing failed.
    Fallback {
        workspaces: Vec<WorkspaceInfo>,
        error: String,
    },
}

struct SessionState {
    active_id: String,
    workspaces: IndexMap<String, Workspace>,
}

/// Mediates workspace CRUD against the remote service and tracks the
/// active context.
pub struct SessionManager {
    http: GraphlinkHttp,
    primary_id: String,
    state: Mutex<SessionState>,
}

impl SessionManager {
    /// Seed a manager with the primary workspace.
    pub fn new(http: GraphlinkHttp, primary_id: impl Into<String>) -> Self {
        let primary_id = primary_id.into();
        let mut workspaces = IndexMap::new();
        workspaces.insert(primary_id.clone(), Workspace::primary(primary_id.clone()));
        Self {
            http,
            primary_id: primary_id.clone(),
            state: Mutex::new(SessionState {
                active_id: primary_id,
                workspaces,
            }),
        }
    }

    /// Identifier of the primary workspace.
    pub fn primary_id(&self) -> &str {
        &self.primary_id
    }

    /// Identifier of the active context.
    pub async fn active_id(&self) -> String {
        self.state.lock().await.active_id.clone()
    }

    /// Ids of every known workspace, primary first.
    pub async fn known_ids(&self) -> Vec<String> {
        self.state.lock().await.workspaces.keys().cloned().collect()
    }

    /// Create a derived workspace remotely, record it, and make it the
    /// active context. Local state is untouched when the remote call
    /// fails.
    pub async fn create_workspace(&self, args: CreateWorkspaceArgs) -> ToolResult {
        let Some(kind) = SubgraphKind::parse(&args.subgraph_kind) else {
            return failure_payload(
                "create-workspace",
                format!(
                    "invalid subgraph kind '{}'; expected one of: static, memory",
                    args.subgraph_kind
                ),
            );
        };

        let mut arguments = JsonMap::new();
        arguments.insert("name".into(), json!(args.name));
        if let Some(description) = &args.description {
            arguments.insert("description".into(), json!(description));
        }
        arguments.insert("fork_from_parent".into(), json!(args.fork_from_parent));
        arguments.insert("subgraph_kind".into(), serde_json::to_value(kind).unwrap_or(json!("static")));

        let body = match self
            .http
            .call_tool_json(&self.primary_id, "create-workspace", &arguments)
            .await
        {
            Ok(body) => body,
            Err(err) => return failure_payload("create-workspace", err.to_string()),
        };

        let Some(id) = workspace_id_from(&body) else {
            return failure_payload("create-workspace", "remote response carried no workspace id");
        };

        let mut workspace = Workspace::derived(id.clone(), args.name, self.primary_id.clone());
        workspace.description = args.description;

        let mut state = self.state.lock().await;
        state.workspaces.insert(id.clone(), workspace);
        // Create implies switch.
        state.active_id = id.clone();
        debug!(%id, "created workspace and switched to it");

        ToolResult::text(pretty(&json!({
            "workspace": id,
            "active": true,
            "message": format!("Created workspace '{}' and switched to it", id),
        })))
    }

    /// Move the active pointer to a known workspace. Never performs a
    /// remote round-trip.
    pub async fn switch_workspace(&self, args: SwitchWorkspaceArgs) -> ToolResult {
        let target = self.resolve_alias(&args.workspace);
        let mut state = self.state.lock().await;

        if !state.workspaces.contains_key(&target) {
            let known: Vec<&String> = state.workspaces.keys().collect();
            return failure_payload(
                "switch-workspace",
                format!("Unknown workspace '{}'. Known workspaces: {:?}", target, known),
            );
        }

        if state.active_id == target {
            return ToolResult::text(pretty(&json!({
                "workspace": target,
                "message": format!("Already on workspace '{}'", target),
            })));
        }

        let previous = std::mem::replace(&mut state.active_id, target.clone());
        debug!(from = %previous, to = %target, "switched workspace");
        ToolResult::text(pretty(&json!({
            "previous": previous,
            "active": target,
            "message": format!("Switched to workspace '{}'", target),
        })))
    }

    /// Delete a derived workspace remotely and drop it locally. If it
    /// was the active context, the active pointer falls back to the
    /// primary.
    pub async fn delete_workspace(&self, args: DeleteWorkspaceArgs) -> ToolResult {
        let target = self.resolve_alias(&args.workspace);
        if target == self.primary_id {
            return failure_payload("delete-workspace", "the primary workspace cannot be deleted");
        }

        let mut arguments = JsonMap::new();
        arguments.insert("workspace".into(), json!(target));
        arguments.insert("force".into(), json!(args.force));

        if let Err(err) = self
            .http
            .call_tool_json(&self.primary_id, "delete-workspace", &arguments)
            .await
        {
            return failure_payload("delete-workspace", err.to_string());
        }

        let mut state = self.state.lock().await;
        state.workspaces.shift_remove(&target);
        // Delete implies fallback-switch.
        let was_active = state.active_id == target;
        if was_active {
            state.active_id = self.primary_id.clone();
        }

        ToolResult::text(pretty(&json!({
            "deleted": target,
            "active": state.active_id,
            "message": if was_active {
                format!("Deleted workspace '{}'; switched back to primary", target)
            } else {
                format!("Deleted workspace '{}'", target)
            },
        })))
    }

    /// Fetch the canonical workspace set and replace the local set with
    /// it. On remote failure the local set is served, flagged as a
    /// fallback.
    pub async fn list_workspaces(&self) -> WorkspaceListing {
        let body = match self
            .http
            .call_tool_json(&self.primary_id, "list-workspaces", &JsonMap::new())
            .await
        {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "remote workspace listing failed; serving local set");
                let state = self.state.lock().await;
                return WorkspaceListing::Fallback {
                    workspaces: snapshot(&state),
                    error: err.to_string(),
                };
            }
        };

        let remote = body
            .get("workspaces")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut state = self.state.lock().await;

        // Full reconciliation: replace, never merge. The primary record
        // always survives.
        let primary = state
            .workspaces
            .get(&self.primary_id)
            .cloned()
            .unwrap_or_else(|| Workspace::primary(self.primary_id.clone()));
        let mut rebuilt = IndexMap::new();
        rebuilt.insert(self.primary_id.clone(), primary);

        for entry in &remote {
            let Some(id) = workspace_id_from(entry) else {
                warn!("skipping remote workspace entry without an id");
                continue;
            };
            if id == self.primary_id {
                continue;
            }
            let mut workspace = Workspace::derived(
                id.clone(),
                entry.get("name").and_then(Value::as_str).unwrap_or(&id),
                self.primary_id.clone(),
            );
            workspace.description = entry
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string);
            rebuilt.insert(id, workspace);
        }
        state.workspaces = rebuilt;

        if !state.workspaces.contains_key(&state.active_id) {
            warn!(vanished = %state.active_id, "active workspace vanished; resetting to primary");
            state.active_id = self.primary_id.clone();
        }

        WorkspaceListing::Authoritative(snapshot(&state))
    }

    fn resolve_alias(&self, target: &str) -> String {
        if target == PRIMARY_ALIAS {
            self.primary_id.clone()
        } else {
            target.to_string()
        }
    }
}

fn snapshot(state: &SessionState) -> Vec<WorkspaceInfo> {
    state
        .workspaces
        .values()
        .map(|workspace| WorkspaceInfo {
            active: workspace.id == state.active_id,
            workspace: workspace.clone(),
        })
        .collect()
}

fn workspace_id_from(body: &Value) -> Option<String> {
    body.get("id")
        .or_else(|| body.get("workspace_id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Structured failure payload for a session operation.
fn failure_payload(operation: &str, message: impl Into<String>) -> ToolResult {
    ToolResult::failure(pretty(&json!({
        "operation": operation,
        "error": message.into(),
    })))
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphlinkConfig;

    fn manager() -> SessionManager {
        let config = GraphlinkConfig::new("http://localhost:9", "graph-main").unwrap();
        let http = GraphlinkHttp::new(&config).unwrap();
        SessionManager::new(http, "graph-main")
    }

    async fn seed_derived(manager: &SessionManager, id: &str) {
        let mut state = manager.state.lock().await;
        state
            .workspaces
            .insert(id.to_string(), Workspace::derived(id, id, "graph-main"));
    }

    #[tokio::test]
    async fn primary_is_seeded_and_active() {
        let manager = manager();
        assert_eq!(manager.active_id().await, "graph-main");
        assert_eq!(manager.known_ids().await, vec!["graph-main".to_string()]);
    }

    #[tokio::test]
    async fn switch_to_unknown_workspace_fails_without_moving_the_pointer() {
        let manager = manager();
        let result = manager
            .switch_workspace(SwitchWorkspaceArgs {
                workspace: "nope".into(),
            })
            .await;
        assert!(result.as_text().contains("Unknown workspace"));
        assert!(result.as_text().contains("graph-main"));
        assert_eq!(manager.active_id().await, "graph-main");
    }

    #[tokio::test]
    async fn switch_moves_and_primary_alias_restores() {
        let manager = manager();
        seed_derived(&manager, "ws-1").await;

        let result = manager
            .switch_workspace(SwitchWorkspaceArgs {
                workspace: "ws-1".into(),
            })
            .await;
        assert!(result.as_text().contains("ws-1"));
        assert_eq!(manager.active_id().await, "ws-1");

        manager
            .switch_workspace(SwitchWorkspaceArgs {
                workspace: "primary".into(),
            })
            .await;
        assert_eq!(manager.active_id().await, "graph-main");
    }

    #[tokio::test]
    async fn switch_to_current_is_a_noop() {
        let manager = manager();
        let result = manager
            .switch_workspace(SwitchWorkspaceArgs {
                workspace: "primary".into(),
            })
            .await;
        assert!(result.as_text().contains("Already on"));
        assert_eq!(manager.active_id().await, "graph-main");
    }

    #[tokio::test]
    async fn primary_cannot_be_deleted() {
        let manager = manager();
        let result = manager
            .delete_workspace(DeleteWorkspaceArgs {
                workspace: "primary".into(),
                force: true,
            })
            .await;
        assert!(result.as_text().contains("cannot be deleted"));
        assert_eq!(manager.known_ids().await.len(), 1);
    }

    #[tokio::test]
    async fn invalid_subgraph_kind_is_rejected_locally() {
        let manager = manager();
        let result = manager
            .create_workspace(CreateWorkspaceArgs {
                name: "scratch".into(),
                description: None,
                fork_from_parent: false,
                subgraph_kind: "dynamic".into(),
            })
            .await;
        assert!(result.as_text().contains("invalid subgraph kind"));
        // Local state untouched.
        assert_eq!(manager.known_ids().await.len(), 1);
        assert_eq!(manager.active_id().await, "graph-main");
    }

    #[tokio::test]
    async fn remote_failure_on_create_leaves_local_state_alone() {
        // Port 9 (discard) never answers; the call fails at transport.
        let manager = manager();
        let result = manager
            .create_workspace(CreateWorkspaceArgs {
                name: "scratch".into(),
                description: None,
                fork_from_parent: false,
                subgraph_kind: "static".into(),
            })
            .await;
        assert!(result.as_text().contains("error"));
        assert_eq!(manager.known_ids().await.len(), 1);
        assert_eq!(manager.active_id().await, "graph-main");
    }

    #[tokio::test]
    async fn listing_falls_back_to_the_local_set_on_remote_failure() {
        let manager = manager();
        seed_derived(&manager, "ws-1").await;

        match manager.list_workspaces().await {
            WorkspaceListing::Fallback { workspaces, error } => {
                assert_eq!(workspaces.len(), 2);
                assert!(workspaces[0].active);
                assert!(!error.is_empty());
            }
            WorkspaceListing::Authoritative(_) => panic!("expected fallback"),
        }
    }
}
