#![forbid(unsafe_code)]

mod definitions;
mod dispatch;
mod graph;
mod tags;

pub(crate) use definitions::handler_definitions;
pub(crate) use dispatch::dispatch_handler;

use crate::{SidebarServer, WorkspaceId, ai_error, optional_workspace};
use serde_json::Value;

impl SidebarServer {
    /// Workspace resolution shared by every tool: an explicit argument
    /// wins, then the configured default. Tools never run unscoped.
    pub(crate) fn workspace_scope(
        &self,
        args: &serde_json::Map<String, Value>,
    ) -> Result<WorkspaceId, Value> {
        match optional_workspace(args)? {
            Some(workspace) => Ok(workspace),
            None => match &self.default_workspace {
                Some(workspace) => Ok(workspace.clone()),
                None => Err(ai_error(
                    "INVALID_INPUT",
                    "workspace is required (no default workspace is configured; pass workspace or start with --workspace)",
                )),
            },
        }
    }
}
