//! Tool router: namespaced catalog aggregation and qualified-name dispatch.

pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Result, SwitchboardError};
use crate::server::ToolServers;
use crate::types::{ToolCall, ToolDefinition, ToolResult};

/// Split `"<server>:<tool>"` on the first separator.
pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
    let (server, tool) = name.split_once(':')?;
    if server.is_empty() || tool.is_empty() {
        return None;
    }
    Some((server, tool))
}

/// Resolves qualified tool names to servers and aggregates the catalog.
pub struct ToolRouter {
    servers: Arc<dyn ToolServers>,
}

impl ToolRouter {
    pub fn new(servers: Arc<dyn ToolServers>) -> Self {
        Self { servers }
    }

    /// Union of every running, non-blocked server's catalog, each tool name
    /// rewritten to `"<server>:<tool>"`.
    ///
    /// One server's catalog failing (or being empty) never prevents the
    /// others from contributing.
    pub async fn available_tools(&self, blocked_servers: &[String]) -> Vec<ToolDefinition> {
        let mut catalog = Vec::new();
        for server in self.servers.server_names() {
            if blocked_servers.iter().any(|b| b == &server) || self.servers.is_blocked(&server) {
                debug!(server, "excluding blocked server from catalog");
                continue;
            }
            if !self.servers.is_running(&server) {
                continue;
            }
            let tools = self.servers.list_tools(&server).await;
            catalog.extend(tools.into_iter().map(|t| t.namespaced(&server)));
        }
        catalog
    }

    /// Resolve a call's qualified name against the turn's catalog and
    /// forward it to the owning server.
    ///
    /// `catalog` is the namespaced tool list captured at turn start (what the
    /// model was offered), so a transient catalog fetch failure mid-turn
    /// cannot misreport a valid tool, and dispatch costs no extra round trip.
    /// Unknown server or tool, and dispatch to a blocked server, are
    /// [`SwitchboardError::ToolNotFound`] — distinct from execution failures.
    pub async fn dispatch(
        &self,
        call: &ToolCall,
        catalog: &[ToolDefinition],
        blocked_servers: &[String],
        timeout: Duration,
    ) -> Result<ToolResult> {
        let (server, tool) = split_qualified(&call.name)
            .ok_or_else(|| SwitchboardError::ToolNotFound(call.name.clone()))?;

        // A blocked server is never dispatched to, even if the model
        // hallucinated a qualified name for it.
        if blocked_servers.iter().any(|b| b == server)
            || self.servers.is_blocked(server)
            || !self.servers.is_running(server)
        {
            return Err(SwitchboardError::ToolNotFound(call.name.clone()));
        }

        let definition = catalog
            .iter()
            .find(|t| t.name == call.name)
            .ok_or_else(|| SwitchboardError::ToolNotFound(call.name.clone()))?;

        validation::validate_input(&call.input, &definition.parameters)
            .map_err(SwitchboardError::Validation)?;

        let content = self
            .servers
            .call_tool(server, tool, call.input.clone(), timeout)
            .await
            .map_err(|e| {
                warn!(tool = %call.name, error = %e, "tool dispatch failed");
                e
            })?;

        Ok(ToolResult::ok(call, content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_qualified_uses_first_separator() {
        assert_eq!(split_qualified("search:lookup"), Some(("search", "lookup")));
        assert_eq!(
            split_qualified("search:ns:lookup"),
            Some(("search", "ns:lookup"))
        );
        assert_eq!(split_qualified("lookup"), None);
        assert_eq!(split_qualified(":lookup"), None);
        assert_eq!(split_qualified("search:"), None);
    }
}
