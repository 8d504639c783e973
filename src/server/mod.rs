//! Tool-server process manager: owns one supervised subprocess per
//! configured server and speaks the line-framed wire protocol to each.

pub mod process;
pub mod protocol;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ToolServerConfig;
use crate::error::{Result, SwitchboardError};
use crate::types::ToolDefinition;

pub use process::{ServerHandle, ServerState};
pub use protocol::{RequestKind, WireRequest, WireResponse};

/// How long a catalog request may take before the server is treated as
/// unreachable for this fetch.
const CATALOG_TIMEOUT: Duration = Duration::from_secs(10);

/// Abstraction over the set of tool servers, so the router and orchestrator
/// can be tested against doubles instead of live subprocesses.
#[async_trait]
pub trait ToolServers: Send + Sync {
    fn server_names(&self) -> Vec<String>;
    fn is_running(&self, server: &str) -> bool;
    fn is_blocked(&self, server: &str) -> bool;

    /// Fetch the server's catalog. An unreachable server yields an empty
    /// list (logged), never a hard failure.
    async fn list_tools(&self, server: &str) -> Vec<ToolDefinition>;

    /// Invoke one tool and return its raw result content.
    async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        input: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value>;
}

/// Owns the lifecycle of every configured tool subprocess.
#[derive(Default)]
pub struct ToolServerManager {
    servers: RwLock<HashMap<String, Arc<ServerHandle>>>,
}

impl ToolServerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn one configured server. Failure leaves it stopped and surfaces
    /// as [`SwitchboardError::ProcessStart`].
    pub async fn start(&self, config: &ToolServerConfig) -> Result<()> {
        let handle = ServerHandle::spawn(config).await?;
        self.servers
            .write()
            .expect("servers lock")
            .insert(config.name.clone(), handle);
        Ok(())
    }

    /// Spawn every configured server, logging and skipping the ones that
    /// fail so one bad binary does not take down the rest.
    pub async fn start_all(&self, configs: &[ToolServerConfig]) {
        for config in configs {
            if let Err(e) = self.start(config).await {
                warn!(server = %config.name, error = %e, "failed to start tool server");
            }
        }
    }

    /// Toggle the blocked flag; returns whether it was applied (false for
    /// unknown or stopped servers).
    pub fn set_blocked(&self, server: &str, blocked: bool) -> bool {
        match self.handle(server) {
            Some(handle) => handle.set_blocked(blocked),
            None => {
                debug!(server, "set_blocked on unknown server");
                false
            }
        }
    }

    /// Stop one server and drop it from the registry.
    pub async fn stop(&self, server: &str) {
        let handle = self.servers.write().expect("servers lock").remove(server);
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }

    /// Kill every subprocess. In-flight requests are rejected as crashes.
    pub async fn shutdown(&self) {
        let handles: Vec<Arc<ServerHandle>> = {
            let mut map = self.servers.write().expect("servers lock");
            map.drain().map(|(_, h)| h).collect()
        };
        for handle in handles {
            handle.stop().await;
        }
    }

    fn handle(&self, server: &str) -> Option<Arc<ServerHandle>> {
        self.servers
            .read()
            .expect("servers lock")
            .get(server)
            .cloned()
    }
}

#[async_trait]
impl ToolServers for ToolServerManager {
    fn server_names(&self) -> Vec<String> {
        self.servers
            .read()
            .expect("servers lock")
            .keys()
            .cloned()
            .collect()
    }

    fn is_running(&self, server: &str) -> bool {
        self.handle(server).is_some_and(|h| h.is_running())
    }

    fn is_blocked(&self, server: &str) -> bool {
        self.handle(server).is_some_and(|h| h.is_blocked())
    }

    async fn list_tools(&self, server: &str) -> Vec<ToolDefinition> {
        let Some(handle) = self.handle(server) else {
            warn!(server, "list_tools on unknown server");
            return Vec::new();
        };

        let result = handle
            .request(RequestKind::ListTools, None, None, CATALOG_TIMEOUT)
            .await
            .and_then(|value| {
                serde_json::from_value::<Vec<ToolDefinition>>(value)
                    .map_err(SwitchboardError::from)
            });

        match result {
            Ok(tools) => tools,
            Err(e) => {
                warn!(server, error = %e, "catalog fetch failed; contributing no tools");
                Vec::new()
            }
        }
    }

    async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        input: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        let handle = self
            .handle(server)
            .ok_or_else(|| SwitchboardError::ToolNotFound(format!("{server}:{tool}")))?;
        handle
            .request(RequestKind::CallTool, Some(tool), Some(&input), timeout)
            .await
    }
}
