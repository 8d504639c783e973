//! Shared test doubles: scripted provider client and stub tool servers.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use switchboard::adapter::{ProviderClient, ProviderRequest};
use switchboard::error::{Result, SwitchboardError};
use switchboard::server::ToolServers;
use switchboard::types::ToolDefinition;

/// Wire test logs to a subscriber; repeated calls are a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Provider double: pops scripted responses, then repeats a fallback.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<serde_json::Value>>>,
    fallback: serde_json::Value,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<serde_json::Value>>, fallback: serde_json::Value) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers every call with the same response.
    pub fn repeating(response: serde_json::Value) -> Self {
        Self::new(Vec::new(), response)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    async fn complete(&self, request: &ProviderRequest) -> Result<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(self.fallback.clone()),
        }
    }
}

/// Tool-server double: static catalogs and canned results, with recording.
#[derive(Default)]
pub struct StubToolServers {
    pub catalogs: HashMap<String, Vec<ToolDefinition>>,
    pub blocked: HashSet<String>,
    /// Canned results keyed by `"<server>:<tool>"`.
    pub results: HashMap<String, serde_json::Value>,
    pub dispatched: Mutex<Vec<String>>,
}

impl StubToolServers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, name: &str, tools: Vec<ToolDefinition>) -> Self {
        self.catalogs.insert(name.to_string(), tools);
        self
    }

    pub fn with_result(mut self, qualified: &str, result: serde_json::Value) -> Self {
        self.results.insert(qualified.to_string(), result);
        self
    }

    pub fn with_blocked(mut self, name: &str) -> Self {
        self.blocked.insert(name.to_string());
        self
    }

    pub fn dispatched(&self) -> Vec<String> {
        self.dispatched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolServers for StubToolServers {
    fn server_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.catalogs.keys().cloned().collect();
        names.sort();
        names
    }

    fn is_running(&self, server: &str) -> bool {
        self.catalogs.contains_key(server)
    }

    fn is_blocked(&self, server: &str) -> bool {
        self.blocked.contains(server)
    }

    async fn list_tools(&self, server: &str) -> Vec<ToolDefinition> {
        self.catalogs.get(server).cloned().unwrap_or_default()
    }

    async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        _input: serde_json::Value,
        _timeout: Duration,
    ) -> Result<serde_json::Value> {
        let qualified = format!("{server}:{tool}");
        self.dispatched.lock().unwrap().push(qualified.clone());
        self.results
            .get(&qualified)
            .cloned()
            .ok_or(SwitchboardError::ToolExecution {
                tool: qualified,
                message: "no canned result".into(),
            })
    }
}

/// An Anthropic-shaped response that requests one tool call.
pub fn anthropic_tool_call_response(id: &str, name: &str, input: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "content": [
            {"type": "tool_use", "id": id, "name": name, "input": input}
        ]
    })
}

/// An Anthropic-shaped plain-text response.
pub fn anthropic_text_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "content": [{"type": "text", "text": text}]
    })
}

/// A simple object-schema tool definition.
pub fn tool(name: &str) -> ToolDefinition {
    ToolDefinition::new(name, format!("The {name} tool"))
}
