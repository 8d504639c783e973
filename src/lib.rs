//! Switchboard — tool-call normalization and conversation orchestration.
//!
//! Sits between a conversational assistant, a set of external tool-server
//! subprocesses, and interchangeable LLM provider wire formats. Provider
//! adapters normalize tool catalogs, tool calls, and tool results; a process
//! manager supervises one line-framed subprocess per tool server; a router
//! aggregates a namespaced catalog and dispatches qualified names; the
//! orchestrator drives the multi-turn loop to a structured final answer.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use switchboard::prelude::*;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("switchboard.toml")?;
//! let manager = Arc::new(ToolServerManager::new());
//! manager.start_all(&config.servers).await;
//!
//! let kind = config.provider.adapter_kind()?;
//! let adapter = switchboard::adapter::create_adapter(kind);
//! let client = Arc::new(HttpProviderClient::new(
//!     kind,
//!     Arc::clone(&adapter),
//!     config.provider.resolve_base_url()?,
//!     config.provider.resolve_api_key()?,
//! ));
//!
//! let cache = Arc::new(ResponseCache::new(config.cache.capacity, config.cache.ttl()));
//! let orchestrator = Orchestrator::new(
//!     client,
//!     adapter,
//!     ToolRouter::new(manager),
//!     cache,
//!     OrchestratorSettings::default(),
//! );
//!
//! let settings = GenerationSettings::new(&config.provider.model);
//! let answer = orchestrator
//!     .run_turn("What is in the index?", vec![], settings, &[])
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod cache;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod router;
pub mod server;
pub mod types;
pub mod util;

pub mod prelude {
    //! Convenience re-exports for embedders.

    pub use crate::adapter::{
        create_adapter, AdapterKind, HttpProviderClient, ProviderAdapter, ProviderClient,
        ProviderRequest,
    };
    pub use crate::cache::ResponseCache;
    pub use crate::config::{Config, ToolServerConfig};
    pub use crate::error::{ErrorKind, ErrorPayload, Result, SwitchboardError};
    pub use crate::orchestrator::{Orchestrator, OrchestratorSettings, SessionState};
    pub use crate::router::ToolRouter;
    pub use crate::server::{ToolServerManager, ToolServers};
    pub use crate::types::{
        GenerationSettings, ModelMessage, StructuredAnswer, ToolCall, ToolDefinition, ToolResult,
    };
    pub use crate::util::RetryPolicy;
}
