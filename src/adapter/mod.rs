//! Provider adapter trait and the three wire-format variants.
//!
//! An adapter is a stateless converter between the internal tool/call/result
//! model and one provider's wire shape. Nothing past this boundary branches
//! on provider identity again.

pub mod anthropic;
pub mod gemini;
pub mod http;
pub mod openai;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use strum::{Display, EnumIter, EnumString};

use crate::error::{Result, SwitchboardError};
use crate::types::{GenerationSettings, ModelMessage, ToolCall, ToolDefinition, ToolResult};

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use http::{HttpProviderClient, ProviderClient};
pub use openai::OpenAiAdapter;

/// A request to be shaped into one provider's wire format.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub messages: Vec<ModelMessage>,
    pub settings: GenerationSettings,
    pub tools: Vec<ToolDefinition>,
}

/// Stateless strategy object converting between the internal model and one
/// provider wire shape. All methods are pure transformations.
pub trait ProviderAdapter: Send + Sync {
    /// Adapter name (e.g. "anthropic", "openai", "gemini").
    fn name(&self) -> &'static str;

    /// Map the tool catalog into the provider's tool declaration shape.
    ///
    /// Lossless: name, description, and parameter schema are preserved.
    /// Whether the variant wraps everything in one declaration container or
    /// emits a flat list is hidden from callers.
    fn convert_tool_definitions(&self, tools: &[ToolDefinition]) -> serde_json::Value;

    /// Build the full request body for this variant.
    fn build_request(&self, request: &ProviderRequest) -> serde_json::Value;

    /// Pull tool invocations out of a raw provider response.
    ///
    /// Returns an empty vector (never an error) when the response carries no
    /// invocation; an absent or empty accessor means "no calls". Missing
    /// expected top-level fields are an [`SwitchboardError::Adapter`], never
    /// any other type. Ids are synthesized when the provider omits them.
    fn extract_tool_calls(&self, response: &serde_json::Value) -> Result<Vec<ToolCall>>;

    /// Pull the assistant text out of a raw provider response.
    fn extract_text(&self, response: &serde_json::Value) -> Result<String>;

    /// Encode one turn's tool results into the provider's follow-up shape.
    ///
    /// Variants that accept only one pending result per request cycle encode
    /// only the first; the rest are dropped with a warning. This is a
    /// documented provider limitation, not something callers may assume away.
    fn format_tool_results(&self, results: &[ToolResult]) -> serde_json::Value;
}

/// Wire-format variant, selected by provider name at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum AdapterKind {
    Anthropic,
    #[strum(serialize = "openai")]
    OpenAi,
    Gemini,
}

/// Instantiate the adapter for a variant.
pub fn create_adapter(kind: AdapterKind) -> Arc<dyn ProviderAdapter> {
    match kind {
        AdapterKind::Anthropic => Arc::new(AnthropicAdapter),
        AdapterKind::OpenAi => Arc::new(OpenAiAdapter),
        AdapterKind::Gemini => Arc::new(GeminiAdapter),
    }
}

/// Parse a provider name into an adapter, surfacing unknown names as
/// configuration errors.
pub fn adapter_for(name: &str) -> Result<Arc<dyn ProviderAdapter>> {
    let kind: AdapterKind = name
        .parse()
        .map_err(|_| SwitchboardError::Configuration(format!("unknown provider '{name}'")))?;
    Ok(create_adapter(kind))
}

static CALL_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Synthesize a tool-call id for providers that omit one.
///
/// Monotonic counter plus timestamp; unique within one process lifetime.
pub(crate) fn synthesize_call_id() -> String {
    let n = CALL_COUNTER.fetch_add(1, Ordering::Relaxed);
    let millis = chrono::Utc::now().timestamp_millis();
    format!("call_{n}_{millis}")
}

/// Adapter-scoped shape error.
pub(crate) fn adapter_error(adapter: &str, message: impl Into<String>) -> SwitchboardError {
    SwitchboardError::Adapter {
        adapter: adapter.to_string(),
        message: message.into(),
    }
}
