//! Anthropic Messages API wire format.

use crate::error::Result;
use crate::types::{ContentPart, Role, ToolCall, ToolDefinition, ToolResult};

use super::{adapter_error, synthesize_call_id, ProviderAdapter, ProviderRequest};

const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Adapter for the Anthropic Messages wire shape: flat tool list, tool calls
/// and results carried as typed content blocks.
pub struct AnthropicAdapter;

impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn convert_tool_definitions(&self, tools: &[ToolDefinition]) -> serde_json::Value {
        let defs: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters,
                })
            })
            .collect();
        defs.into()
    }

    fn build_request(&self, request: &ProviderRequest) -> serde_json::Value {
        let mut system = request.settings.system_prompt.clone();
        let mut messages = Vec::new();

        for msg in &request.messages {
            match msg.role {
                // Anthropic carries the system prompt as a top-level field.
                Role::System => system = Some(msg.text()),
                Role::User => messages.push(serde_json::json!({
                    "role": "user",
                    "content": [{"type": "text", "text": msg.text()}],
                })),
                Role::Assistant => {
                    let mut content = Vec::new();
                    let text = msg.text();
                    if !text.is_empty() {
                        content.push(serde_json::json!({"type": "text", "text": text}));
                    }
                    for part in &msg.content {
                        if let ContentPart::ToolCall(tc) = part {
                            content.push(serde_json::json!({
                                "type": "tool_use",
                                "id": tc.id,
                                "name": tc.name,
                                "input": tc.input,
                            }));
                        }
                    }
                    messages.push(serde_json::json!({"role": "assistant", "content": content}));
                }
                // Tool results go back as user-role content blocks.
                Role::Tool => {
                    let results: Vec<ToolResult> =
                        msg.tool_results_ref().into_iter().cloned().collect();
                    messages.push(serde_json::json!({
                        "role": "user",
                        "content": self.format_tool_results(&results),
                    }));
                }
            }
        }

        let mut body = serde_json::json!({
            "model": request.settings.model,
            "max_tokens": request.settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": messages,
        });
        let obj = body.as_object_mut().unwrap();

        if let Some(sys) = system {
            obj.insert("system".into(), sys.into());
        }
        if let Some(temp) = request.settings.temperature {
            obj.insert("temperature".into(), temp.into());
        }
        if !request.tools.is_empty() {
            obj.insert("tools".into(), self.convert_tool_definitions(&request.tools));
        }

        body
    }

    fn extract_tool_calls(&self, response: &serde_json::Value) -> Result<Vec<ToolCall>> {
        let content = response
            .get("content")
            .and_then(|v| v.as_array())
            .ok_or_else(|| adapter_error(self.name(), "response has no content array"))?;

        let mut calls = Vec::new();
        for block in content {
            if block.get("type").and_then(|v| v.as_str()) != Some("tool_use") {
                continue;
            }
            let name = block
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| adapter_error(self.name(), "tool_use block has no name"))?;
            let id = block
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(synthesize_call_id);
            calls.push(ToolCall {
                id,
                name: name.to_string(),
                input: block.get("input").cloned().unwrap_or_else(|| serde_json::json!({})),
            });
        }
        Ok(calls)
    }

    fn extract_text(&self, response: &serde_json::Value) -> Result<String> {
        let content = response
            .get("content")
            .and_then(|v| v.as_array())
            .ok_or_else(|| adapter_error(self.name(), "response has no content array"))?;

        let text = content
            .iter()
            .filter(|block| block.get("type").and_then(|v| v.as_str()) == Some("text"))
            .filter_map(|block| block.get("text").and_then(|v| v.as_str()))
            .collect::<Vec<_>>()
            .join("");
        Ok(text)
    }

    fn format_tool_results(&self, results: &[ToolResult]) -> serde_json::Value {
        let blocks: Vec<serde_json::Value> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "type": "tool_result",
                    "tool_use_id": r.tool_call_id,
                    "content": content_as_text(&r.content),
                    "is_error": r.is_error,
                })
            })
            .collect();
        blocks.into()
    }
}

fn content_as_text(content: &serde_json::Value) -> String {
    match content {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
