//! OpenAI Chat Completions wire format.

use crate::error::Result;
use crate::types::{ContentPart, Role, ToolCall, ToolDefinition, ToolResult};

use super::{adapter_error, synthesize_call_id, ProviderAdapter, ProviderRequest};

/// Adapter for the OpenAI chat-completions shape: flat function-tool list,
/// tool calls with stringified JSON arguments, one tool-role message per
/// result.
pub struct OpenAiAdapter;

impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn convert_tool_definitions(&self, tools: &[ToolDefinition]) -> serde_json::Value {
        let defs: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
        defs.into()
    }

    fn build_request(&self, request: &ProviderRequest) -> serde_json::Value {
        // A system message in the history overrides the settings prompt,
        // same as the other variants.
        let mut system = request.settings.system_prompt.clone();
        let mut messages = Vec::new();

        for msg in &request.messages {
            match msg.role {
                Role::System => system = Some(msg.text()),
                Role::User => {
                    messages.push(serde_json::json!({"role": "user", "content": msg.text()}))
                }
                Role::Assistant => {
                    let calls = msg.tool_calls();
                    if calls.is_empty() {
                        messages.push(serde_json::json!({
                            "role": "assistant",
                            "content": msg.text(),
                        }));
                    } else {
                        let tool_calls: Vec<serde_json::Value> = calls
                            .iter()
                            .map(|tc| {
                                serde_json::json!({
                                    "id": tc.id,
                                    "type": "function",
                                    "function": {
                                        "name": tc.name,
                                        "arguments": tc.input.to_string(),
                                    }
                                })
                            })
                            .collect();
                        let text = msg.text();
                        messages.push(serde_json::json!({
                            "role": "assistant",
                            "content": if text.is_empty() { serde_json::Value::Null } else { text.into() },
                            "tool_calls": tool_calls,
                        }));
                    }
                }
                Role::Tool => {
                    for part in &msg.content {
                        if let ContentPart::ToolResult(tr) = part {
                            for encoded in self
                                .format_tool_results(std::slice::from_ref(tr))
                                .as_array()
                                .into_iter()
                                .flatten()
                            {
                                messages.push(encoded.clone());
                            }
                        }
                    }
                }
            }
        }

        if let Some(sys) = system {
            messages.insert(0, serde_json::json!({"role": "system", "content": sys}));
        }

        let mut body = serde_json::json!({
            "model": request.settings.model,
            "messages": messages,
        });
        let obj = body.as_object_mut().unwrap();

        if let Some(max) = request.settings.max_tokens {
            obj.insert("max_tokens".into(), max.into());
        }
        if let Some(temp) = request.settings.temperature {
            obj.insert("temperature".into(), temp.into());
        }
        if request.settings.structured_output {
            obj.insert(
                "response_format".into(),
                serde_json::json!({"type": "json_object"}),
            );
        }
        if !request.tools.is_empty() {
            obj.insert("tools".into(), self.convert_tool_definitions(&request.tools));
        }

        body
    }

    fn extract_tool_calls(&self, response: &serde_json::Value) -> Result<Vec<ToolCall>> {
        let message = first_choice_message(response)
            .ok_or_else(|| adapter_error(self.name(), "response has no choices"))?;

        let Some(raw_calls) = message.get("tool_calls").and_then(|v| v.as_array()) else {
            return Ok(Vec::new());
        };

        let mut calls = Vec::new();
        for raw in raw_calls {
            let function = raw
                .get("function")
                .ok_or_else(|| adapter_error(self.name(), "tool call has no function"))?;
            let name = function
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| adapter_error(self.name(), "tool call has no name"))?;
            // Arguments arrive as a JSON string.
            let input = match function.get("arguments").and_then(|v| v.as_str()) {
                Some(args) if !args.trim().is_empty() => {
                    serde_json::from_str(args).map_err(|e| {
                        adapter_error(self.name(), format!("tool arguments are not JSON: {e}"))
                    })?
                }
                _ => serde_json::json!({}),
            };
            let id = raw
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(synthesize_call_id);
            calls.push(ToolCall {
                id,
                name: name.to_string(),
                input,
            });
        }
        Ok(calls)
    }

    fn extract_text(&self, response: &serde_json::Value) -> Result<String> {
        let message = first_choice_message(response)
            .ok_or_else(|| adapter_error(self.name(), "response has no choices"))?;
        Ok(message
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    fn format_tool_results(&self, results: &[ToolResult]) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = results
            .iter()
            .map(|r| {
                let content = match &r.content {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                serde_json::json!({
                    "role": "tool",
                    "tool_call_id": r.tool_call_id,
                    "content": content,
                })
            })
            .collect();
        messages.into()
    }
}

fn first_choice_message(response: &serde_json::Value) -> Option<&serde_json::Value> {
    response
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
}
