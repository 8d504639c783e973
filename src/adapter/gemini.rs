//! Google Gemini generateContent wire format.

use tracing::warn;

use crate::error::Result;
use crate::types::{Role, ToolCall, ToolDefinition, ToolResult};

use super::{adapter_error, synthesize_call_id, ProviderAdapter, ProviderRequest};

/// Adapter for the Gemini shape. Two quirks the other variants do not have:
/// all tools live inside a single `functionDeclarations` container, and a
/// follow-up turn carries at most one `functionResponse`, so only the first
/// pending result is encoded (the rest are dropped with a warning).
pub struct GeminiAdapter;

impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn convert_tool_definitions(&self, tools: &[ToolDefinition]) -> serde_json::Value {
        let fn_decls: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                })
            })
            .collect();
        // One outer declaration container wrapping every tool.
        serde_json::json!([{ "functionDeclarations": fn_decls }])
    }

    fn build_request(&self, request: &ProviderRequest) -> serde_json::Value {
        let mut system_instruction = request
            .settings
            .system_prompt
            .as_ref()
            .map(|s| serde_json::json!({"parts": [{"text": s}]}));
        let mut contents = Vec::new();

        for msg in &request.messages {
            match msg.role {
                Role::System => {
                    system_instruction =
                        Some(serde_json::json!({"parts": [{"text": msg.text()}]}));
                }
                Role::User => contents.push(serde_json::json!({
                    "role": "user",
                    "parts": [{"text": msg.text()}],
                })),
                Role::Assistant => {
                    let mut parts = Vec::new();
                    let text = msg.text();
                    if !text.is_empty() {
                        parts.push(serde_json::json!({"text": text}));
                    }
                    for tc in msg.tool_calls() {
                        parts.push(serde_json::json!({
                            "functionCall": {"name": tc.name, "args": tc.input}
                        }));
                    }
                    contents.push(serde_json::json!({"role": "model", "parts": parts}));
                }
                Role::Tool => {
                    let results: Vec<ToolResult> =
                        msg.tool_results_ref().into_iter().cloned().collect();
                    contents.push(self.format_tool_results(&results));
                }
            }
        }

        let mut body = serde_json::json!({ "contents": contents });
        let obj = body.as_object_mut().unwrap();

        if let Some(sys) = system_instruction {
            obj.insert("systemInstruction".into(), sys);
        }

        let mut gen_config = serde_json::Map::new();
        if let Some(max) = request.settings.max_tokens {
            gen_config.insert("maxOutputTokens".into(), max.into());
        }
        if let Some(temp) = request.settings.temperature {
            gen_config.insert("temperature".into(), temp.into());
        }
        if request.settings.structured_output {
            gen_config.insert("responseMimeType".into(), "application/json".into());
        }
        if !gen_config.is_empty() {
            obj.insert(
                "generationConfig".into(),
                serde_json::Value::Object(gen_config),
            );
        }

        if !request.tools.is_empty() {
            obj.insert("tools".into(), self.convert_tool_definitions(&request.tools));
        }

        body
    }

    fn extract_tool_calls(&self, response: &serde_json::Value) -> Result<Vec<ToolCall>> {
        let candidates = response
            .get("candidates")
            .and_then(|v| v.as_array())
            .ok_or_else(|| adapter_error(self.name(), "response has no candidates"))?;

        // Anything below the candidate may legitimately be absent on a
        // no-call response; absent and empty are treated identically.
        let parts = candidates
            .first()
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array());

        let mut calls = Vec::new();
        for part in parts.into_iter().flatten() {
            let Some(fc) = part.get("functionCall") else {
                continue;
            };
            let Some(name) = fc.get("name").and_then(|v| v.as_str()) else {
                continue;
            };
            // Gemini never assigns call ids.
            calls.push(ToolCall {
                id: synthesize_call_id(),
                name: name.to_string(),
                input: fc.get("args").cloned().unwrap_or_else(|| serde_json::json!({})),
            });
        }
        Ok(calls)
    }

    fn extract_text(&self, response: &serde_json::Value) -> Result<String> {
        let candidates = response
            .get("candidates")
            .and_then(|v| v.as_array())
            .ok_or_else(|| adapter_error(self.name(), "response has no candidates"))?;

        let text = candidates
            .first()
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .into_iter()
            .flatten()
            .filter_map(|part| part.get("text").and_then(|v| v.as_str()))
            .collect::<Vec<_>>()
            .join("");
        Ok(text)
    }

    /// Gemini accepts a single `functionResponse` per request cycle: only the
    /// first result is carried. Callers must not assume all results made it
    /// back to the provider.
    fn format_tool_results(&self, results: &[ToolResult]) -> serde_json::Value {
        if results.len() > 1 {
            warn!(
                dropped = results.len() - 1,
                "gemini carries one tool result per turn; dropping the rest"
            );
        }
        let parts: Vec<serde_json::Value> = results
            .iter()
            .take(1)
            .map(|r| {
                serde_json::json!({
                    "functionResponse": {
                        "name": r.tool_name,
                        "response": {"content": r.content},
                    }
                })
            })
            .collect();
        serde_json::json!({ "role": "function", "parts": parts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SwitchboardError;
    use serde_json::json;

    #[test]
    fn all_tools_share_one_declaration_container() {
        let tools = vec![
            ToolDefinition::new("search:lookup", "Search"),
            ToolDefinition::new("calc:add", "Add"),
        ];
        let defs = GeminiAdapter.convert_tool_definitions(&tools);
        let containers = defs.as_array().unwrap();
        assert_eq!(containers.len(), 1);
        let decls = containers[0]["functionDeclarations"].as_array().unwrap();
        assert_eq!(decls.len(), 2);
    }

    #[test]
    fn extracts_function_calls_and_synthesizes_ids() {
        let response = json!({
            "candidates": [{
                "content": {"parts": [
                    {"functionCall": {"name": "search:lookup", "args": {"query": "rust"}}}
                ]}
            }]
        });
        let calls = GeminiAdapter.extract_tool_calls(&response).unwrap();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].id.is_empty());
        assert_eq!(calls[0].input["query"], "rust");
    }

    #[test]
    fn absent_parts_means_no_calls() {
        // Candidate with no content at all: the accessor is simply missing.
        let response = json!({"candidates": [{}]});
        assert!(GeminiAdapter
            .extract_tool_calls(&response)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn missing_candidates_is_an_adapter_error() {
        let err = GeminiAdapter
            .extract_tool_calls(&json!({"error": "oops"}))
            .unwrap_err();
        assert!(matches!(err, SwitchboardError::Adapter { .. }));
    }

    #[test]
    fn only_first_result_is_encoded() {
        let call_a = ToolCall { id: "a".into(), name: "s:x".into(), input: json!({}) };
        let call_b = ToolCall { id: "b".into(), name: "s:y".into(), input: json!({}) };
        let results = vec![
            ToolResult::ok(&call_a, json!("kept")),
            ToolResult::ok(&call_b, json!("dropped")),
        ];
        let encoded = GeminiAdapter.format_tool_results(&results);
        let parts = encoded["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["functionResponse"]["name"], "s:x");
    }

    #[test]
    fn extract_text_concatenates_parts() {
        let response = json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hello "}, {"text": "there"}]}
            }]
        });
        assert_eq!(GeminiAdapter.extract_text(&response).unwrap(), "Hello there");
    }
}
