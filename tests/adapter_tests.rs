//! Cross-variant adapter tests: the same internal conversation must survive
//! every wire format, quirks included.

use serde_json::json;
use strum::IntoEnumIterator;

use switchboard::adapter::{create_adapter, AdapterKind, ProviderRequest};
use switchboard::types::{GenerationSettings, ModelMessage, ToolCall, ToolDefinition, ToolResult};

fn catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new("search:lookup", "Search the index").with_parameters(json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"],
        })),
        ToolDefinition::new("calc:add", "Add two numbers"),
    ]
}

fn tool_exchange() -> ProviderRequest {
    let call = ToolCall {
        id: "call_1".into(),
        name: "search:lookup".into(),
        input: json!({"query": "rust"}),
    };
    ProviderRequest {
        messages: vec![
            ModelMessage::system("Be terse."),
            ModelMessage::user("find rust docs"),
            ModelMessage::assistant_with_calls("Looking.", vec![call.clone()]),
            ModelMessage::tool_results(vec![ToolResult::ok(&call, json!({"hits": 3}))]),
        ],
        settings: GenerationSettings::new("test-model")
            .with_temperature(0.2)
            .with_max_tokens(512),
        tools: catalog(),
    }
}

/// The qualified tool names must appear verbatim in every variant's request;
/// namespacing is a contract the wire format may not mangle.
#[test]
fn every_variant_carries_qualified_names_verbatim() {
    let request = tool_exchange();
    for kind in AdapterKind::iter() {
        let body = create_adapter(kind).build_request(&request);
        let text = body.to_string();
        assert!(
            text.contains("search:lookup") && text.contains("calc:add"),
            "{kind}: request body lost a qualified tool name"
        );
    }
}

#[test]
fn every_variant_builds_a_complete_request() {
    let request = tool_exchange();
    for kind in AdapterKind::iter() {
        let body = create_adapter(kind).build_request(&request);
        assert!(body.is_object(), "{kind}: body is not an object");
        let text = body.to_string();
        assert!(text.contains("find rust docs"), "{kind}: user prompt missing");
        assert!(text.contains("Be terse."), "{kind}: system prompt missing");
    }
}

#[test]
fn anthropic_and_openai_carry_every_result_gemini_only_the_first() {
    let call_a = ToolCall { id: "a".into(), name: "s:x".into(), input: json!({}) };
    let call_b = ToolCall { id: "b".into(), name: "s:y".into(), input: json!({}) };
    let results = vec![
        ToolResult::ok(&call_a, json!("one")),
        ToolResult::ok(&call_b, json!("two")),
    ];

    let anthropic = create_adapter(AdapterKind::Anthropic).format_tool_results(&results);
    assert_eq!(anthropic.as_array().unwrap().len(), 2);

    let openai = create_adapter(AdapterKind::OpenAi).format_tool_results(&results);
    assert_eq!(openai.as_array().unwrap().len(), 2);

    let gemini = create_adapter(AdapterKind::Gemini).format_tool_results(&results);
    assert_eq!(gemini["parts"].as_array().unwrap().len(), 1);
}

/// Each variant's canonical tool-call response must normalize to the same
/// internal call (Gemini's synthesized id aside).
#[test]
fn tool_calls_normalize_identically_across_variants() {
    let cases = [
        (
            AdapterKind::Anthropic,
            json!({
                "content": [{
                    "type": "tool_use", "id": "toolu_1",
                    "name": "search:lookup", "input": {"query": "rust"}
                }]
            }),
        ),
        (
            AdapterKind::OpenAi,
            json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1", "type": "function",
                            "function": {
                                "name": "search:lookup",
                                "arguments": "{\"query\":\"rust\"}"
                            }
                        }]
                    }
                }]
            }),
        ),
        (
            AdapterKind::Gemini,
            json!({
                "candidates": [{
                    "content": {"parts": [{
                        "functionCall": {"name": "search:lookup", "args": {"query": "rust"}}
                    }]}
                }]
            }),
        ),
    ];

    for (kind, response) in cases {
        let calls = create_adapter(kind).extract_tool_calls(&response).unwrap();
        assert_eq!(calls.len(), 1, "{kind}");
        assert_eq!(calls[0].name, "search:lookup", "{kind}");
        assert_eq!(calls[0].input, json!({"query": "rust"}), "{kind}");
        assert!(!calls[0].id.is_empty(), "{kind}: every call needs an id");
    }
}

#[test]
fn text_only_responses_yield_no_calls_in_any_variant() {
    let cases = [
        (
            AdapterKind::Anthropic,
            json!({"content": [{"type": "text", "text": "done"}]}),
        ),
        (
            AdapterKind::OpenAi,
            json!({"choices": [{"message": {"content": "done"}}]}),
        ),
        (
            AdapterKind::Gemini,
            json!({"candidates": [{"content": {"parts": [{"text": "done"}]}}]}),
        ),
    ];
    for (kind, response) in cases {
        let adapter = create_adapter(kind);
        assert!(adapter.extract_tool_calls(&response).unwrap().is_empty(), "{kind}");
        assert_eq!(adapter.extract_text(&response).unwrap(), "done", "{kind}");
    }
}

#[test]
fn shape_errors_are_adapter_errors_in_every_variant() {
    let garbage = json!({"unexpected": true});
    for kind in AdapterKind::iter() {
        let err = create_adapter(kind).extract_tool_calls(&garbage).unwrap_err();
        assert!(
            matches!(err, switchboard::error::SwitchboardError::Adapter { .. }),
            "{kind}: expected an adapter error"
        );
    }
}
