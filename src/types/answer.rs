//! Structured final answer parsed from the terminal provider response.

use serde::{Deserialize, Serialize};

/// An artifact attached to the final answer (document, code block, chart...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub title: String,
    pub content: String,
}

/// Terminal output of one orchestration turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    pub conversation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    /// Set when the provider response was served from the response cache.
    #[serde(default)]
    pub served_from_cache: bool,
    /// Set when the turn hit the iteration cap instead of finishing naturally.
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Deserialize)]
struct RawAnswer {
    #[serde(default)]
    thinking: Option<String>,
    conversation: String,
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

impl StructuredAnswer {
    /// Parse the provider's terminal text into the structured shape.
    ///
    /// Tolerates providers that ignore the structure: anything that is not a
    /// JSON object with a `conversation` field is wrapped as plain
    /// conversation text instead of failing the turn.
    pub fn parse(text: &str) -> Self {
        let candidate = strip_code_fence(text.trim());
        if let Ok(raw) = serde_json::from_str::<RawAnswer>(candidate) {
            return Self {
                thinking: raw.thinking,
                conversation: raw.conversation,
                artifacts: raw.artifacts,
                served_from_cache: false,
                truncated: false,
            };
        }
        Self::plain(text.trim())
    }

    /// Minimal valid shape: plain text as the conversation field.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            thinking: None,
            conversation: text.into(),
            artifacts: Vec::new(),
            served_from_cache: false,
            truncated: false,
        }
    }

    /// Answer emitted when the tool loop exceeds its iteration cap.
    pub fn truncation_notice(max_iterations: usize) -> Self {
        let mut answer = Self::plain(format!(
            "The conversation was cut short after {max_iterations} tool iterations \
             without reaching a final answer."
        ));
        answer.truncated = true;
        answer
    }
}

/// Strip a surrounding Markdown code fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .strip_suffix("```")
        .map(str::trim_end)
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_full_structured_shape() {
        let text = r#"{
            "thinking": "user wants a summary",
            "conversation": "Here is the summary.",
            "artifacts": [{"type": "markdown", "title": "Summary", "content": "- one"}]
        }"#;
        let answer = StructuredAnswer::parse(text);
        assert_eq!(answer.thinking.as_deref(), Some("user wants a summary"));
        assert_eq!(answer.conversation, "Here is the summary.");
        assert_eq!(answer.artifacts.len(), 1);
        assert_eq!(answer.artifacts[0].artifact_type, "markdown");
    }

    #[test]
    fn parses_inside_json_code_fence() {
        let text = "```json\n{\"conversation\": \"fenced\"}\n```";
        let answer = StructuredAnswer::parse(text);
        assert_eq!(answer.conversation, "fenced");
    }

    #[test]
    fn plain_text_falls_back_to_conversation() {
        let answer = StructuredAnswer::parse("Just a plain reply.");
        assert_eq!(answer.conversation, "Just a plain reply.");
        assert!(answer.thinking.is_none());
        assert!(answer.artifacts.is_empty());
    }

    #[test]
    fn json_without_conversation_field_is_treated_as_plain() {
        let answer = StructuredAnswer::parse(r#"{"data": 42}"#);
        assert_eq!(answer.conversation, r#"{"data": 42}"#);
    }

    #[test]
    fn truncation_notice_is_flagged() {
        let answer = StructuredAnswer::truncation_notice(5);
        assert!(answer.truncated);
        assert!(answer.conversation.contains("5 tool iterations"));
    }
}
