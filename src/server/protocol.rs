//! Line-framed wire protocol spoken with tool subprocesses.
//!
//! One JSON record per line in each direction. Requests carry
//! `{id, kind, tool?, input?}`; responses carry `{id, result}` or
//! `{id, error}`. Only the `id` proves a response belongs to a request —
//! arrival order is never assumed.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Request kinds a tool server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestKind {
    #[serde(rename = "listTools")]
    ListTools,
    #[serde(rename = "callTool")]
    CallTool,
}

/// One request record.
#[derive(Debug, Serialize)]
pub struct WireRequest<'a> {
    pub id: u64,
    pub kind: RequestKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<&'a serde_json::Value>,
}

/// One response record.
#[derive(Debug, Deserialize)]
pub struct WireResponse {
    pub id: u64,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl WireResponse {
    /// Collapse into the success value or the error message.
    pub fn into_outcome(self) -> std::result::Result<serde_json::Value, String> {
        if let Some(error) = self.error {
            let message = match error {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            return Err(message);
        }
        Ok(self.result.unwrap_or(serde_json::Value::Null))
    }
}

/// Serialize a request as one line (without the trailing newline).
///
/// JSON string escaping guarantees the output contains no raw newline.
pub fn encode_request(request: &WireRequest<'_>) -> Result<String> {
    Ok(serde_json::to_string(request)?)
}

/// Parse one line from a tool server. A line that does not parse is a
/// protocol error for that single exchange, not a fatal condition.
pub fn parse_response(line: &str) -> Result<WireResponse> {
    Ok(serde_json::from_str(line)?)
}
