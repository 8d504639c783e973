//! Error types for Switchboard.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primary error type for all Switchboard operations.
#[derive(Error, Debug)]
pub enum SwitchboardError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider response did not have the shape the adapter expects.
    #[error("Adapter error ({adapter}): {message}")]
    Adapter { adapter: String, message: String },

    /// Non-rate-limit failure from the LLM provider call.
    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Failed to start tool server '{server}': {message}")]
    ProcessStart { server: String, message: String },

    #[error("Tool server '{server}' exited with requests in flight")]
    ProcessCrash { server: String },

    #[error("Tool call '{tool}' timed out after {timeout_ms}ms")]
    ToolTimeout { tool: String, timeout_ms: u64 },

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// Tool subprocess answered the call with an error record.
    #[error("Tool execution error: {tool} — {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Invalid tool input: {0}")]
    Validation(String),

    /// Non-fatal; callers degrade to a direct provider call.
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification, mirrored into [`ErrorPayload::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Adapter,
    Provider,
    RateLimit,
    ProcessStart,
    ProcessCrash,
    ToolTimeout,
    ToolNotFound,
    ToolExecution,
    Validation,
    Cache,
    Network,
    Io,
    Serialization,
}

/// Structured error surface handed to callers. Never a raw exception type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl SwitchboardError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Adapter { .. } => ErrorKind::Adapter,
            Self::Provider { .. } => ErrorKind::Provider,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::ProcessStart { .. } => ErrorKind::ProcessStart,
            Self::ProcessCrash { .. } => ErrorKind::ProcessCrash,
            Self::ToolTimeout { .. } => ErrorKind::ToolTimeout,
            Self::ToolNotFound(_) => ErrorKind::ToolNotFound,
            Self::ToolExecution { .. } => ErrorKind::ToolExecution,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Cache(_) => ErrorKind::Cache,
            Self::Network(_) => ErrorKind::Network,
            Self::Io(_) => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Whether the provider call that produced this error may be retried.
    ///
    /// Only rate limits are retried; every other class propagates immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Convert into the caller-facing structured payload.
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SwitchboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rate_limit_is_retryable() {
        assert!(SwitchboardError::RateLimited {
            retry_after_ms: None
        }
        .is_retryable());

        let not_retryable = [
            SwitchboardError::Provider {
                provider: "openai".into(),
                message: "bad auth".into(),
            },
            SwitchboardError::ToolNotFound("search:lookup".into()),
            SwitchboardError::ProcessCrash {
                server: "search".into(),
            },
            SwitchboardError::Validation("missing field".into()),
        ];
        for err in not_retryable {
            assert!(!err.is_retryable(), "{err} should not be retryable");
        }
    }

    #[test]
    fn payload_carries_kind_and_retryable() {
        let payload = SwitchboardError::RateLimited {
            retry_after_ms: Some(1500),
        }
        .payload();
        assert_eq!(payload.kind, ErrorKind::RateLimit);
        assert!(payload.retryable);

        let payload = SwitchboardError::ToolTimeout {
            tool: "search:lookup".into(),
            timeout_ms: 5000,
        }
        .payload();
        assert_eq!(payload.kind, ErrorKind::ToolTimeout);
        assert!(!payload.retryable);
        assert!(payload.message.contains("5000ms"));
    }
}
