//! Configuration: provider selection, tool servers, loop and cache tuning.
//!
//! Loaded from a TOML file plus environment variables; API keys resolve from
//! the file first, then the conventional env var for the chosen provider.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::adapter::AdapterKind;
use crate::error::{Result, SwitchboardError};
use crate::util::RetryPolicy;

/// One tool-server entry: the subprocess to spawn and supervise.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Provider selection and credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Adapter variant name: "anthropic", "openai", or "gemini".
    pub adapter: String,
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn adapter_kind(&self) -> Result<AdapterKind> {
        self.adapter.parse().map_err(|_| {
            SwitchboardError::Configuration(format!("unknown provider '{}'", self.adapter))
        })
    }

    /// Resolve the API key: explicit config first, then the provider's
    /// conventional environment variable.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(ref key) = self.api_key {
            return Ok(key.clone());
        }
        let env_vars: &[&str] = match self.adapter_kind()? {
            AdapterKind::Anthropic => &["ANTHROPIC_API_KEY"],
            AdapterKind::OpenAi => &["OPENAI_API_KEY"],
            AdapterKind::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        };
        for var in env_vars {
            if let Ok(key) = std::env::var(var) {
                return Ok(key);
            }
        }
        Err(SwitchboardError::Configuration(format!(
            "no API key for '{}' (set {})",
            self.adapter, env_vars[0]
        )))
    }

    /// Base URL, defaulting to the provider's public endpoint.
    pub fn resolve_base_url(&self) -> Result<String> {
        if let Some(ref url) = self.base_url {
            return Ok(url.clone());
        }
        Ok(match self.adapter_kind()? {
            AdapterKind::Anthropic => "https://api.anthropic.com".to_string(),
            AdapterKind::OpenAi => "https://api.openai.com".to_string(),
            AdapterKind::Gemini => "https://generativelanguage.googleapis.com".to_string(),
        })
    }
}

/// Orchestration loop tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Maximum tool iterations before the turn is truncated.
    pub max_iterations: usize,
    pub tool_timeout_ms: u64,
    pub retry_max_attempts: u32,
    pub retry_initial_backoff_ms: u64,
    pub retry_max_backoff_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tool_timeout_ms: 30_000,
            retry_max_attempts: 3,
            retry_initial_backoff_ms: 500,
            retry_max_backoff_ms: 30_000,
        }
    }
}

impl LoopConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            initial_backoff: Duration::from_millis(self.retry_initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry_max_backoff_ms),
        }
    }
}

/// Response-cache tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl_secs: 300,
            sweep_interval_secs: 60,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub servers: Vec<ToolServerConfig>,
    #[serde(default, rename = "loop")]
    pub loop_config: LoopConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Parse from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| SwitchboardError::Configuration(e.to_string()))
    }

    /// Load from a TOML file, after loading `.env` if present.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
