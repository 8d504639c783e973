//! HTTP transport for provider calls.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use crate::error::{Result, SwitchboardError};

use super::{AdapterKind, ProviderAdapter, ProviderRequest};

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// One provider call: send a request, return the raw response body.
///
/// The orchestrator owns retry/backoff; implementations surface rate limits
/// as [`SwitchboardError::RateLimited`] and everything else per the taxonomy.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn complete(&self, request: &ProviderRequest) -> Result<serde_json::Value>;
}

/// Reqwest-backed provider client for the three supported wire formats.
pub struct HttpProviderClient {
    adapter: Arc<dyn ProviderAdapter>,
    kind: AdapterKind,
    base_url: String,
    api_key: String,
}

impl HttpProviderClient {
    pub fn new(
        kind: AdapterKind,
        adapter: Arc<dyn ProviderAdapter>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            adapter,
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        match self.kind {
            AdapterKind::Anthropic => format!("{}/v1/messages", self.base_url),
            AdapterKind::OpenAi => format!("{}/v1/chat/completions", self.base_url),
            AdapterKind::Gemini => format!(
                "{}/v1beta/models/{}:generateContent?key={}",
                self.base_url, model, self.api_key
            ),
        }
    }

    fn headers(&self) -> HeaderMap {
        match self.kind {
            AdapterKind::Anthropic => anthropic_headers(&self.api_key, "2023-06-01"),
            AdapterKind::OpenAi => bearer_headers(&self.api_key),
            // Gemini authenticates via the key query parameter.
            AdapterKind::Gemini => json_headers(),
        }
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn complete(&self, request: &ProviderRequest) -> Result<serde_json::Value> {
        let body = self.adapter.build_request(request);
        let url = self.endpoint(&request.settings.model);

        debug!(provider = self.adapter.name(), model = %request.settings.model, "provider call");

        let resp = shared_client()
            .post(&url)
            .headers(self.headers())
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(self.adapter.name(), status, &body_text));
        }

        Ok(resp.json().await?)
    }
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = json_headers();
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Build Anthropic-style headers (x-api-key + version).
pub fn anthropic_headers(api_key: &str, version: &str) -> HeaderMap {
    let mut headers = json_headers();
    if let Ok(val) = HeaderValue::from_str(api_key) {
        headers.insert("x-api-key", val);
    }
    if let Ok(val) = HeaderValue::from_str(version) {
        headers.insert("anthropic-version", val);
    }
    headers
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// Map an HTTP status to the error taxonomy. 429 is the retryable class.
pub fn status_to_error(provider: &str, status: u16, body: &str) -> SwitchboardError {
    match status {
        429 => SwitchboardError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => SwitchboardError::Provider {
            provider: provider.to_string(),
            message: format!("status {status}: {body}"),
        },
    }
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}
