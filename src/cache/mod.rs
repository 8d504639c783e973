//! Response cache: TTL + capacity bounded store for completed provider
//! responses. A cost-avoidance optimization, not a correctness mechanism.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::types::GenerationSettings;

/// Default time-to-live for cached responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default sweep period for the background expiry task.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
    inserted_seq: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    seq: u64,
}

/// Keyed lookup/store for completed provider responses, safe under
/// concurrent access from multiple sessions.
pub struct ResponseCache {
    inner: Mutex<Inner>,
    capacity: usize,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
            default_ttl,
        }
    }

    /// Deterministic key over the normalized request: prompt plus every
    /// generation parameter that changes the provider's answer.
    pub fn key(prompt: &str, settings: &GenerationSettings) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        hasher.update([0x1f]);
        hasher.update(settings.model.as_bytes());
        hasher.update([0x1f]);
        hasher.update(format!("{:?}", settings.temperature).as_bytes());
        hasher.update([0x1f]);
        hasher.update(format!("{:?}", settings.max_tokens).as_bytes());
        hasher.update([0x1f]);
        hasher.update(settings.system_prompt.as_deref().unwrap_or("").as_bytes());
        hasher.update([0x1f]);
        hasher.update([settings.structured_output as u8]);
        format!("{:x}", hasher.finalize())
    }

    /// Look up a cached response. A present-but-expired entry is a miss and
    /// is removed lazily.
    pub fn get(&self, prompt: &str, settings: &GenerationSettings) -> Option<serde_json::Value> {
        let key = Self::key(prompt, settings);
        let mut inner = self.inner.lock().ok()?;
        match inner.entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                debug!(key = %&key[..8], "cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                inner.entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Store a response under the default TTL.
    pub fn set(&self, prompt: &str, settings: &GenerationSettings, value: serde_json::Value) {
        self.set_with_ttl(prompt, settings, value, self.default_ttl);
    }

    /// Store a response with a caller-chosen TTL. At capacity, the
    /// oldest-inserted entry is evicted first.
    pub fn set_with_ttl(
        &self,
        prompt: &str,
        settings: &GenerationSettings,
        value: serde_json::Value,
        ttl: Duration,
    ) {
        let key = Self::key(prompt, settings);
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            if let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_seq)
                .map(|(k, _)| k.clone())
            {
                inner.entries.remove(&oldest);
            }
        }
        inner.seq += 1;
        let seq = inner.seq;
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
                inserted_seq: seq,
            },
        );
    }

    /// Whether an unexpired entry exists for this request.
    pub fn has(&self, prompt: &str, settings: &GenerationSettings) -> bool {
        self.get(prompt, settings).is_some()
    }

    /// Invalidate one entry.
    pub fn remove(&self, prompt: &str, settings: &GenerationSettings) {
        let key = Self::key(prompt, settings);
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.remove(&key);
        }
    }

    /// Invalidate everything.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|i| i.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry now.
    pub fn sweep(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let now = Instant::now();
        let before = inner.entries.len();
        inner.entries.retain(|_, e| e.expires_at > now);
        let removed = before - inner.entries.len();
        if removed > 0 {
            debug!(removed, "cache sweep");
        }
    }

    /// Periodically remove expired entries independent of lookups, bounding
    /// growth from write-heavy, read-rarely keys. The task runs until the
    /// returned handle is aborted or the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                cache.sweep();
            }
        })
    }
}
