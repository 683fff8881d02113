//! In-process cache backend.
//!
//! Entries expire lazily: an expired entry is dropped on the read that
//! finds it. Keys are namespaced and case-folded so semantically equal
//! inputs share one entry.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

use crate::store::Cache;

const KEY_NAMESPACE: &str = "weather";

struct Entry {
    payload: serde_json::Value,
    expires_at: Instant,
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn make_key(key: &str) -> String {
        format!("{KEY_NAMESPACE}:{}", key.trim().to_lowercase())
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        let cache_key = Self::make_key(key);
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(&cache_key) {
            if entry.expires_at > now {
                trace!(key = %cache_key, "cache hit");
                return Some(entry.payload.clone());
            }
            trace!(key = %cache_key, "cache entry expired");
        }
        entries.remove(&cache_key);
        None
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> bool {
        let cache_key = Self::make_key(key);
        let entry = Entry {
            payload: value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().insert(cache_key, entry);
        true
    }

    async fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let cache_key = Self::make_key(key);
        let entries = self.entries.lock();
        let entry = entries.get(&cache_key)?;
        let remaining = entry.expires_at.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            None
        } else {
            Some(remaining)
        }
    }
}
