//! Cache capability: total `get`/`set`/`remaining_ttl`, no errors surfaced.

use std::time::Duration;

use async_trait::async_trait;

/// Key/value cache with per-key TTL.
///
/// Values are JSON payloads; the caller owns (de)serialization so a
/// corrupted entry can be treated as a plain miss.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Look up a key. `None` means miss, expired, or backing store
    /// unavailable; the distinction is deliberately invisible.
    async fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Store a value for `ttl`. Best-effort; returns whether the write
    /// took effect so the caller can log, never fail.
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> bool;

    /// Time until `key` expires, `None` if absent.
    async fn remaining_ttl(&self, key: &str) -> Option<Duration>;
}
