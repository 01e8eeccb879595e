//! Store abstraction used by the drainer, publisher and registry.

use async_trait::async_trait;
use orchestrator_core::Result;
use std::time::Duration;

/// Operations the orchestrator needs from its queue/summary store.
///
/// Implemented by [`crate::RedisStore`] in production and by an in-memory
/// mock in tests.
#[async_trait]
pub trait BrandStore: Send + Sync {
    /// Pops the head of `key`, waiting up to `timeout` for an entry.
    ///
    /// Returns `None` when the wait times out.
    async fn blocking_pop(&self, key: &str, timeout: Duration) -> Result<Option<String>>;

    /// Pops the head of `key` without waiting.
    async fn pop(&self, key: &str) -> Result<Option<String>>;

    /// Appends `value` to the list at `key`.
    async fn push(&self, key: &str, value: &str) -> Result<()>;

    /// Sets `key` to `value`, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Reads a string value.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Members of a set or list at `key` (empty when the key is missing).
    async fn members(&self, key: &str) -> Result<Vec<String>>;

    /// Keys matching a glob pattern.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Round-trip check.
    async fn ping(&self) -> Result<()>;

    /// Releases held connections. Later calls reconnect lazily.
    async fn close(&self);
}
