//! Summary persistence.

use orchestrator_core::{BrandSummary, Result};
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tracing::debug;

use brand_store::{BrandStore, KeyLayout};

use crate::retry::{retry, RetryPolicy};

/// Writes brand summaries with a TTL, overwriting the previous one.
pub struct SummaryPublisher {
    store: Arc<dyn BrandStore>,
    keys: KeyLayout,
    ttl: Duration,
    retry: RetryPolicy,
}

impl SummaryPublisher {
    pub fn new(store: Arc<dyn BrandStore>, keys: KeyLayout, ttl: Duration, retry: RetryPolicy) -> Self {
        Self {
            store,
            keys,
            ttl,
            retry,
        }
    }

    /// Serializes and stores `summary`, retrying transient store failures.
    pub async fn publish(&self, summary: &BrandSummary) -> Result<()> {
        let body = serde_json::to_string(summary)?;
        let key = self.keys.summary_key(&summary.brand);

        let store = &self.store;
        let (k, v, ttl) = (key.as_str(), body.as_str(), self.ttl);
        retry(&self.retry, "publish_summary", move || store.set_with_ttl(k, v, ttl)).await?;

        metrics().summaries_published.inc();
        debug!(key = %key, bytes = body.len(), ttl_secs = self.ttl.as_secs(), "Published summary");
        Ok(())
    }
}
