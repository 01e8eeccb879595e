//! Brand listing.

use orchestrator_core::{normalize_brands, BrandSlug, Result};
use std::sync::Arc;
use tracing::debug;

use brand_store::{BrandStore, KeyLayout};

use crate::retry::{retry, RetryPolicy};

/// Lists the brands to process on a tick.
///
/// Reads the registry key first. When it is empty and discovery is on,
/// brands are taken from the names of existing result queues instead.
pub struct BrandRegistry {
    store: Arc<dyn BrandStore>,
    keys: KeyLayout,
    retry: RetryPolicy,
    discover_from_queues: bool,
}

impl BrandRegistry {
    pub fn new(
        store: Arc<dyn BrandStore>,
        keys: KeyLayout,
        retry: RetryPolicy,
        discover_from_queues: bool,
    ) -> Self {
        Self {
            store,
            keys,
            retry,
            discover_from_queues,
        }
    }

    /// Normalized, sorted, deduplicated brand slugs.
    pub async fn list(&self) -> Result<Vec<BrandSlug>> {
        let store = &self.store;
        let registry_key = self.keys.registry_key();

        let members = retry(&self.retry, "list_registry", move || store.members(registry_key)).await?;
        let brands = normalize_brands(&members);
        if !brands.is_empty() || !self.discover_from_queues {
            debug!(count = brands.len(), "Listed brands from registry");
            return Ok(brands);
        }

        let pattern = self.keys.queue_pattern();
        let pattern = pattern.as_str();
        let queues = retry(&self.retry, "scan_queues", move || store.scan_keys(pattern)).await?;
        let brands = normalize_brands(
            queues
                .iter()
                .filter_map(|key| self.keys.brand_from_queue_key(key)),
        );

        debug!(count = brands.len(), "Discovered brands from result queues");
        Ok(brands)
    }
}
