//! Store health probe.

use telemetry::health;
use tracing::warn;

use crate::store::BrandStore;

/// Pings the store and records the result on the `store` health component.
pub async fn check_connection(store: &dyn BrandStore) -> bool {
    match store.ping().await {
        Ok(()) => {
            health().store.set_healthy();
            true
        }
        Err(e) => {
            warn!(error = %e, "Store ping failed");
            health().store.set_unhealthy(e.to_string());
            false
        }
    }
}
