//! Health check aggregation.
//!
//! Two kinds of state are tracked: infrastructure components (the store)
//! and the outcome of each brand's most recent cycle.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

/// Health status for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn is_serving(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

/// Component health state.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    healthy: AtomicBool,
    message: RwLock<Option<String>>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            healthy: AtomicBool::new(false),
            message: RwLock::new(None),
        }
    }

    pub fn set_healthy(&self) {
        self.healthy.store(true, Ordering::Relaxed);
        *self.message.write() = None;
    }

    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        self.healthy.store(false, Ordering::Relaxed);
        *self.message.write() = Some(msg.into());
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> Option<String> {
        self.message.read().clone()
    }

    fn report(&self) -> ComponentHealthReport {
        ComponentHealthReport {
            name: self.name.to_string(),
            healthy: self.is_healthy(),
            message: self.message(),
        }
    }
}

/// Outcome of a brand's latest cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrandState {
    /// A cycle is in flight.
    Active,
    /// Last cycle published a summary.
    Succeeded,
    /// Last cycle found nothing to drain.
    NoData,
    /// Last cycle was abandoned.
    Failed,
}

#[derive(Debug, Clone)]
struct BrandEntry {
    state: BrandState,
    last_processed: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Per-brand cycle tracking.
#[derive(Debug, Default)]
pub struct BrandHealth {
    brands: RwLock<BTreeMap<String, BrandEntry>>,
}

impl BrandHealth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a cycle as started.
    pub fn mark_active(&self, brand: &str) {
        let mut brands = self.brands.write();
        brands
            .entry(brand.to_string())
            .and_modify(|e| e.state = BrandState::Active)
            .or_insert(BrandEntry {
                state: BrandState::Active,
                last_processed: None,
                last_error: None,
            });
    }

    /// Records a published summary.
    pub fn mark_succeeded(&self, brand: &str, at: DateTime<Utc>) {
        self.finish(brand, BrandState::Succeeded, Some(at), None);
    }

    /// Records a cycle that found an empty queue.
    pub fn mark_no_data(&self, brand: &str) {
        self.finish(brand, BrandState::NoData, None, None);
    }

    /// Records an abandoned cycle.
    pub fn mark_failed(&self, brand: &str, error: impl Into<String>) {
        self.finish(brand, BrandState::Failed, None, Some(error.into()));
    }

    /// Latest state of one brand.
    pub fn state(&self, brand: &str) -> Option<BrandState> {
        self.brands.read().get(brand).map(|e| e.state)
    }

    /// Time of the brand's last published summary.
    pub fn last_processed(&self, brand: &str) -> Option<DateTime<Utc>> {
        self.brands.read().get(brand).and_then(|e| e.last_processed)
    }

    /// Forgets one brand. Returns whether it was tracked.
    pub fn remove(&self, brand: &str) -> bool {
        self.brands.write().remove(brand).is_some()
    }

    /// Number of tracked brands.
    pub fn len(&self) -> usize {
        self.brands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.brands.read().is_empty()
    }

    /// Forgets every brand.
    pub fn clear(&self) {
        self.brands.write().clear();
    }

    fn finish(
        &self,
        brand: &str,
        state: BrandState,
        processed_at: Option<DateTime<Utc>>,
        error: Option<String>,
    ) {
        let mut brands = self.brands.write();
        let entry = brands.entry(brand.to_string()).or_insert(BrandEntry {
            state,
            last_processed: None,
            last_error: None,
        });
        entry.state = state;
        if processed_at.is_some() {
            entry.last_processed = processed_at;
        }
        // A later success clears the previous failure
        if state != BrandState::Failed {
            entry.last_error = None;
        }
        if error.is_some() {
            entry.last_error = error;
        }
    }

    pub fn report(&self) -> BrandsReport {
        let brands = self.brands.read();
        let mut report = BrandsReport::default();

        for (name, entry) in brands.iter() {
            match entry.state {
                BrandState::Active => report.active.insert(name.clone()),
                BrandState::Succeeded => report.succeeded.insert(name.clone()),
                BrandState::Failed => report.failed.insert(name.clone()),
                BrandState::NoData => false,
            };
            report.brands.push(BrandHealthReport {
                brand: name.clone(),
                state: entry.state,
                last_processed: entry.last_processed,
                last_error: entry.last_error.clone(),
            });
        }

        report
    }
}

/// Aggregated health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealthReport>,
    pub brands: BrandsReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthReport {
    pub name: String,
    pub healthy: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandsReport {
    pub active: BTreeSet<String>,
    pub succeeded: BTreeSet<String>,
    pub failed: BTreeSet<String>,
    pub brands: Vec<BrandHealthReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandHealthReport {
    pub brand: String,
    pub state: BrandState,
    pub last_processed: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Global health registry.
pub struct HealthRegistry {
    pub store: ComponentHealth,
    pub brands: BrandHealth,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            store: ComponentHealth::new("store"),
            brands: BrandHealth::new(),
        }
    }

    /// Generate a health report.
    ///
    /// Degraded when the store is reachable but the latest cycle of some
    /// brand failed.
    pub fn report(&self) -> HealthReport {
        let components = vec![self.store.report()];
        let brands = self.brands.report();

        let status = if !self.store.is_healthy() {
            HealthStatus::Unhealthy
        } else if !brands.failed.is_empty() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthReport {
            status,
            components,
            brands,
        }
    }

    /// Check if the service can accept traffic.
    pub fn is_ready(&self) -> bool {
        self.store.is_healthy()
    }

    /// Check if the service is alive.
    pub fn is_alive(&self) -> bool {
        true
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global health registry.
pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
