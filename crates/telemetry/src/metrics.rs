//! In-process metrics.
//!
//! Everything is kept in atomics and exposed as a JSON snapshot on
//! `/metrics`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements, stopping at zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s, 30s
    buckets: [AtomicU64; 12],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 12] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000, 30000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns `(upper bound, count)` per bucket.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }

    fn snapshot(&self) -> HistogramSnapshot {
        HistogramSnapshot {
            count: self.count(),
            sum_ms: self.sum(),
            mean_ms: self.mean(),
            buckets: self.buckets(),
        }
    }
}

/// Collected metrics for the orchestrator.
#[derive(Debug, Default)]
pub struct Metrics {
    // Scheduling loop
    pub ticks: Counter,
    pub loop_errors: Counter,

    // Per-brand outcomes
    pub brands_processed: Counter,
    pub brands_skipped: Counter,
    pub brands_failed: Counter,

    // Aggregation
    pub chunks_merged: Counter,
    pub chunks_quarantined: Counter,
    pub clusters_produced: Counter,
    pub summaries_published: Counter,

    // Store
    pub store_errors: Counter,
    pub store_retries: Counter,

    // Latency histograms
    pub brand_processing_ms: Histogram,
    pub queue_wait_ms: Histogram,
    pub store_read_latency_ms: Histogram,
    pub store_write_latency_ms: Histogram,

    // Gauges
    pub active_brands: Gauge,
    pub memory_bytes: Gauge,
    /// CPU usage in hundredths of a percent.
    pub cpu_usage_basis_points: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum_ms: u64,
    pub mean_ms: f64,
    pub buckets: Vec<(u64, u64)>,
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub ticks: u64,
    pub loop_errors: u64,
    pub brands_processed: u64,
    pub brands_skipped: u64,
    pub brands_failed: u64,
    pub chunks_merged: u64,
    pub chunks_quarantined: u64,
    pub clusters_produced: u64,
    pub summaries_published: u64,
    pub store_errors: u64,
    pub store_retries: u64,
    pub brand_processing_ms: HistogramSnapshot,
    pub queue_wait_ms: HistogramSnapshot,
    pub store_read_latency_ms: HistogramSnapshot,
    pub store_write_latency_ms: HistogramSnapshot,
    pub active_brands: u64,
    pub memory_bytes: u64,
    pub cpu_usage_percent: f64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            ticks: self.ticks.get(),
            loop_errors: self.loop_errors.get(),
            brands_processed: self.brands_processed.get(),
            brands_skipped: self.brands_skipped.get(),
            brands_failed: self.brands_failed.get(),
            chunks_merged: self.chunks_merged.get(),
            chunks_quarantined: self.chunks_quarantined.get(),
            clusters_produced: self.clusters_produced.get(),
            summaries_published: self.summaries_published.get(),
            store_errors: self.store_errors.get(),
            store_retries: self.store_retries.get(),
            brand_processing_ms: self.brand_processing_ms.snapshot(),
            queue_wait_ms: self.queue_wait_ms.snapshot(),
            store_read_latency_ms: self.store_read_latency_ms.snapshot(),
            store_write_latency_ms: self.store_write_latency_ms.snapshot(),
            active_brands: self.active_brands.get(),
            memory_bytes: self.memory_bytes.get(),
            cpu_usage_percent: self.cpu_usage_basis_points.get() as f64 / 100.0,
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
