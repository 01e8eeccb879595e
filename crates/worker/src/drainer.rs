//! Block-then-drain reads of a brand's result queue.
//!
//! One blocking pop waits for the first payload; non-blocking pops then
//! empty whatever else is queued. Popped payloads are gone from the store,
//! so a crash before publishing loses the batch.

use chrono::Utc;
use orchestrator_core::{parse_chunk, BrandSlug, ChunkRejection, ChunkResult, FailedChunkRecord, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::metrics;
use tracing::{debug, error, warn};

use brand_store::{BrandStore, KeyLayout};

use crate::retry::{retry, RetryPolicy};

/// Result of draining one queue.
#[derive(Debug, Default)]
pub struct DrainOutcome {
    /// Valid chunks in pop order
    pub chunks: Vec<ChunkResult>,
    /// Payloads written to the failed collection (or dropped if that failed)
    pub quarantined: usize,
    /// Time spent in store calls, including the blocking wait
    pub io_time: Duration,
}

impl DrainOutcome {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Drains a brand's result queue and validates each payload.
pub struct ChunkDrainer {
    store: Arc<dyn BrandStore>,
    keys: KeyLayout,
    queue_wait: Duration,
    retry: RetryPolicy,
}

impl ChunkDrainer {
    pub fn new(
        store: Arc<dyn BrandStore>,
        keys: KeyLayout,
        queue_wait: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            keys,
            queue_wait,
            retry,
        }
    }

    /// Reads one batch for `brand`.
    ///
    /// A timed-out first wait returns an empty outcome without any further
    /// pops. A failure on the first wait is returned; a failure part-way
    /// through the drain keeps what was already popped.
    pub async fn drain(&self, brand: &BrandSlug) -> Result<DrainOutcome> {
        let queue = self.keys.queue_key(brand);
        let store = &self.store;
        let key = queue.as_str();
        let wait = self.queue_wait;

        let started = Instant::now();
        let first = retry(&self.retry, "blocking_pop", move || store.blocking_pop(key, wait)).await;
        let waited = started.elapsed();
        metrics().queue_wait_ms.observe(waited.as_millis() as u64);

        let mut outcome = DrainOutcome {
            io_time: waited,
            ..Default::default()
        };

        let Some(first) = first? else {
            debug!(queue = %queue, "Queue wait timed out");
            return Ok(outcome);
        };

        let mut payloads = vec![first];
        loop {
            let started = Instant::now();
            let next = retry(&self.retry, "pop", move || store.pop(key)).await;
            outcome.io_time += started.elapsed();

            match next {
                Ok(Some(payload)) => payloads.push(payload),
                Ok(None) => break,
                Err(e) => {
                    warn!(
                        queue = %queue,
                        popped = payloads.len(),
                        error = %e,
                        "Drain interrupted, keeping popped payloads"
                    );
                    break;
                }
            }
        }

        for payload in payloads {
            match parse_chunk(&payload, brand) {
                Ok(chunk) => outcome.chunks.push(chunk),
                Err(rejection) => {
                    let started = Instant::now();
                    self.quarantine(brand, &rejection, &payload).await;
                    outcome.io_time += started.elapsed();
                    outcome.quarantined += 1;
                }
            }
        }

        metrics().chunks_quarantined.inc_by(outcome.quarantined as u64);
        debug!(
            brand = %brand,
            chunks = outcome.chunks.len(),
            quarantined = outcome.quarantined,
            io_ms = outcome.io_time.as_millis() as u64,
            "Drained queue"
        );

        Ok(outcome)
    }

    /// Appends a failed record. Never fails the drain.
    async fn quarantine(&self, brand: &BrandSlug, rejection: &ChunkRejection, payload: &str) {
        warn!(brand = %brand, reason = %rejection, "Quarantining invalid chunk result");

        let record = FailedChunkRecord::new(brand, rejection, payload, Utc::now());
        let body = match serde_json::to_string(&record) {
            Ok(body) => body,
            Err(e) => {
                error!(brand = %brand, error = %e, "Failed to serialize failed record");
                return;
            }
        };

        let store = &self.store;
        let key = self.keys.failed_key(brand);
        let key = key.as_str();
        let body = body.as_str();
        if let Err(e) = retry(&self.retry, "push_failed", move || store.push(key, body)).await {
            error!(brand = %brand, error = %e, "Failed to quarantine payload, dropping it");
        }
    }
}

