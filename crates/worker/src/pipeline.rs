//! One brand's cycle: drain, aggregate, publish.

use chrono::{DateTime, Utc};
use orchestrator_core::{aggregate_chunks, BrandSlug, BrandSummary, Result};
use std::sync::Arc;
use telemetry::metrics;
use tracing::{debug, info};

use brand_store::{BrandStore, KeyLayout};

use crate::config::PipelineConfig;
use crate::drainer::ChunkDrainer;
use crate::publisher::SummaryPublisher;

/// What a brand cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum BrandOutcome {
    /// No valid chunks were drained; nothing was published.
    NoData { quarantined: usize },
    /// A summary was written.
    Published {
        chunks: usize,
        clusters: usize,
        quarantined: usize,
        generated_at: DateTime<Utc>,
    },
}

/// Runs the per-brand pipeline. Holds no state between cycles.
pub struct BrandPipeline {
    drainer: ChunkDrainer,
    publisher: SummaryPublisher,
    similarity_threshold: f64,
}

impl BrandPipeline {
    pub fn new(drainer: ChunkDrainer, publisher: SummaryPublisher, similarity_threshold: f64) -> Self {
        Self {
            drainer,
            publisher,
            similarity_threshold,
        }
    }

    /// Builds the drainer and publisher from `config`.
    pub fn from_config(store: Arc<dyn BrandStore>, keys: KeyLayout, config: &PipelineConfig) -> Self {
        let retry = config.retry_policy();
        let drainer = ChunkDrainer::new(store.clone(), keys.clone(), config.queue_wait(), retry);
        let publisher = SummaryPublisher::new(store, keys, config.summary_ttl(), retry);
        Self::new(drainer, publisher, config.similarity_threshold)
    }

    /// Processes one batch for `brand`.
    pub async fn process(&self, brand: &BrandSlug) -> Result<BrandOutcome> {
        let drained = self.drainer.drain(brand).await?;
        if drained.is_empty() {
            debug!(quarantined = drained.quarantined, "No data");
            return Ok(BrandOutcome::NoData {
                quarantined: drained.quarantined,
            });
        }

        let aggregate = aggregate_chunks(brand, &drained.chunks, self.similarity_threshold);
        metrics().chunks_merged.inc_by(aggregate.total_chunks as u64);
        metrics().clusters_produced.inc_by(aggregate.clusters.len() as u64);

        let generated_at = Utc::now();
        let summary = BrandSummary::from_aggregate(&aggregate, generated_at);
        self.publisher.publish(&summary).await?;

        info!(
            chunks = aggregate.total_chunks,
            mentions = aggregate.total_mentions,
            clusters = aggregate.clusters.len(),
            quarantined = drained.quarantined,
            io_ms = drained.io_time.as_millis() as u64,
            "Brand summary published"
        );

        Ok(BrandOutcome::Published {
            chunks: aggregate.total_chunks,
            clusters: aggregate.clusters.len(),
            quarantined: drained.quarantined,
            generated_at,
        })
    }
}
