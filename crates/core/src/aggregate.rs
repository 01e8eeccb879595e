//! Per-brand aggregation of one drained batch.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::brand::BrandSlug;
use crate::chunk::{ChunkResult, MentionCluster, Sentiment};
use crate::merge::merge_clusters;

/// Brand-level aggregate of a single batch. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedBrandData {
    pub brand: BrandSlug,
    pub total_chunks: usize,
    pub total_mentions: u64,
    pub sentiment: Sentiment,
    /// Unique topics in first-discovery order.
    pub topics: Vec<String>,
    pub clusters: Vec<MentionCluster>,
    pub spike_detected: bool,
    /// Non-empty chunk summaries in chunk order.
    pub chunk_summaries: Vec<String>,
}

/// Combines a batch of validated chunks into one aggregate.
///
/// Mention totals are taken per chunk before merging, so merged clusters
/// never double- or under-count.
pub fn aggregate_chunks(
    brand: &BrandSlug,
    chunks: &[ChunkResult],
    similarity_threshold: f64,
) -> AggregatedBrandData {
    let mut sentiment = Sentiment::default();
    let mut total_mentions = 0u64;
    let mut topics = Vec::new();
    let mut seen_topics = HashSet::new();
    let mut spike_detected = false;
    let mut chunk_summaries = Vec::new();

    for chunk in chunks {
        sentiment += chunk.sentiment;
        total_mentions += chunk.mention_count();
        spike_detected |= chunk.spike_detected.unwrap_or(false);

        for topic in &chunk.topics {
            let topic = topic.trim();
            if !topic.is_empty() && seen_topics.insert(topic.to_string()) {
                topics.push(topic.to_string());
            }
        }

        if let Some(summary) = chunk.summary_text() {
            chunk_summaries.push(summary.to_string());
        }
    }

    let clusters = merge_clusters(
        chunks.iter().flat_map(|c| c.clusters.iter().cloned()),
        similarity_threshold,
    );

    AggregatedBrandData {
        brand: brand.clone(),
        total_chunks: chunks.len(),
        total_mentions,
        sentiment,
        topics,
        clusters,
        spike_detected,
        chunk_summaries,
    }
}
