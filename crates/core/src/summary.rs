//! Brand summary synthesis.
//!
//! The summary is the only artifact downstream readers see. It is derived
//! deterministically from an [`AggregatedBrandData`] plus a timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregatedBrandData;
use crate::brand::BrandSlug;
use crate::chunk::{MentionCluster, Sentiment};

/// Topics exposed on a summary.
pub const DOMINANT_TOPIC_LIMIT: usize = 5;

/// Clusters exposed on a summary.
pub const TOP_CLUSTER_LIMIT: usize = 5;

/// Chunk summaries quoted in the narrative.
pub const HIGHLIGHT_LIMIT: usize = 3;

/// Cluster projection shown on a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub id: String,
    pub label: String,
    /// Number of mentions (not the ids).
    pub mentions: usize,
    pub spike: bool,
}

impl From<&MentionCluster> for ClusterSummary {
    fn from(cluster: &MentionCluster) -> Self {
        Self {
            id: cluster.id.clone(),
            label: cluster.label.clone(),
            mentions: cluster.mentions.len(),
            spike: cluster.spike,
        }
    }
}

/// Persisted brand-level summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandSummary {
    pub brand: BrandSlug,
    pub generated_at: DateTime<Utc>,
    pub total_chunks: usize,
    pub total_mentions: u64,
    pub sentiment: Sentiment,
    pub dominant_topics: Vec<String>,
    pub clusters: Vec<ClusterSummary>,
    pub spike_detected: bool,
    pub summary: String,
    pub chunk_summaries: Vec<String>,
}

impl BrandSummary {
    /// Builds the summary for one aggregate.
    pub fn from_aggregate(aggregate: &AggregatedBrandData, generated_at: DateTime<Utc>) -> Self {
        let dominant_topics: Vec<String> = aggregate
            .topics
            .iter()
            .take(DOMINANT_TOPIC_LIMIT)
            .cloned()
            .collect();

        let clusters = top_clusters(&aggregate.clusters);
        let summary = narrative(aggregate, &dominant_topics, &clusters);

        Self {
            brand: aggregate.brand.clone(),
            generated_at,
            total_chunks: aggregate.total_chunks,
            total_mentions: aggregate.total_mentions,
            sentiment: aggregate.sentiment,
            dominant_topics,
            clusters,
            spike_detected: aggregate.spike_detected,
            summary,
            chunk_summaries: aggregate.chunk_summaries.clone(),
        }
    }
}

/// Largest clusters by mention count, descending. Ties keep merge order.
pub fn top_clusters(clusters: &[MentionCluster]) -> Vec<ClusterSummary> {
    let mut ranked: Vec<&MentionCluster> = clusters.iter().collect();
    ranked.sort_by(|a, b| b.mentions.len().cmp(&a.mentions.len()));
    ranked
        .into_iter()
        .take(TOP_CLUSTER_LIMIT)
        .map(ClusterSummary::from)
        .collect()
}

fn narrative(
    aggregate: &AggregatedBrandData,
    dominant_topics: &[String],
    top: &[ClusterSummary],
) -> String {
    let mut lines = Vec::new();

    if top.is_empty() {
        lines.push(format!("No clustered mentions for {}.", aggregate.brand));
    } else {
        let mentions: usize = top.iter().map(|c| c.mentions).sum();
        lines.push(format!(
            "{} {} across the top {} {} for {}.",
            mentions,
            plural(mentions, "mention", "mentions"),
            top.len(),
            plural(top.len(), "cluster", "clusters"),
            aggregate.brand
        ));
    }

    if !dominant_topics.is_empty() {
        lines.push(format!("Dominant topics: {}.", dominant_topics.join(", ")));
    }

    let spiking: Vec<&str> = aggregate
        .clusters
        .iter()
        .filter(|c| c.spike)
        .map(MentionCluster::display_label)
        .collect();
    if !spiking.is_empty() {
        lines.push(format!("Spike detected in: {}.", spiking.join(", ")));
    } else if aggregate.spike_detected {
        lines.push("Spike detected in overall mention activity.".to_string());
    }

    let highlights: Vec<String> = aggregate
        .chunk_summaries
        .iter()
        .take(HIGHLIGHT_LIMIT)
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect();
    if !highlights.is_empty() {
        lines.push("Highlights:".to_string());
        lines.extend(highlights);
    }

    lines.join("\n")
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}
