//! Similarity-based cluster merging.
//!
//! Clusters are visited in input order (chunk order, then cluster order).
//! Each centroid-bearing cluster is folded into the **first** already
//! accepted cluster whose centroid is at least `threshold` similar; earlier
//! clusters win ties. Accepted centroids are never recomputed, so a cluster
//! that absorbs many others keeps comparing with its original centroid.

use std::collections::HashSet;

use crate::chunk::MentionCluster;

/// Default similarity threshold for merging.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.75;

/// Cosine similarity clamped to `[0, 1]`.
///
/// Returns 0 for vectors of different length, empty vectors and zero-norm
/// vectors.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return 0.0;
    }

    // sqrt of the product keeps identical vectors at exactly 1.0
    (dot / (norm_a * norm_b).sqrt()).clamp(0.0, 1.0)
}

/// Merges clusters whose centroids are similar.
///
/// Clusters without a centroid pass through as their own entry, with
/// repeated mention ids dropped.
/// A match unions the mention ids, averages the two sentiment scores
/// (missing counts as 0) and ORs the spike flags.
pub fn merge_clusters<I>(clusters: I, threshold: f64) -> Vec<MentionCluster>
where
    I: IntoIterator<Item = MentionCluster>,
{
    let threshold = threshold.clamp(0.0, 1.0);
    let mut merged: Vec<MentionCluster> = Vec::new();
    // Mention sets parallel to `merged`, only for centroid-bearing entries.
    let mut seen: Vec<Option<HashSet<String>>> = Vec::new();

    for cluster in clusters {
        let candidate = cluster.merge_centroid().map(|centroid| {
            merged.iter().position(|existing| {
                existing
                    .merge_centroid()
                    .is_some_and(|c| cosine_similarity(c, centroid) >= threshold)
            })
        });

        let Some(target) = candidate else {
            let mut set = HashSet::with_capacity(cluster.mentions.len());
            let mut passed = cluster;
            passed.mentions.retain(|m| set.insert(m.clone()));
            merged.push(passed);
            seen.push(None);
            continue;
        };

        match target {
            Some(idx) => {
                let set = seen[idx].get_or_insert_with(HashSet::new);
                absorb(&mut merged[idx], set, cluster);
            }
            None => {
                let mut set = HashSet::with_capacity(cluster.mentions.len());
                let mut accepted = cluster;
                accepted.mentions.retain(|m| set.insert(m.clone()));
                merged.push(accepted);
                seen.push(Some(set));
            }
        }
    }

    merged
}

fn absorb(target: &mut MentionCluster, seen: &mut HashSet<String>, other: MentionCluster) {
    for mention in other.mentions {
        if seen.insert(mention.clone()) {
            target.mentions.push(mention);
        }
    }

    let a = target.sentiment_score.unwrap_or(0.0);
    let b = other.sentiment_score.unwrap_or(0.0);
    target.sentiment_score = Some((a + b) / 2.0);
    target.spike |= other.spike;
}
