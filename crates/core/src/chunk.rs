//! Chunk result types produced by upstream workers.
//!
//! Wire format is camelCase JSON, one chunk result per queue entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::ops::{Add, AddAssign};
use validator::Validate;

/// Sentiment tuple for a chunk (or a sum of chunks).
///
/// `positive`, `neutral` and `negative` are counts; `score` is a signed
/// weighted signal and is summed, never averaged, across chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    #[serde(default)]
    pub positive: f64,
    #[serde(default)]
    pub neutral: f64,
    #[serde(default)]
    pub negative: f64,
    pub score: f64,
}

impl Sentiment {
    pub fn new(positive: f64, neutral: f64, negative: f64, score: f64) -> Self {
        Self {
            positive,
            neutral,
            negative,
            score,
        }
    }
}

impl Add for Sentiment {
    type Output = Sentiment;

    fn add(mut self, rhs: Sentiment) -> Sentiment {
        self += rhs;
        self
    }
}

impl AddAssign for Sentiment {
    fn add_assign(&mut self, rhs: Sentiment) {
        self.positive += rhs.positive;
        self.neutral += rhs.neutral;
        self.negative += rhs.negative;
        self.score += rhs.score;
    }
}

/// A named group of related mentions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionCluster {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub label: String,
    /// Mention identifiers.
    #[serde(default)]
    pub mentions: Vec<String>,
    /// Embedding centroid. `None` (or empty on the wire) means the cluster
    /// is never a merge candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centroid: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub spike: bool,
}

impl MentionCluster {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            mentions: Vec::new(),
            centroid: None,
            sentiment_score: None,
            spike: false,
        }
    }

    pub fn with_mentions<I, S>(mut self, mentions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mentions = mentions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_centroid(mut self, centroid: Vec<f64>) -> Self {
        self.centroid = Some(centroid);
        self
    }

    pub fn with_sentiment_score(mut self, score: f64) -> Self {
        self.sentiment_score = Some(score);
        self
    }

    pub fn with_spike(mut self, spike: bool) -> Self {
        self.spike = spike;
        self
    }

    /// Centroid usable for similarity comparison.
    pub fn merge_centroid(&self) -> Option<&[f64]> {
        self.centroid.as_deref().filter(|c| !c.is_empty())
    }

    /// Label for display, falling back to the id.
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

/// One unit of pre-processed mention analysis for a brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResult {
    #[validate(length(min = 1, max = 256))]
    pub chunk_id: String,
    #[validate(length(min = 1, max = 256))]
    pub brand: String,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    pub sentiment: Sentiment,
    pub clusters: Vec<MentionCluster>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spike_detected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ChunkResult {
    /// Mentions this chunk contributes to the brand total.
    ///
    /// A numeric `meta.mentionCount` wins; otherwise the chunk's own
    /// (pre-merge) cluster mention lists are counted.
    pub fn mention_count(&self) -> u64 {
        self.meta_mention_count().unwrap_or_else(|| {
            self.clusters
                .iter()
                .map(|c| c.mentions.len() as u64)
                .sum()
        })
    }

    fn meta_mention_count(&self) -> Option<u64> {
        let value = self.meta.as_ref()?.get("mentionCount")?;
        if let Some(n) = value.as_u64() {
            return Some(n);
        }
        value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n.floor() as u64)
    }

    /// Non-blank summary text, if any.
    pub fn summary_text(&self) -> Option<&str> {
        self.summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Workers have emitted cluster ids both as strings and as integers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    })
}
