//! Test fixtures and chunk payload builders.

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

/// Builder for a chunk result payload as a producer would push it.
#[derive(Debug, Clone)]
pub struct ChunkBuilder {
    value: Value,
}

impl ChunkBuilder {
    /// A valid chunk for `brand` with a random id and no clusters.
    pub fn new(brand: &str) -> Self {
        Self {
            value: json!({
                "chunkId": Uuid::new_v4().to_string(),
                "brand": brand,
                "processedAt": Utc::now().to_rfc3339(),
                "sentiment": { "positive": 0, "neutral": 0, "negative": 0, "score": 0.0 },
                "clusters": [],
                "topics": [],
            }),
        }
    }

    pub fn chunk_id(mut self, id: &str) -> Self {
        self.value["chunkId"] = json!(id);
        self
    }

    pub fn sentiment(mut self, positive: f64, neutral: f64, negative: f64, score: f64) -> Self {
        self.value["sentiment"] = json!({
            "positive": positive,
            "neutral": neutral,
            "negative": negative,
            "score": score,
        });
        self
    }

    /// Adds a cluster with a centroid.
    pub fn cluster(mut self, id: &str, label: &str, mentions: &[&str], centroid: &[f64]) -> Self {
        self.push_cluster(json!({
            "id": id,
            "label": label,
            "mentions": mentions,
            "centroid": centroid,
        }));
        self
    }

    /// Adds a cluster without a centroid.
    pub fn plain_cluster(mut self, id: &str, label: &str, mentions: &[&str]) -> Self {
        self.push_cluster(json!({ "id": id, "label": label, "mentions": mentions }));
        self
    }

    /// Adds a spiking cluster with a centroid.
    pub fn spiking_cluster(mut self, id: &str, label: &str, mentions: &[&str], centroid: &[f64]) -> Self {
        self.push_cluster(json!({
            "id": id,
            "label": label,
            "mentions": mentions,
            "centroid": centroid,
            "spike": true,
        }));
        self
    }

    pub fn topics(mut self, topics: &[&str]) -> Self {
        self.value["topics"] = json!(topics);
        self
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.value["summary"] = json!(summary);
        self
    }

    pub fn spike(mut self, spike: bool) -> Self {
        self.value["spikeDetected"] = json!(spike);
        self
    }

    pub fn mention_count(mut self, count: u64) -> Self {
        self.value["meta"] = json!({ "mentionCount": count });
        self
    }

    /// Removes a top-level field.
    pub fn without(mut self, field: &str) -> Self {
        if let Some(obj) = self.value.as_object_mut() {
            obj.remove(field);
        }
        self
    }

    /// Replaces a top-level field.
    pub fn with(mut self, field: &str, value: Value) -> Self {
        self.value[field] = value;
        self
    }

    pub fn build(self) -> Value {
        self.value
    }

    pub fn payload(self) -> String {
        self.value.to_string()
    }

    fn push_cluster(&mut self, cluster: Value) {
        if let Some(clusters) = self.value["clusters"].as_array_mut() {
            clusters.push(cluster);
        }
    }
}

/// A valid payload with one clustered mention.
pub fn simple_chunk(brand: &str) -> String {
    ChunkBuilder::new(brand)
        .sentiment(1.0, 0.0, 0.0, 0.8)
        .cluster("c1", "Launch buzz", &["m1"], &[1.0, 0.0])
        .topics(&["launch"])
        .payload()
}

/// `n` valid payloads for `brand`.
pub fn simple_chunks(brand: &str, n: usize) -> Vec<String> {
    (0..n).map(|_| simple_chunk(brand)).collect()
}

/// A payload that is not JSON.
pub fn garbage_payload() -> String {
    "{not json".to_string()
}
