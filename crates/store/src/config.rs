//! Store configuration and key layout.

use orchestrator_core::BrandSlug;
use serde::{Deserialize, Serialize};

/// Redis store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Redis connection URL
    #[serde(default = "default_url")]
    pub url: String,
    /// Prefix of per-brand result queues (`{prefix}:{brand}:chunks`)
    #[serde(default = "default_result_prefix")]
    pub result_prefix: String,
    /// Prefix of per-brand failed collections (`{prefix}:{brand}`)
    #[serde(default = "default_failed_prefix")]
    pub failed_prefix: String,
    /// Prefix of per-brand summaries (`{prefix}:{brand}`)
    #[serde(default = "default_summary_prefix")]
    pub summary_prefix: String,
    /// Set or list of brand slugs to process
    #[serde(default = "default_registry_key")]
    pub registry_key: String,
    /// Prefix of orchestrator heartbeat keys
    #[serde(default = "default_heartbeat_prefix")]
    pub heartbeat_prefix: String,
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_result_prefix() -> String {
    "result:brand".to_string()
}

fn default_failed_prefix() -> String {
    "failed:brand".to_string()
}

fn default_summary_prefix() -> String {
    "summary:brand".to_string()
}

fn default_registry_key() -> String {
    "brands:registry".to_string()
}

fn default_heartbeat_prefix() -> String {
    "orchestrator:heartbeat".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            result_prefix: default_result_prefix(),
            failed_prefix: default_failed_prefix(),
            summary_prefix: default_summary_prefix(),
            registry_key: default_registry_key(),
            heartbeat_prefix: default_heartbeat_prefix(),
        }
    }
}

impl StoreConfig {
    /// Key layout derived from this configuration.
    pub fn keys(&self) -> KeyLayout {
        KeyLayout {
            result_prefix: self.result_prefix.clone(),
            failed_prefix: self.failed_prefix.clone(),
            summary_prefix: self.summary_prefix.clone(),
            registry_key: self.registry_key.clone(),
            heartbeat_prefix: self.heartbeat_prefix.clone(),
        }
    }
}

/// Builds every key the orchestrator touches. All per-brand keys take a
/// [`BrandSlug`], never a raw brand string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    result_prefix: String,
    failed_prefix: String,
    summary_prefix: String,
    registry_key: String,
    heartbeat_prefix: String,
}

impl Default for KeyLayout {
    fn default() -> Self {
        StoreConfig::default().keys()
    }
}

impl KeyLayout {
    pub fn queue_key(&self, brand: &BrandSlug) -> String {
        format!("{}:{}:chunks", self.result_prefix, brand)
    }

    pub fn failed_key(&self, brand: &BrandSlug) -> String {
        format!("{}:{}", self.failed_prefix, brand)
    }

    pub fn summary_key(&self, brand: &BrandSlug) -> String {
        format!("{}:{}", self.summary_prefix, brand)
    }

    pub fn registry_key(&self) -> &str {
        &self.registry_key
    }

    pub fn heartbeat_key(&self, instance_id: &str) -> String {
        format!("{}:{}", self.heartbeat_prefix, instance_id)
    }

    /// SCAN pattern matching every brand result queue.
    pub fn queue_pattern(&self) -> String {
        format!("{}:*:chunks", self.result_prefix)
    }

    /// Extracts the brand segment from a result queue key.
    pub fn brand_from_queue_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.result_prefix.as_str())?
            .strip_prefix(':')?
            .strip_suffix(":chunks")
            .filter(|brand| !brand.is_empty() && !brand.contains(':'))
    }
}
