//! Scheduling and pipeline settings.
//!
//! Every value is range checked. Anything missing, unparsable or out of
//! range falls back to its default with a warning; a bad setting never
//! stops the orchestrator from starting.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use orchestrator_core::DEFAULT_SIMILARITY_THRESHOLD;

use crate::retry::RetryPolicy;

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_QUEUE_WAIT_SECS: u64 = 5;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF_BASE: f64 = 0.5;
pub const DEFAULT_SUMMARY_TTL_SECS: u64 = 3_600;
pub const DEFAULT_LOOP_BACKOFF_MS: u64 = 1_000;
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 10;

/// Orchestrator pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Brands processed at once
    pub concurrency: usize,
    /// Time between scheduling ticks
    pub interval_ms: u64,
    /// Blocking wait on an empty queue
    pub queue_wait_secs: u64,
    /// Minimum centroid similarity for a merge
    pub similarity_threshold: f64,
    /// Retries after the first failed store call
    pub max_retries: u32,
    /// First retry delay in seconds, doubled per attempt
    pub retry_backoff_base: f64,
    /// Summary expiry
    pub summary_ttl_secs: u64,
    /// Pause after a failed tick
    pub loop_backoff_ms: u64,
    /// Heartbeat and resource sampling period
    pub heartbeat_interval_secs: u64,
    /// Fall back to scanning result queues when the registry is empty
    pub discover_from_queues: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            interval_ms: DEFAULT_INTERVAL_MS,
            queue_wait_secs: DEFAULT_QUEUE_WAIT_SECS,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_base: DEFAULT_RETRY_BACKOFF_BASE,
            summary_ttl_secs: DEFAULT_SUMMARY_TTL_SECS,
            loop_backoff_ms: DEFAULT_LOOP_BACKOFF_MS,
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
            discover_from_queues: true,
        }
    }
}

/// Upper bound on brands processed at once.
pub const MAX_CONCURRENCY: usize = 1_024;

fn valid_concurrency(v: usize) -> bool {
    (1..=MAX_CONCURRENCY).contains(&v)
}

fn valid_interval_ms(v: u64) -> bool {
    (100..=86_400_000).contains(&v)
}

fn valid_queue_wait(v: u64) -> bool {
    (1..=3_600).contains(&v)
}

fn valid_threshold(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}

fn valid_max_retries(v: u32) -> bool {
    (1..=10).contains(&v)
}

fn valid_backoff_base(v: f64) -> bool {
    (0.1..=60.0).contains(&v)
}

fn valid_summary_ttl(v: u64) -> bool {
    (60..=2_592_000).contains(&v)
}

fn valid_loop_backoff(v: u64) -> bool {
    (100..=3_600_000).contains(&v)
}

fn valid_heartbeat(v: u64) -> bool {
    (1..=3_600).contains(&v)
}

impl PipelineConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Applies raw values from a settings table (e.g. the `[pipeline]`
    /// section of a config file) keyed by field name.
    ///
    /// Values are parsed and range checked the same way as environment
    /// overrides, so a malformed entry only costs that one setting.
    pub fn apply_settings<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.apply_overrides("setting", |field, _| lookup(field));
    }

    /// Applies `ORCHESTRATOR_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.apply_overrides("environment", |_, env| lookup(env));
    }

    fn apply_overrides<F>(&mut self, source: &str, lookup: F)
    where
        F: Fn(&str, &str) -> Option<String>,
    {
        let d = Self::default();
        let o = Override { source, lookup: &lookup };
        o.apply(("concurrency", "ORCHESTRATOR_CONCURRENCY"), &mut self.concurrency, d.concurrency, valid_concurrency);
        o.apply(("interval_ms", "ORCHESTRATOR_INTERVAL_MS"), &mut self.interval_ms, d.interval_ms, valid_interval_ms);
        o.apply(
            ("queue_wait_secs", "ORCHESTRATOR_QUEUE_WAIT_SEC"),
            &mut self.queue_wait_secs,
            d.queue_wait_secs,
            valid_queue_wait,
        );
        o.apply(
            ("similarity_threshold", "ORCHESTRATOR_SIMILARITY_THRESHOLD"),
            &mut self.similarity_threshold,
            d.similarity_threshold,
            valid_threshold,
        );
        o.apply(("max_retries", "ORCHESTRATOR_MAX_RETRIES"), &mut self.max_retries, d.max_retries, valid_max_retries);
        o.apply(
            ("retry_backoff_base", "ORCHESTRATOR_RETRY_BACKOFF_BASE"),
            &mut self.retry_backoff_base,
            d.retry_backoff_base,
            valid_backoff_base,
        );
        o.apply(
            ("summary_ttl_secs", "ORCHESTRATOR_SUMMARY_TTL_SEC"),
            &mut self.summary_ttl_secs,
            d.summary_ttl_secs,
            valid_summary_ttl,
        );
        o.apply(
            ("loop_backoff_ms", "ORCHESTRATOR_LOOP_BACKOFF_MS"),
            &mut self.loop_backoff_ms,
            d.loop_backoff_ms,
            valid_loop_backoff,
        );
        o.apply(
            ("heartbeat_interval_secs", "ORCHESTRATOR_HEARTBEAT_INTERVAL_SEC"),
            &mut self.heartbeat_interval_secs,
            d.heartbeat_interval_secs,
            valid_heartbeat,
        );
        o.apply(
            ("discover_from_queues", "ORCHESTRATOR_DISCOVER_FROM_QUEUES"),
            &mut self.discover_from_queues,
            d.discover_from_queues,
            |_| true,
        );
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn queue_wait(&self) -> Duration {
        Duration::from_secs(self.queue_wait_secs)
    }

    pub fn summary_ttl(&self) -> Duration {
        Duration::from_secs(self.summary_ttl_secs)
    }

    pub fn loop_backoff(&self) -> Duration {
        Duration::from_millis(self.loop_backoff_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Heartbeat expiry: twice the interval, and at least five seconds
    /// longer than it.
    pub fn heartbeat_ttl(&self) -> Duration {
        let interval = self.heartbeat_interval();
        interval
            .saturating_mul(2)
            .max(interval.saturating_add(Duration::from_secs(5)))
    }

    /// Concurrency clamped to `1..=MAX_CONCURRENCY`.
    pub fn permits(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let base_delay = Duration::try_from_secs_f64(self.retry_backoff_base)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_RETRY_BACKOFF_BASE));
        RetryPolicy::new(self.max_retries, base_delay)
    }
}

/// Where override values come from and how they are looked up.
struct Override<'a, F> {
    source: &'a str,
    lookup: &'a F,
}

impl<F> Override<'_, F>
where
    F: Fn(&str, &str) -> Option<String>,
{
    /// Parses the value for `(field, env)` into `slot`. Unparsable or out of
    /// range values reset the slot to `default`.
    fn apply<T>(&self, (field, env): (&str, &str), slot: &mut T, default: T, valid: impl Fn(T) -> bool)
    where
        T: Copy + Display + FromStr,
    {
        let Some(raw) = (self.lookup)(field, env) else {
            return;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return;
        }

        match raw.parse::<T>() {
            Ok(value) if valid(value) => *slot = value,
            Ok(_) => {
                warn!(source = self.source, setting = field, env, value = raw, default = %default, "Value out of range, using default");
                *slot = default;
            }
            Err(_) => {
                warn!(source = self.source, setting = field, env, value = raw, default = %default, "Invalid value, using default");
                *slot = default;
            }
        }
    }
}
