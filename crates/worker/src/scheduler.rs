//! Scheduling loop.
//!
//! Each tick lists the brands, runs one pipeline cycle per brand with at
//! most `concurrency` in flight, and waits for all of them before the next
//! tick, so a brand is never processed twice at once. A failing brand is
//! logged and recorded in health state; its siblings and the next tick are
//! unaffected. Brands that drop out of the listing are forgotten by the
//! health registry.

use orchestrator_core::{BrandSlug, Error, Result};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use telemetry::{health, metrics, ResourceSampler};
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};

use brand_store::{BrandStore, KeyLayout};

use crate::config::PipelineConfig;
use crate::pipeline::{BrandOutcome, BrandPipeline};
use crate::registry::BrandRegistry;

/// Value written to the heartbeat key.
const HEARTBEAT_VALUE: &str = "alive";

/// Counts for one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub brands: usize,
    pub published: usize,
    pub no_data: usize,
    pub failed: usize,
}

/// Periodic driver of the brand pipelines.
pub struct BrandScheduler {
    store: Arc<dyn BrandStore>,
    keys: KeyLayout,
    config: PipelineConfig,
    pipeline: Arc<BrandPipeline>,
    registry: BrandRegistry,
    semaphore: Arc<Semaphore>,
    instance_id: String,
    /// Brands returned by the previous listing
    listed: Mutex<BTreeSet<BrandSlug>>,
}

impl BrandScheduler {
    pub fn new(
        store: Arc<dyn BrandStore>,
        keys: KeyLayout,
        config: PipelineConfig,
        instance_id: impl Into<String>,
    ) -> Self {
        let pipeline = Arc::new(BrandPipeline::from_config(store.clone(), keys.clone(), &config));
        let registry = BrandRegistry::new(
            store.clone(),
            keys.clone(),
            config.retry_policy(),
            config.discover_from_queues,
        );
        let semaphore = Arc::new(Semaphore::new(config.permits()));

        Self {
            store,
            keys,
            config,
            pipeline,
            registry,
            semaphore,
            instance_id: instance_id.into(),
            listed: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Starts the tick loop and the heartbeat loop.
    ///
    /// Both stop once `shutdown` flips to `true` (or its sender is dropped);
    /// a tick already dispatching runs to completion first.
    pub fn start(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let scheduler = self.clone();
        let rx = shutdown.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run(rx).await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_heartbeat(shutdown).await;
        }));

        info!(
            instance_id = %self.instance_id,
            concurrency = self.config.concurrency,
            interval_ms = self.config.interval_ms,
            "Brand scheduler started"
        );
        handles
    }

    /// Runs ticks until shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            match self.run_tick().await {
                Ok(report) => {
                    if report.brands > 0 {
                        debug!(
                            brands = report.brands,
                            published = report.published,
                            no_data = report.no_data,
                            failed = report.failed,
                            "Tick complete"
                        );
                    }
                }
                Err(e) => {
                    metrics().loop_errors.inc();
                    error!(error = %e, backoff_ms = self.config.loop_backoff_ms, "Tick failed");
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.loop_backoff()) => {}
                        _ = shutdown.changed() => break,
                    }
                }
            }
        }

        info!("Brand scheduler stopped");
    }

    /// Lists brands and processes each once.
    ///
    /// Only listing can fail; per-brand failures are counted in the report.
    pub async fn run_tick(&self) -> Result<TickReport> {
        metrics().ticks.inc();

        let brands = match self.registry.list().await {
            Ok(brands) => {
                health().store.set_healthy();
                brands
            }
            Err(e) => {
                if e.is_transient() {
                    health().store.set_unhealthy(e.to_string());
                }
                return Err(e);
            }
        };

        self.forget_unlisted(&brands);

        let mut report = TickReport {
            brands: brands.len(),
            ..Default::default()
        };
        if brands.is_empty() {
            return Ok(report);
        }

        let mut tasks = JoinSet::new();
        for brand in brands {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::internal("brand semaphore closed"))?;
            let pipeline = self.pipeline.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let outcome = run_brand(pipeline, &brand).await;
                record_outcome(&brand, &outcome);
                outcome
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(BrandOutcome::Published { .. })) => report.published += 1,
                Ok(Ok(BrandOutcome::NoData { .. })) => report.no_data += 1,
                Ok(Err(_)) => report.failed += 1,
                Err(e) => {
                    error!(error = %e, "Brand task aborted");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Drops health entries for brands this scheduler listed before but
    /// not in `brands`.
    fn forget_unlisted(&self, brands: &[BrandSlug]) {
        let current: BTreeSet<BrandSlug> = brands.iter().cloned().collect();
        let mut listed = self.listed.lock();
        for gone in listed.difference(&current) {
            debug!(brand = %gone, "Brand no longer listed");
            health().brands.remove(gone.as_str());
        }
        *listed = current;
    }

    /// Refreshes the heartbeat key and samples process resources.
    pub async fn run_heartbeat(&self, mut shutdown: watch::Receiver<bool>) {
        let key = self.keys.heartbeat_key(&self.instance_id);
        let ttl = self.config.heartbeat_ttl();
        let mut sampler = ResourceSampler::new();
        let mut ticker = interval(self.config.heartbeat_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    info!("Heartbeat loop stopping");
                    break;
                }
            }

            sampler.sample();
            if let Err(e) = self.store.set_with_ttl(&key, HEARTBEAT_VALUE, ttl).await {
                warn!(error = %e, "Heartbeat failed");
            }
        }
    }
}

/// Runs one brand cycle on its own task so a panic is reported against
/// the brand instead of tearing down the tick.
async fn run_brand(pipeline: Arc<BrandPipeline>, brand: &BrandSlug) -> Result<BrandOutcome> {
    health().brands.mark_active(brand.as_str());
    metrics().active_brands.inc();
    let started = Instant::now();

    let slug = brand.clone();
    let span = info_span!("brand", brand = %slug);
    let handle = tokio::spawn(async move { pipeline.process(&slug).await }.instrument(span));
    let outcome = match handle.await {
        Ok(outcome) => outcome,
        Err(e) => Err(Error::internal(format!("brand task failed: {}", e))),
    };

    metrics().active_brands.dec();
    metrics()
        .brand_processing_ms
        .observe(started.elapsed().as_millis() as u64);
    outcome
}

fn record_outcome(brand: &BrandSlug, outcome: &Result<BrandOutcome>) {
    match outcome {
        Ok(BrandOutcome::Published { generated_at, .. }) => {
            metrics().brands_processed.inc();
            health().brands.mark_succeeded(brand.as_str(), *generated_at);
        }
        Ok(BrandOutcome::NoData { .. }) => {
            metrics().brands_skipped.inc();
            health().brands.mark_no_data(brand.as_str());
        }
        Err(e) => {
            metrics().brands_failed.inc();
            error!(brand = %brand, error = %e, "Brand cycle abandoned");
            health().brands.mark_failed(brand.as_str(), e.to_string());
        }
    }
}

