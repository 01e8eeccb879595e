//! Brand Summary Orchestrator
//!
//! Periodically drains per-brand chunk result queues and publishes a
//! brand-level summary for each:
//! - Block-then-drain reads with invalid payloads quarantined
//! - Similarity-based cluster merging and sentiment aggregation
//! - Summary writes with TTL and exponential-backoff retries
//! - Health, metrics and summary lookup over HTTP

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use api::{router, AppState};
use brand_store::{BrandStore, RedisStore, StoreConfig};
use telemetry::init_tracing_from_env;
use worker::{BrandScheduler, PipelineConfig};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Identifies this instance's heartbeat key
    #[serde(default)]
    instance_id: Option<String>,

    #[serde(default)]
    store: StoreConfig,

    /// Read entry by entry, see [`pipeline_settings`]
    #[serde(skip)]
    pipeline: PipelineConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            instance_id: None,
            store: StoreConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    fn instance_id(&self) -> String {
        self.instance_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| format!("orchestrator-{}", uuid::Uuid::new_v4()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env().context("Failed to initialize tracing")?;

    info!("Starting Brand Orchestrator v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let instance_id = config.instance_id();

    info!(
        instance_id = %instance_id,
        concurrency = config.pipeline.concurrency,
        interval_ms = config.pipeline.interval_ms,
        queue_wait_secs = config.pipeline.queue_wait_secs,
        similarity_threshold = config.pipeline.similarity_threshold,
        summary_ttl_secs = config.pipeline.summary_ttl_secs,
        "Loaded pipeline config"
    );

    let redis = Arc::new(
        RedisStore::new(config.store.clone())
            .context("Failed to create Redis store")?
            .with_blocking_pool(config.pipeline.permits()),
    );
    let store: Arc<dyn BrandStore> = redis.clone();
    let keys = config.store.keys();

    // Not fatal: the scheduler keeps retrying and health reports the outage
    if brand_store::health::check_connection(store.as_ref()).await {
        info!("Store connection: healthy");
    } else {
        error!("Store connection: unhealthy");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Arc::new(BrandScheduler::new(
        store.clone(),
        keys.clone(),
        config.pipeline.clone(),
        instance_id,
    ));
    let worker_handles = scheduler.start(shutdown_rx);

    let app = router(AppState::new(store.clone(), keys));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down, waiting for in-flight brands...");

    let _ = shutdown_tx.send(true);
    for handle in worker_handles {
        if let Err(e) = handle.await {
            error!("Worker task failed: {}", e);
        }
    }

    redis.close().await;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let settings = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(environment())
        .build()
        .context("Failed to build configuration")?;

    let mut config = from_settings(&settings)?;
    config
        .pipeline
        .apply_env(|key| std::env::var(key).ok());

    // Flat overrides shared with the result producers
    if let Ok(url) = std::env::var("REDIS_URL") {
        config.store.url = url;
    }
    if let Ok(prefix) = std::env::var("REDIS_RESULT_PREFIX") {
        config.store.result_prefix = prefix;
    }
    if let Ok(prefix) = std::env::var("REDIS_FAILED_PREFIX") {
        config.store.failed_prefix = prefix;
    }
    if let Ok(prefix) = std::env::var("REDIS_SUMMARY_PREFIX") {
        config.store.summary_prefix = prefix;
    }
    if let Ok(key) = std::env::var("REDIS_BRAND_REGISTRY_KEY") {
        config.store.registry_key = key;
    }

    if let Ok(host) = std::env::var("HOST") {
        config.host = host;
    }
    if let Ok(port) = std::env::var("PORT") {
        match port.trim().parse() {
            Ok(port) => config.port = port,
            Err(_) => warn!(value = %port, default = config.port, "Invalid PORT, using default"),
        }
    }
    if let Ok(id) = std::env::var("ORCHESTRATOR_ID") {
        config.instance_id = Some(id);
    }

    Ok(config)
}

fn environment() -> config::Environment {
    config::Environment::default()
        .separator("__")
        .prefix("ORCHESTRATOR")
        .try_parsing(true)
}

/// Deserializes the layered settings. The `[pipeline]` table is applied
/// entry by entry so a bad value falls back to its default instead of
/// failing the whole load.
fn from_settings(settings: &config::Config) -> Result<Config> {
    let mut config: Config = settings
        .clone()
        .try_deserialize()
        .context("Failed to deserialize configuration")?;
    config.pipeline = pipeline_settings(settings);
    Ok(config)
}

fn pipeline_settings(settings: &config::Config) -> PipelineConfig {
    let table = match settings.get_table("pipeline") {
        Ok(table) => table,
        Err(config::ConfigError::NotFound(_)) => Default::default(),
        Err(e) => {
            warn!(error = %e, "Unreadable [pipeline] section, using defaults");
            Default::default()
        }
    };

    let mut values = HashMap::new();
    for (key, value) in table {
        match value.into_string() {
            Ok(raw) => {
                values.insert(key, raw);
            }
            Err(e) => warn!(setting = %key, error = %e, "Unreadable pipeline setting, using default"),
        }
    }

    let mut pipeline = PipelineConfig::default();
    pipeline.apply_settings(|field| values.get(field).cloned());
    pipeline
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
