//! Redis client wrapper.
//!
//! The connection manager is opened on first use and dropped by
//! [`BrandStore::close`]; the next call reconnects. Blocking pops run on
//! dedicated connections because BLPOP holds the connection server-side and
//! would stall every other brand sharing the multiplexed one. Those are
//! checked out of a small idle pool, returned after a clean reply and
//! dropped on error or by `close`.

use async_trait::async_trait;
use orchestrator_core::{Error, Result, StoreErrorCode};
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::{Client, RedisError};
use std::time::{Duration, Instant};
use telemetry::metrics;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::store::BrandStore;

/// SCAN page size.
const SCAN_COUNT: usize = 100;

/// Idle blocking connections kept by default.
pub const DEFAULT_BLOCKING_POOL: usize = 5;

#[derive(Debug, Clone, Copy)]
enum Access {
    Read,
    Write,
}

/// Redis-backed [`BrandStore`].
pub struct RedisStore {
    client: Client,
    config: StoreConfig,
    manager: RwLock<Option<ConnectionManager>>,
    /// Idle connections for BLPOP
    blocking: Mutex<Vec<MultiplexedConnection>>,
    blocking_pool: usize,
}

impl RedisStore {
    /// Creates a store. No connection is opened until the first command.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            Error::store(
                StoreErrorCode::Connection,
                format!("Invalid Redis URL: {}", e),
            )
        })?;

        info!(
            result_prefix = %config.result_prefix,
            summary_prefix = %config.summary_prefix,
            registry_key = %config.registry_key,
            "Created Redis store"
        );

        Ok(Self {
            client,
            config,
            manager: RwLock::new(None),
            blocking: Mutex::new(Vec::new()),
            blocking_pool: DEFAULT_BLOCKING_POOL,
        })
    }

    /// Keeps up to `size` idle blocking connections, one per brand that can
    /// be in flight at once.
    pub fn with_blocking_pool(mut self, size: usize) -> Self {
        self.blocking_pool = size.max(1);
        self
    }

    pub fn blocking_pool(&self) -> usize {
        self.blocking_pool
    }

    /// Blocking connections currently idle in the pool.
    pub async fn idle_blocking_connections(&self) -> usize {
        self.blocking.lock().await.len()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the shared connection, opening it if needed.
    async fn connection(&self) -> Result<ConnectionManager> {
        {
            let guard = self.manager.read().await;
            if let Some(ref manager) = *guard {
                return Ok(manager.clone());
            }
        }

        let mut guard = self.manager.write().await;
        if let Some(ref manager) = *guard {
            return Ok(manager.clone());
        }

        let manager = self
            .client
            .get_connection_manager()
            .await
            .map_err(|e| store_error("connect", e))?;
        *guard = Some(manager.clone());

        info!("Redis connection established");
        Ok(manager)
    }

    /// Takes an idle blocking connection or opens a new one.
    async fn checkout_blocking(&self) -> Result<MultiplexedConnection> {
        if let Some(conn) = self.blocking.lock().await.pop() {
            return Ok(conn);
        }

        let start = Instant::now();
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| store_error("connect", e))?;
        observe(Access::Read, start);
        debug!("Opened blocking connection");
        Ok(conn)
    }

    async fn checkin_blocking(&self, conn: MultiplexedConnection) {
        let mut idle = self.blocking.lock().await;
        if idle.len() < self.blocking_pool {
            idle.push(conn);
        }
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        redis::cmd("LRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("LRANGE", e))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        redis::cmd("SMEMBERS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("SMEMBERS", e))
    }
}

#[async_trait]
impl BrandStore for RedisStore {
    async fn blocking_pop(&self, key: &str, timeout: Duration) -> Result<Option<String>> {
        let mut conn = self.checkout_blocking().await?;

        // BLPOP treats 0 as "wait forever"
        let timeout_secs = timeout.as_secs().max(1);
        // A failed connection is dropped rather than pooled
        let reply: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(key)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("BLPOP", e))?;

        self.checkin_blocking(conn).await;
        Ok(reply.map(|(_, value)| value))
    }

    async fn pop(&self, key: &str) -> Result<Option<String>> {
        let start = Instant::now();
        let mut conn = self.connection().await?;
        let value: Option<String> = redis::cmd("LPOP")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("LPOP", e))?;
        observe(Access::Read, start);
        Ok(value)
    }

    async fn push(&self, key: &str, value: &str) -> Result<()> {
        let start = Instant::now();
        let mut conn = self.connection().await?;
        let _len: i64 = redis::cmd("RPUSH")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("RPUSH", e))?;
        observe(Access::Write, start);
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let start = Instant::now();
        let mut conn = self.connection().await?;
        let () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("SET", e))?;
        observe(Access::Write, start);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let start = Instant::now();
        let mut conn = self.connection().await?;
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("GET", e))?;
        observe(Access::Read, start);
        Ok(value)
    }

    async fn members(&self, key: &str) -> Result<Vec<String>> {
        let start = Instant::now();
        let mut conn = self.connection().await?;
        let kind: String = redis::cmd("TYPE")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("TYPE", e))?;

        let members = match kind.as_str() {
            "set" => self.set_members(key).await?,
            "list" => self.list_range(key).await?,
            "none" => Vec::new(),
            other => {
                return Err(Error::store(
                    StoreErrorCode::Command,
                    format!("{} is a {}, expected a set or list", key, other),
                ));
            }
        };

        observe(Access::Read, start);
        debug!(key, kind = %kind, count = members.len(), "Read registry members");
        Ok(members)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let start = Instant::now();
        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, page): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(|e| store_error("SCAN", e))?;
            keys.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        observe(Access::Read, start);
        Ok(keys)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("PING", e))?;
        Ok(())
    }

    async fn close(&self) {
        let mut guard = self.manager.write().await;
        if guard.take().is_some() {
            info!("Redis connection closed");
        }

        let mut idle = self.blocking.lock().await;
        if !idle.is_empty() {
            debug!(connections = idle.len(), "Blocking connections closed");
            idle.clear();
        }
    }
}

fn store_error(op: &str, err: RedisError) -> Error {
    metrics().store_errors.inc();
    let code = if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        StoreErrorCode::Connection
    } else {
        StoreErrorCode::Command
    };
    Error::store(code, format!("Redis {} failed: {}", op, err))
}

fn observe(access: Access, start: Instant) {
    let ms = start.elapsed().as_millis() as u64;
    match access {
        Access::Read => metrics().store_read_latency_ms.observe(ms),
        Access::Write => metrics().store_write_latency_ms.observe(ms),
    }
}
