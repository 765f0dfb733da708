// =====================================================================================
// RATE LIMIT STORES - FIXED WINDOW COUNTERS
// =====================================================================================

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::models::{SecurityError, WindowHit};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Record one hit for `key`, opening a new window when the last one expired.
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowHit, SecurityError>;

    /// Take back one hit.
    async fn decrement(&self, key: &str) -> Result<(), SecurityError>;

    async fn ping(&self) -> Result<(), SecurityError>;

    fn backend(&self) -> &'static str;
}

struct WindowEntry {
    count: u64,
    expires_at: Instant,
}

/// Expired windows are swept once the map grows past this many keys.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Default)]
pub struct MemoryStore {
    windows: RwLock<HashMap<String, WindowEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowHit, SecurityError> {
        let mut windows = self.windows.write().await;
        let now = Instant::now();

        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|_, entry| entry.expires_at > now);
        }

        let entry = windows.entry(key.to_string()).or_insert_with(|| WindowEntry {
            count: 0,
            expires_at: now + window,
        });

        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + window;
        }

        entry.count += 1;

        Ok(WindowHit {
            count: entry.count,
            reset_after: entry.expires_at - now,
        })
    }

    async fn decrement(&self, key: &str) -> Result<(), SecurityError> {
        let mut windows = self.windows.write().await;
        if let Some(entry) = windows.get_mut(key) {
            entry.count = entry.count.saturating_sub(1);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), SecurityError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Builds the pool; connections are opened on first use.
    pub fn new(redis_url: &str) -> Result<Self, SecurityError> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| SecurityError::StoreUnavailable(format!("Pool creation error: {}", e)))?;

        info!("Redis rate limit store configured");
        Ok(Self { pool })
    }
}

#[async_trait]
impl RateLimitStore for RedisStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowHit, SecurityError> {
        let mut conn = self.pool.get().await?;
        let window_ms = window.as_millis() as i64;

        let count: u64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        if count == 1 {
            let _: () = redis::cmd("PEXPIRE").arg(key).arg(window_ms).query_async(&mut conn).await?;
        }

        let mut ttl_ms: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
        if ttl_ms < 0 {
            // Key lost its expiry (crash between INCR and PEXPIRE).
            debug!("Restoring expiry on {}", key);
            let _: () = redis::cmd("PEXPIRE").arg(key).arg(window_ms).query_async(&mut conn).await?;
            ttl_ms = window_ms;
        }

        Ok(WindowHit {
            count,
            reset_after: Duration::from_millis(ttl_ms as u64),
        })
    }

    async fn decrement(&self, key: &str) -> Result<(), SecurityError> {
        let mut conn = self.pool.get().await?;
        let remaining: i64 = redis::cmd("DECR").arg(key).query_async(&mut conn).await?;
        if remaining < 0 {
            let _: () = redis::cmd("SET").arg(key).arg(0).arg("KEEPTTL").query_async(&mut conn).await?;
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), SecurityError> {
        let mut conn = self.pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
