//! Ephemeral key/value cache with TTL and atomic counters.
//!
//! Redis is the primary store; every operation degrades to an in-process
//! TTL map when Redis is unreachable. Cache failures never surface to
//! callers — unavailability is only visible via `health_check`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use redis::AsyncCommands;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Latency above this is "degraded"; a fallback-only cache is "unhealthy".
const DEGRADED_LATENCY_MS: u128 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub status: CacheStatus,
    pub latency_ms: u64,
    pub fallback_active: bool,
}

#[derive(Debug, Clone)]
struct FallbackEntry {
    value: String,
    expires_at: Instant,
}

/// In-process stand-in with the same TTL and counter semantics as Redis.
/// Expiry is lazy: entries are dropped on access once past `expires_at`.
#[derive(Default)]
struct FallbackStore {
    entries: HashMap<String, FallbackEntry>,
}

impl FallbackStore {
    fn live(&mut self, key: &str) -> Option<&FallbackEntry> {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|e| e.expires_at <= Instant::now());
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key)
    }

    fn set(&mut self, key: &str, value: String, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            FallbackEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// First increment sets 1 and arms the TTL; later increments within the
    /// TTL bump the count without resetting expiry.
    fn increment(&mut self, key: &str, ttl: Duration) -> i64 {
        match self.live(key).map(|e| e.value.clone()) {
            Some(raw) => {
                let next = raw.parse::<i64>().unwrap_or(0) + 1;
                // Preserve the original expiry.
                if let Some(entry) = self.entries.get_mut(key) {
                    entry.value = next.to_string();
                }
                next
            }
            None => {
                self.set(key, "1".to_string(), ttl);
                1
            }
        }
    }
}

#[derive(Clone)]
pub struct CacheService {
    client: Option<redis::Client>,
    fallback: Arc<Mutex<FallbackStore>>,
}

impl CacheService {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client: Some(client),
            fallback: Arc::new(Mutex::new(FallbackStore::default())),
        }
    }

    /// Fallback-only cache, used in tests and when Redis is not configured.
    pub fn in_memory() -> Self {
        Self {
            client: None,
            fallback: Arc::new(Mutex::new(FallbackStore::default())),
        }
    }

    async fn conn(&self) -> Option<redis::aio::MultiplexedConnection> {
        let client = self.client.as_ref()?;
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!("Redis unavailable, using in-memory fallback: {e}");
                None
            }
        }
    }

    /// True only when Redis itself answers — fallback availability does not
    /// count as connected.
    pub async fn is_connected(&self) -> bool {
        match self.conn().await {
            Some(mut conn) => redis::cmd("PING")
                .query_async::<_, String>(&mut conn)
                .await
                .is_ok(),
            None => false,
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        if let Some(mut conn) = self.conn().await {
            let res: redis::RedisResult<()> =
                conn.set_ex(key, value, ttl.as_secs()).await;
            if res.is_ok() {
                return;
            }
            warn!("Redis SET failed for '{key}', falling back");
        }
        self.fallback.lock().await.set(key, value.to_string(), ttl);
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(mut conn) = self.conn().await {
            match conn.get::<_, Option<String>>(key).await {
                Ok(v) => return v,
                Err(e) => warn!("Redis GET failed for '{key}': {e}"),
            }
        }
        self.fallback
            .lock()
            .await
            .live(key)
            .map(|e| e.value.clone())
    }

    pub async fn delete(&self, key: &str) {
        if let Some(mut conn) = self.conn().await {
            let res: redis::RedisResult<()> = conn.del(key).await;
            if res.is_ok() {
                return;
            }
        }
        self.fallback.lock().await.entries.remove(key);
    }

    pub async fn exists(&self, key: &str) -> bool {
        if let Some(mut conn) = self.conn().await {
            if let Ok(found) = conn.exists::<_, bool>(key).await {
                return found;
            }
        }
        self.fallback.lock().await.live(key).is_some()
    }

    /// Atomic increment. Returns the post-increment count. The TTL is armed
    /// on the first write only.
    pub async fn increment(&self, key: &str, ttl: Duration) -> i64 {
        if let Some(mut conn) = self.conn().await {
            let incr: redis::RedisResult<i64> = conn.incr(key, 1).await;
            if let Ok(count) = incr {
                if count == 1 {
                    let _: redis::RedisResult<()> =
                        conn.expire(key, ttl.as_secs() as i64).await;
                }
                return count;
            }
            warn!("Redis INCR failed for '{key}', falling back");
        }
        self.fallback.lock().await.increment(key, ttl)
    }

    /// Round-trips the primary store and classifies the result.
    pub async fn health_check(&self) -> CacheHealth {
        let started = std::time::Instant::now();
        let connected = self.is_connected().await;
        let latency_ms = started.elapsed().as_millis();

        let (status, fallback_active) = if !connected {
            (CacheStatus::Unhealthy, true)
        } else if latency_ms > DEGRADED_LATENCY_MS {
            (CacheStatus::Degraded, false)
        } else {
            (CacheStatus::Healthy, false)
        };

        debug!("Cache health: {:?} ({}ms)", status, latency_ms);
        CacheHealth {
            status,
            latency_ms: latency_ms as u64,
            fallback_active,
        }
    }
}
