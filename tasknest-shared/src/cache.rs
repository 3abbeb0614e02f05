/// Best-effort key/value cache with TTL
///
/// Redis-backed when a URL is configured, with an in-process map as the
/// fallback backend (useful for development and tests). The cache is never
/// authoritative: every failure (connection loss, serialization problems,
/// an unreachable server) degrades to a miss, and callers must always be
/// able to recompute the value. Entries may be silently stale.
///
/// # Example
///
/// ```
/// use tasknest_shared::cache::{Cache, CacheConfig};
/// use std::time::Duration;
///
/// # async fn example() {
/// // No redis_url → in-memory backend
/// let cache = Cache::connect(CacheConfig::default()).await;
///
/// cache.set("greeting", "hello", Some(Duration::from_secs(60))).await;
/// assert_eq!(cache.get("greeting").await.as_deref(), Some("hello"));
///
/// cache.delete("greeting").await;
/// assert!(cache.get("greeting").await.is_none());
/// # }
/// ```

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis connection URL; None selects the in-memory backend
    pub redis_url: Option<String>,

    /// TTL applied when `set` is called without an explicit one
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            default_ttl: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
enum Backend {
    Redis(ConnectionManager),
    Memory(Arc<RwLock<HashMap<String, MemoryEntry>>>),
}

#[derive(Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

/// Best-effort cache handle
///
/// Cheap to clone; clones share the same backend.
#[derive(Clone)]
pub struct Cache {
    backend: Backend,
    default_ttl: Duration,
}

impl Cache {
    /// Connects the cache
    ///
    /// Infallible by design: if Redis is configured but unreachable, this
    /// logs a warning and falls back to the in-memory backend rather than
    /// refusing to start.
    pub async fn connect(config: CacheConfig) -> Self {
        let backend = match &config.redis_url {
            Some(url) => match Self::connect_redis(url).await {
                Ok(manager) => {
                    info!("Cache connected to Redis");
                    Backend::Redis(manager)
                }
                Err(e) => {
                    warn!(error = %e, "Redis unavailable, using in-memory cache");
                    Backend::Memory(Arc::new(RwLock::new(HashMap::new())))
                }
            },
            None => {
                debug!("No Redis URL configured, using in-memory cache");
                Backend::Memory(Arc::new(RwLock::new(HashMap::new())))
            }
        };

        Self {
            backend,
            default_ttl: config.default_ttl,
        }
    }

    async fn connect_redis(url: &str) -> Result<ConnectionManager, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let mut manager = ConnectionManager::new(client).await?;

        // PING before trusting the connection
        redis::cmd("PING").query_async::<_, String>(&mut manager).await?;

        Ok(manager)
    }

    /// Gets a raw value; any error is a miss
    pub async fn get(&self, key: &str) -> Option<String> {
        match &self.backend {
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                match conn.get::<_, Option<String>>(key).await {
                    Ok(value) => value,
                    Err(e) => {
                        debug!(key, error = %e, "Cache get failed");
                        None
                    }
                }
            }
            Backend::Memory(map) => {
                let map = map.read().await;
                let entry = map.get(key)?;
                match entry.expires_at {
                    Some(expires_at) if Instant::now() >= expires_at => None,
                    _ => Some(entry.value.clone()),
                }
            }
        }
    }

    /// Gets a JSON-encoded value; deserialization failures are misses
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        serde_json::from_str(&raw).ok()
    }

    /// Stores a raw value, best-effort
    ///
    /// `ttl` of None uses the configured default.
    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);

        match &self.backend {
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                let result: Result<(), redis::RedisError> =
                    conn.set_ex(key, value, ttl.as_secs()).await;
                if let Err(e) = result {
                    debug!(key, error = %e, "Cache set failed");
                }
            }
            Backend::Memory(map) => {
                let mut map = map.write().await;
                map.insert(
                    key.to_string(),
                    MemoryEntry {
                        value: value.to_string(),
                        expires_at: Some(Instant::now() + ttl),
                    },
                );
            }
        }
    }

    /// Stores a value as JSON, best-effort
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl).await,
            Err(e) => debug!(key, error = %e, "Cache serialization failed"),
        }
    }

    /// Removes a key, best-effort
    pub async fn delete(&self, key: &str) {
        match &self.backend {
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                let result: Result<(), redis::RedisError> = conn.del(key).await;
                if let Err(e) = result {
                    debug!(key, error = %e, "Cache delete failed");
                }
            }
            Backend::Memory(map) => {
                map.write().await.remove(key);
            }
        }
    }
}
