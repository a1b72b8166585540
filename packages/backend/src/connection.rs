//! Backend configuration and connection.

use std::time::Duration;

use crate::memory::MemoryStore;
#[cfg(feature = "redis")]
use crate::redis_store::RedisStore;
use crate::store::{Store, StoreError};

/// Default key namespace.
pub const DEFAULT_NAMESPACE: &str = "jobqueue";

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Connection mode: "mem://" or "redis://host:port/db"
    pub endpoint: String,
    /// Key prefix shared by every process using the same queues
    pub namespace: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "mem://".to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl BackendConfig {
    /// Create a config for an in-process store.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Create a config for a Redis server (requires the `redis` feature).
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            endpoint: url.into(),
            ..Default::default()
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Build a config from environment variables.
    ///
    /// - `QUEUE_BACKEND`: `memory` (default) or `redis`
    /// - `REDIS_URL`: server to use with `redis` (default: `redis://127.0.0.1:6379`)
    /// - `QUEUE_NAMESPACE`: key prefix (default: `jobqueue`)
    pub fn from_env() -> Result<Self, StoreError> {
        let namespace = std::env::var("QUEUE_NAMESPACE")
            .ok()
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let cfg = match std::env::var("QUEUE_BACKEND").ok().as_deref() {
            None | Some("memory") | Some("mem") => Self::memory(),
            Some("redis") => Self::redis(
                std::env::var("REDIS_URL")
                    .ok()
                    .filter(|url| !url.is_empty())
                    .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            ),
            Some(other) => {
                return Err(StoreError::InvalidConfig(format!(
                    "unsupported QUEUE_BACKEND={other} (expected memory|redis)"
                )));
            }
        };

        Ok(cfg.with_namespace(namespace))
    }
}

/// A store picked at runtime from a [`BackendConfig`].
#[derive(Debug)]
pub enum AnyStore {
    Memory(MemoryStore),
    #[cfg(feature = "redis")]
    Redis(RedisStore),
}

/// Connect to the backend described by `config`.
pub async fn connect(config: &BackendConfig) -> Result<AnyStore, StoreError> {
    tracing::info!("Connecting to backend: {}", config.endpoint);

    let store = if config.endpoint.starts_with("mem://") {
        AnyStore::Memory(MemoryStore::new(&config.namespace))
    } else if config.endpoint.starts_with("redis://") || config.endpoint.starts_with("rediss://") {
        connect_redis(config).await?
    } else {
        return Err(StoreError::InvalidConfig(format!(
            "unsupported endpoint: {}",
            config.endpoint
        )));
    };

    tracing::info!("Connected to backend, namespace {}", config.namespace);
    Ok(store)
}

#[cfg(feature = "redis")]
async fn connect_redis(config: &BackendConfig) -> Result<AnyStore, StoreError> {
    Ok(AnyStore::Redis(
        RedisStore::connect(&config.endpoint, config.namespace.clone()).await?,
    ))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(config: &BackendConfig) -> Result<AnyStore, StoreError> {
    Err(StoreError::InvalidConfig(format!(
        "{} needs the `redis` feature",
        config.endpoint
    )))
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $body:expr) => {
        match $self {
            AnyStore::Memory($store) => $body,
            #[cfg(feature = "redis")]
            AnyStore::Redis($store) => $body,
        }
    };
}

impl Store for AnyStore {
    fn namespace(&self) -> &str {
        dispatch!(self, s => s.namespace())
    }

    async fn add_to_set(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        dispatch!(self, s => s.add_to_set(set, member).await)
    }

    async fn remove_from_set(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        dispatch!(self, s => s.remove_from_set(set, member).await)
    }

    async fn members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        dispatch!(self, s => s.members(set).await)
    }

    async fn push_right(&self, list: &str, value: &str) -> Result<i64, StoreError> {
        dispatch!(self, s => s.push_right(list, value).await)
    }

    async fn pop_left(&self, list: &str) -> Result<Option<String>, StoreError> {
        dispatch!(self, s => s.pop_left(list).await)
    }

    async fn pop_right(&self, list: &str) -> Result<Option<String>, StoreError> {
        dispatch!(self, s => s.pop_right(list).await)
    }

    async fn length(&self, list: &str) -> Result<usize, StoreError> {
        dispatch!(self, s => s.length(list).await)
    }

    async fn index_at(&self, list: &str, index: i64) -> Result<Option<String>, StoreError> {
        dispatch!(self, s => s.index_at(list, index).await)
    }

    async fn range(&self, list: &str, start: i64, end: i64) -> Result<Vec<String>, StoreError> {
        dispatch!(self, s => s.range(list, start, end).await)
    }

    async fn blocking_pop_left(
        &self,
        lists: &[String],
        timeout: Duration,
    ) -> Result<Option<(String, String)>, StoreError> {
        dispatch!(self, s => s.blocking_pop_left(lists, timeout).await)
    }

    async fn move_right_to_left(&self, source: &str, dest: &str) -> Result<Option<String>, StoreError> {
        dispatch!(self, s => s.move_right_to_left(source, dest).await)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        dispatch!(self, s => s.set(key, value).await)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        dispatch!(self, s => s.get(key).await)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        dispatch!(self, s => s.delete(key).await)
    }

    async fn increment(&self, key: &str, by: i64) -> Result<i64, StoreError> {
        dispatch!(self, s => s.increment(key, by).await)
    }

    fn disconnect(&self) {
        dispatch!(self, s => s.disconnect())
    }
}
