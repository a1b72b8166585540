//! Redis-backed store.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use redis::aio::MultiplexedConnection;

use crate::store::{Store, StoreError};

const MAX_BLOCK_SECS: u64 = i32::MAX as u64;

/// [`Store`] over a Redis server, shared by every worker process.
pub struct RedisStore {
    client: redis::Client,
    namespace: String,
    /// Shared connection for non-blocking commands; `None` after `disconnect`.
    conn: Mutex<Option<MultiplexedConnection>>,
    /// Separate connection for BLPOP, which parks whatever connection it runs on.
    blocking: Mutex<Option<MultiplexedConnection>>,
}

impl RedisStore {
    /// Open a client and establish the first connection.
    pub async fn connect(url: &str, namespace: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;
        let store = Self {
            client,
            namespace: namespace.into(),
            conn: Mutex::new(None),
            blocking: Mutex::new(None),
        };
        store.connection().await?;
        Ok(store)
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    fn lock(slot: &Mutex<Option<MultiplexedConnection>>) -> MutexGuard<'_, Option<MultiplexedConnection>> {
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The connection cached in `slot`, opening one if the slot is empty.
    async fn cached(&self, slot: &Mutex<Option<MultiplexedConnection>>) -> Result<MultiplexedConnection, StoreError> {
        let cached = Self::lock(slot).clone();
        if let Some(conn) = cached {
            return Ok(conn);
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        *Self::lock(slot) = Some(conn.clone());
        Ok(conn)
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        self.cached(&self.conn).await
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl Store for RedisStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn add_to_set(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let added: i64 = redis::cmd("SADD")
            .arg(self.key(set))
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(added > 0)
    }

    async fn remove_from_set(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let removed: i64 = redis::cmd("SREM")
            .arg(self.key(set))
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection().await?;
        Ok(redis::cmd("SMEMBERS")
            .arg(self.key(set))
            .query_async(&mut conn)
            .await?)
    }

    async fn push_right(&self, list: &str, value: &str) -> Result<i64, StoreError> {
        let mut conn = self.connection().await?;
        Ok(redis::cmd("RPUSH")
            .arg(self.key(list))
            .arg(value)
            .query_async(&mut conn)
            .await?)
    }

    async fn pop_left(&self, list: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        Ok(redis::cmd("LPOP")
            .arg(self.key(list))
            .query_async(&mut conn)
            .await?)
    }

    async fn pop_right(&self, list: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        Ok(redis::cmd("RPOP")
            .arg(self.key(list))
            .query_async(&mut conn)
            .await?)
    }

    async fn length(&self, list: &str) -> Result<usize, StoreError> {
        let mut conn = self.connection().await?;
        Ok(redis::cmd("LLEN")
            .arg(self.key(list))
            .query_async(&mut conn)
            .await?)
    }

    async fn index_at(&self, list: &str, index: i64) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        Ok(redis::cmd("LINDEX")
            .arg(self.key(list))
            .arg(index)
            .query_async(&mut conn)
            .await?)
    }

    async fn range(&self, list: &str, start: i64, end: i64) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection().await?;
        Ok(redis::cmd("LRANGE")
            .arg(self.key(list))
            .arg(start)
            .arg(end)
            .query_async(&mut conn)
            .await?)
    }

    async fn blocking_pop_left(
        &self,
        lists: &[String],
        timeout: Duration,
    ) -> Result<Option<(String, String)>, StoreError> {
        let mut conn = self.cached(&self.blocking).await?;

        // Fractional timeouts need Redis 6. Zero means forever, and so does any
        // wait longer than Redis will accept.
        let seconds = if timeout.as_secs() > MAX_BLOCK_SECS {
            0.0
        } else {
            timeout.as_secs_f64()
        };

        let keys: Vec<String> = lists.iter().map(|list| self.key(list)).collect();
        Ok(redis::cmd("BLPOP")
            .arg(keys)
            .arg(seconds)
            .query_async(&mut conn)
            .await?)
    }

    async fn move_right_to_left(&self, source: &str, dest: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        Ok(redis::cmd("RPOPLPUSH")
            .arg(self.key(source))
            .arg(self.key(dest))
            .query_async(&mut conn)
            .await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(self.key(key))
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        Ok(redis::cmd("GET")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await?)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let removed: i64 = redis::cmd("DEL")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn increment(&self, key: &str, by: i64) -> Result<i64, StoreError> {
        let mut conn = self.connection().await?;
        Ok(redis::cmd("INCRBY")
            .arg(self.key(key))
            .arg(by)
            .query_async(&mut conn)
            .await?)
    }

    fn disconnect(&self) {
        let shared = Self::lock(&self.conn).take().is_some();
        let blocking = Self::lock(&self.blocking).take().is_some();
        if shared || blocking {
            tracing::info!("Dropped Redis connections for {}", self.namespace);
        }
    }
}
