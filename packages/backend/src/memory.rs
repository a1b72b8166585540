//! Process-local backend for tests and single-process embedding.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::store::{Store, StoreError, resolve_index, resolve_range};

#[derive(Debug, Default)]
struct Keyspace {
    lists: HashMap<String, VecDeque<String>>,
    sets: HashMap<String, BTreeSet<String>>,
    values: HashMap<String, String>,
}

impl Keyspace {
    fn pop_front(&mut self, key: &str) -> Option<String> {
        let list = self.lists.get_mut(key)?;
        let value = list.pop_front();
        if list.is_empty() {
            self.lists.remove(key);
        }
        value
    }

    fn pop_back(&mut self, key: &str) -> Option<String> {
        let list = self.lists.get_mut(key)?;
        let value = list.pop_back();
        if list.is_empty() {
            self.lists.remove(key);
        }
        value
    }
}

/// In-memory [`Store`] with the same atomicity and blocking semantics as a
/// shared backend, scoped to one process.
#[derive(Debug)]
pub struct MemoryStore {
    namespace: String,
    keyspace: Mutex<Keyspace>,
    /// Wakes blocked pops whenever a list grows.
    pushed: Notify,
}

impl MemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            keyspace: Mutex::new(Keyspace::default()),
            pushed: Notify::new(),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    fn keyspace(&self) -> MutexGuard<'_, Keyspace> {
        self.keyspace.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_pop_any(&self, keys: &[String]) -> Option<(String, String)> {
        let mut keyspace = self.keyspace();
        keys.iter()
            .find_map(|key| keyspace.pop_front(key).map(|value| (key.clone(), value)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(crate::DEFAULT_NAMESPACE)
    }
}

impl Store for MemoryStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn add_to_set(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        let key = self.key(set);
        Ok(self
            .keyspace()
            .sets
            .entry(key)
            .or_default()
            .insert(member.to_string()))
    }

    async fn remove_from_set(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        let key = self.key(set);
        let mut keyspace = self.keyspace();
        let Some(members) = keyspace.sets.get_mut(&key) else {
            return Ok(false);
        };
        let removed = members.remove(member);
        if members.is_empty() {
            keyspace.sets.remove(&key);
        }
        Ok(removed)
    }

    async fn members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        let key = self.key(set);
        Ok(self
            .keyspace()
            .sets
            .get(&key)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn push_right(&self, list: &str, value: &str) -> Result<i64, StoreError> {
        let key = self.key(list);
        let length = {
            let mut keyspace = self.keyspace();
            let list = keyspace.lists.entry(key).or_default();
            list.push_back(value.to_string());
            list.len() as i64
        };
        self.pushed.notify_waiters();
        Ok(length)
    }

    async fn pop_left(&self, list: &str) -> Result<Option<String>, StoreError> {
        let key = self.key(list);
        Ok(self.keyspace().pop_front(&key))
    }

    async fn pop_right(&self, list: &str) -> Result<Option<String>, StoreError> {
        let key = self.key(list);
        Ok(self.keyspace().pop_back(&key))
    }

    async fn length(&self, list: &str) -> Result<usize, StoreError> {
        let key = self.key(list);
        Ok(self.keyspace().lists.get(&key).map_or(0, VecDeque::len))
    }

    async fn index_at(&self, list: &str, index: i64) -> Result<Option<String>, StoreError> {
        let key = self.key(list);
        let keyspace = self.keyspace();
        Ok(keyspace.lists.get(&key).and_then(|items| {
            resolve_index(index, items.len()).and_then(|i| items.get(i).cloned())
        }))
    }

    async fn range(&self, list: &str, start: i64, end: i64) -> Result<Vec<String>, StoreError> {
        let key = self.key(list);
        let keyspace = self.keyspace();
        let Some(items) = keyspace.lists.get(&key) else {
            return Ok(Vec::new());
        };
        Ok(resolve_range(start, end, items.len())
            .map(|range| items.range(range).cloned().collect())
            .unwrap_or_default())
    }

    async fn blocking_pop_left(
        &self,
        lists: &[String],
        timeout: Duration,
    ) -> Result<Option<(String, String)>, StoreError> {
        let keys: Vec<String> = lists.iter().map(|list| self.key(list)).collect();
        // Zero, or a wait too long to represent, blocks indefinitely.
        let deadline = if timeout.is_zero() {
            None
        } else {
            Instant::now().checked_add(timeout)
        };

        loop {
            // Register interest before checking so a push between the check
            // and the wait still wakes us.
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(hit) = self.try_pop_any(&keys) {
                return Ok(Some(hit));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(None);
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn move_right_to_left(&self, source: &str, dest: &str) -> Result<Option<String>, StoreError> {
        let source = self.key(source);
        let dest = self.key(dest);
        let moved = {
            let mut keyspace = self.keyspace();
            let value = keyspace.pop_back(&source);
            if let Some(value) = &value {
                keyspace
                    .lists
                    .entry(dest)
                    .or_default()
                    .push_front(value.clone());
            }
            value
        };
        if moved.is_some() {
            self.pushed.notify_waiters();
        }
        Ok(moved)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key = self.key(key);
        let mut keyspace = self.keyspace();
        keyspace.lists.remove(&key);
        keyspace.sets.remove(&key);
        keyspace.values.insert(key, value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = self.key(key);
        Ok(self.keyspace().values.get(&key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let key = self.key(key);
        let mut keyspace = self.keyspace();
        let list = keyspace.lists.remove(&key).is_some();
        let set = keyspace.sets.remove(&key).is_some();
        let value = keyspace.values.remove(&key).is_some();
        Ok(list || set || value)
    }

    async fn increment(&self, key: &str, by: i64) -> Result<i64, StoreError> {
        let key = self.key(key);
        let mut keyspace = self.keyspace();
        let current = match keyspace.values.get(&key) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| StoreError::Command(format!("value at {key} is not an integer")))?,
            None => 0,
        };
        let next = current
            .checked_add(by)
            .ok_or_else(|| StoreError::Command(format!("increment of {key} would overflow")))?;
        keyspace.values.insert(key, next.to_string());
        Ok(next)
    }

    fn disconnect(&self) {
        tracing::debug!("Memory store has no connection to drop");
    }
}
