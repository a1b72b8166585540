//! Queue operations over the shared backend.

use std::sync::Arc;
use std::time::Duration;

use backend::Store;
use queue_core::{EnqueueObserver, Job, ObserverList, Payload, RemovalRule, keys};

use crate::QueueError;
use crate::status::StatusTracker;

/// Handle to the job queues living in a backend store.
///
/// Holds no queue state of its own; every call is a request against the
/// store, so clones can be shared freely across tasks.
pub struct JobQueue<S> {
    pub(crate) store: Arc<S>,
    pub(crate) observers: ObserverList,
    pub(crate) status: StatusTracker<S>,
}

impl<S> Clone for JobQueue<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            observers: self.observers.clone(),
            status: self.status.clone(),
        }
    }
}

impl<S: Store> JobQueue<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            status: StatusTracker::new(store.clone()),
            observers: ObserverList::new(),
            store,
        }
    }

    /// Add an observer to the enqueue pipeline.
    pub fn with_observer<O: EnqueueObserver>(mut self, observer: O) -> Self {
        self.observers.register(observer);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn status(&self) -> &StatusTracker<S> {
        &self.status
    }

    /// Append a payload to a queue.
    ///
    /// The queue is registered as known before anything else, even if the
    /// push then fails. Returns `Ok(false)` when the payload cannot be
    /// encoded or the backend reports no growth.
    pub async fn push(&self, queue: &str, payload: &Payload) -> Result<bool, QueueError> {
        self.store.add_to_set(keys::QUEUES, queue).await?;

        let encoded = match payload.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!("Not pushing job {} to {}: {}", payload.id, queue, e);
                return Ok(false);
            }
        };

        let length = self.store.push_right(&keys::queue(queue), &encoded).await?;
        if length < 1 {
            return Ok(false);
        }

        tracing::debug!("Pushed job {} ({}) to {}", payload.id, payload.class, queue);
        Ok(true)
    }

    /// Pop the head of a queue. Malformed payloads are dropped and reported as `None`.
    pub async fn pop(&self, queue: &str) -> Result<Option<Payload>, QueueError> {
        let Some(raw) = self.store.pop_left(&keys::queue(queue)).await? else {
            return Ok(None);
        };
        Ok(decode_or_skip(queue, &raw))
    }

    /// Number of pending jobs in a queue.
    pub async fn size(&self, queue: &str) -> Result<usize, QueueError> {
        Ok(self.store.length(&keys::queue(queue)).await?)
    }

    /// Look at up to `count` pending jobs starting at `start` without removing them.
    pub async fn peek(&self, queue: &str, start: usize, count: usize) -> Result<Vec<Payload>, QueueError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        // Bounds past the end of any list clamp to it; they must never wrap negative.
        let end = i64::try_from(start.saturating_add(count - 1)).unwrap_or(i64::MAX);
        let start = i64::try_from(start).unwrap_or(i64::MAX);
        let items = self.store.range(&keys::queue(queue), start, end).await?;
        Ok(items
            .iter()
            .filter_map(|raw| decode_or_skip(queue, raw))
            .collect())
    }

    /// Wait up to `timeout` for a job on any of `queues`.
    ///
    /// A zero timeout blocks until something arrives.
    pub async fn blocking_pop<Q: AsRef<str>>(
        &self,
        queues: &[Q],
        timeout: Duration,
    ) -> Result<Option<Job>, QueueError> {
        let lists: Vec<String> = queues.iter().map(|q| keys::queue(q.as_ref())).collect();
        let Some((list, raw)) = self.store.blocking_pop_left(&lists, timeout).await? else {
            return Ok(None);
        };

        let prefix = format!("{}:{}", self.store.namespace(), keys::QUEUE_PREFIX);
        let queue = list.strip_prefix(&prefix).unwrap_or(&list).to_string();

        Ok(decode_or_skip(&queue, &raw).map(|payload| Job::new(queue, payload)))
    }

    /// Every queue name that has been pushed to and not removed.
    pub async fn queues(&self) -> Result<Vec<String>, QueueError> {
        let mut queues = self.store.members(keys::QUEUES).await?;
        queues.sort();
        Ok(queues)
    }

    /// Delete a queue's jobs and forget the queue. Returns how many jobs were dropped.
    pub async fn remove_queue(&self, queue: &str) -> Result<usize, QueueError> {
        let removed = self.remove_all(queue).await?;
        self.store.remove_from_set(keys::QUEUES, queue).await?;
        tracing::info!("Removed queue {} ({} pending jobs)", queue, removed);
        Ok(removed)
    }

    /// Delete every pending job in a queue, keeping it known.
    pub async fn remove_all(&self, queue: &str) -> Result<usize, QueueError> {
        let count = self.size(queue).await?;
        let deleted = self.store.delete(&keys::queue(queue)).await?;
        Ok(if deleted { count } else { 0 })
    }

    /// Remove pending jobs matching any rule, or all of them when `rules` is empty.
    pub async fn dequeue(&self, queue: &str, rules: &[RemovalRule]) -> Result<usize, QueueError> {
        if rules.is_empty() {
            self.remove_all(queue).await
        } else {
            self.remove_matching(queue, rules).await
        }
    }
}

pub(crate) fn decode_or_skip(queue: &str, raw: &str) -> Option<Payload> {
    match Payload::decode(raw) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::warn!("Skipping malformed job on queue {}: {}", queue, e);
            None
        }
    }
}
