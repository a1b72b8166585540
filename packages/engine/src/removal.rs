//! Filtering pending jobs out of a live queue.
//!
//! The only primitive used to mutate the queue is the backend's atomic
//! tail-to-head move, so every item is always in exactly one list. A pass
//! walks the queue from its tail into a temp list one item at a time, drops
//! matches from there, and parks survivors on a requeue list. Survivors are
//! then moved back in their original order.
//!
//! Jobs pushed onto the queue while a pass runs are not protected. One pushed
//! before the queue is exhausted is examined like any other item: it is
//! removed if it matches, and otherwise restored ahead of the survivors
//! examined before it arrived. One pushed after the queue is exhausted is not
//! examined and ends up behind every restored survivor. Removal is meant for
//! operator maintenance, not steady-state traffic.

use std::sync::Arc;

use backend::Store;
use chrono::Utc;
use queue_core::{JobId, Payload, RemovalRule, keys, matches_any};

use crate::{JobQueue, QueueError};

/// One removal pass over a queue, driven step by step.
pub struct SafeRemoval<S> {
    store: Arc<S>,
    queue: String,
    original: String,
    temp: String,
    requeue: String,
    removed: usize,
    kept: usize,
}

impl<S: Store> SafeRemoval<S> {
    /// Allocate the pass's disposable lists. Nothing is moved yet.
    pub fn begin(store: Arc<S>, queue: &str) -> Self {
        let original = keys::queue(queue);
        let temp = format!("{}:temp:{}:{}", original, Utc::now().timestamp(), JobId::new());
        let requeue = format!("{temp}:requeue");
        Self {
            store,
            queue: queue.to_string(),
            original,
            temp,
            requeue,
            removed: 0,
            kept: 0,
        }
    }

    pub fn temp_list(&self) -> &str {
        &self.temp
    }

    pub fn requeue_list(&self) -> &str {
        &self.requeue
    }

    pub fn removed(&self) -> usize {
        self.removed
    }

    pub fn kept(&self) -> usize {
        self.kept
    }

    /// Examine the queue's current tail. Returns false once the queue is exhausted.
    pub async fn step(&mut self, rules: &[RemovalRule]) -> Result<bool, QueueError> {
        let Some(raw) = self
            .store
            .move_right_to_left(&self.original, &self.temp)
            .await?
        else {
            return Ok(false);
        };

        // The temp list holds only this item, so its tail is the item just moved.
        let matched = Payload::decode(&raw).is_ok_and(|payload| matches_any(rules, &payload));
        if matched {
            self.store.pop_right(&self.temp).await?;
            self.removed += 1;
        } else {
            self.store.move_right_to_left(&self.temp, &self.requeue).await?;
            self.kept += 1;
        }
        Ok(true)
    }

    /// Put the survivors back and drop the disposable lists.
    pub async fn finish(self) -> Result<usize, QueueError> {
        self.drain(&self.requeue, &self.original).await?;
        self.cleanup().await?;
        tracing::info!(
            "Removed {} jobs from {} ({} kept)",
            self.removed,
            self.queue,
            self.kept
        );
        Ok(self.removed)
    }

    /// Undo an interrupted pass without losing anything.
    ///
    /// Any undecided item in the temp list and whatever is still queued are
    /// gathered in front of the survivors, then everything goes back in order.
    pub async fn restore(self) -> Result<usize, QueueError> {
        self.drain(&self.temp, &self.requeue).await?;
        self.drain(&self.original, &self.requeue).await?;
        self.drain(&self.requeue, &self.original).await?;
        self.cleanup().await?;
        tracing::warn!(
            "Restored interrupted removal on {} ({} already removed)",
            self.queue,
            self.removed
        );
        Ok(self.removed)
    }

    async fn drain(&self, source: &str, dest: &str) -> Result<(), QueueError> {
        while self.store.move_right_to_left(source, dest).await?.is_some() {}
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), QueueError> {
        self.store.delete(&self.temp).await?;
        self.store.delete(&self.requeue).await?;
        Ok(())
    }
}

impl<S: Store> JobQueue<S> {
    /// Remove every pending job in `queue` that matches any of `rules`.
    ///
    /// Survivors keep their relative order. Returns how many jobs were removed.
    pub async fn remove_matching(&self, queue: &str, rules: &[RemovalRule]) -> Result<usize, QueueError> {
        let mut pass = SafeRemoval::begin(self.store.clone(), queue);
        loop {
            match pass.step(rules).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    tracing::error!(
                        "Removal on {} interrupted, items may remain in {} and {}: {}",
                        queue,
                        pass.temp_list(),
                        pass.requeue_list(),
                        e
                    );
                    return Err(e);
                }
            }
        }
        pass.finish().await
    }
}
