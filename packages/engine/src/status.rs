//! Store-backed job status tracking.

use std::sync::Arc;

use backend::Store;
use chrono::Utc;
use queue_core::{JobId, JobStatus, StatusRecord, keys};

use crate::QueueError;

/// Tracks the lifecycle status of jobs enqueued with tracking on.
pub struct StatusTracker<S> {
    store: Arc<S>,
}

impl<S> Clone for StatusTracker<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> StatusTracker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Start tracking a job as waiting.
    pub async fn create(&self, id: &JobId) -> Result<(), QueueError> {
        let now = Utc::now().timestamp();
        self.write(
            id,
            &StatusRecord {
                status: JobStatus::Waiting,
                updated: now,
                started: now,
            },
        )
        .await
    }

    /// Whether a status record exists for this job.
    pub async fn is_tracking(&self, id: &JobId) -> Result<bool, QueueError> {
        Ok(self.store.get(&keys::status(id)).await?.is_some())
    }

    /// Record a new status. Untracked jobs are left alone.
    pub async fn update(&self, id: &JobId, status: JobStatus) -> Result<(), QueueError> {
        let Some(current) = self.record(id).await? else {
            return Ok(());
        };
        self.write(
            id,
            &StatusRecord {
                status,
                updated: Utc::now().timestamp(),
                started: current.started,
            },
        )
        .await
    }

    pub async fn get(&self, id: &JobId) -> Result<Option<JobStatus>, QueueError> {
        Ok(self.record(id).await?.map(|record| record.status))
    }

    /// Stop tracking a job.
    pub async fn stop(&self, id: &JobId) -> Result<(), QueueError> {
        self.store.delete(&keys::status(id)).await?;
        Ok(())
    }

    async fn record(&self, id: &JobId) -> Result<Option<StatusRecord>, QueueError> {
        let Some(raw) = self.store.get(&keys::status(id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!("Unreadable status for job {}: {}", id, e);
                Ok(None)
            }
        }
    }

    async fn write(&self, id: &JobId, record: &StatusRecord) -> Result<(), QueueError> {
        let json = serde_json::to_string(record)?;
        self.store.set(&keys::status(id), &json).await?;
        Ok(())
    }
}
