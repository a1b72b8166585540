//! Reserving jobs for processing.

use std::time::Duration;

use backend::Store;
use queue_core::{Job, JobStatus};

use crate::{JobQueue, QueueError};

impl<S: Store> JobQueue<S> {
    /// Take the next job from `queue` without waiting.
    ///
    /// An empty queue and a malformed head both come back as `None`; the
    /// malformed item is gone from the queue either way.
    pub async fn reserve(&self, queue: &str) -> Result<Option<Job>, QueueError> {
        let job = self.pop(queue).await?.map(|payload| Job::new(queue, payload));
        if let Some(job) = &job {
            tracing::debug!("Reserved job {} from {}", job.id(), queue);
        }
        Ok(job)
    }

    /// Take the first job to arrive on any of `queues`, waiting up to `timeout`.
    ///
    /// A zero timeout waits indefinitely; abort the task to interrupt it.
    pub async fn reserve_blocking<Q: AsRef<str>>(
        &self,
        queues: &[Q],
        timeout: Duration,
    ) -> Result<Option<Job>, QueueError> {
        let job = self.blocking_pop(queues, timeout).await?;
        if let Some(job) = &job {
            tracing::debug!("Reserved job {} from {}", job.id(), job.queue);
        }
        Ok(job)
    }

    /// Tracked status of a job, if it is being tracked.
    pub async fn job_status(&self, job: &Job) -> Result<Option<JobStatus>, QueueError> {
        self.status.get(job.id()).await
    }

    pub async fn update_job_status(&self, job: &Job, status: JobStatus) -> Result<(), QueueError> {
        self.status.update(job.id(), status).await
    }
}
