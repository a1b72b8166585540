//! The enqueue pipeline.

use backend::Store;
use queue_core::{Args, EnqueueEvent, Job, JobId, Payload, Verdict};
use serde_json::Value;

use crate::{JobQueue, QueueError};

/// Outcome of [`JobQueue::enqueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Enqueued {
    /// The job was pushed under this id.
    Queued(JobId),
    /// An observer vetoed the job; nothing was pushed or tracked.
    Cancelled,
}

impl Enqueued {
    pub fn id(&self) -> Option<&JobId> {
        match self {
            Enqueued::Queued(id) => Some(id),
            Enqueued::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Enqueued::Cancelled)
    }
}

impl<S: Store> JobQueue<S> {
    /// Create a job and push it onto `queue`, giving observers a chance to veto.
    ///
    /// `args` must be a JSON object or null. The id observers see before the
    /// push is the id the job is stored and tracked under.
    pub async fn enqueue(
        &self,
        queue: &str,
        class: &str,
        args: Value,
        track: bool,
    ) -> Result<Enqueued, QueueError> {
        let payload = Payload::new(class, args)?;
        let event = EnqueueEvent::new(queue, &payload);

        if self.observers.before_enqueue(&event) == Verdict::DontCreate {
            tracing::info!("Enqueue of {} on {} cancelled by observer", class, queue);
            return Ok(Enqueued::Cancelled);
        }

        let id = self.place(queue, payload, track).await?;
        self.observers.after_enqueue(&event);

        Ok(Enqueued::Queued(id))
    }

    /// Create and push a job without notifying observers.
    pub async fn create_job(
        &self,
        queue: &str,
        class: &str,
        args: Option<Args>,
        track: bool,
    ) -> Result<JobId, QueueError> {
        self.place(queue, Payload::with_id(JobId::new(), class, args), track)
            .await
    }

    /// Push a fresh copy of `job` onto its original queue under a new id.
    ///
    /// The copy is tracked if the original was.
    pub async fn recreate(&self, job: &Job) -> Result<JobId, QueueError> {
        let tracked = self.status.is_tracking(job.id()).await?;
        self.create_job(&job.queue, job.class(), job.args().cloned(), tracked)
            .await
    }

    async fn place(&self, queue: &str, payload: Payload, track: bool) -> Result<JobId, QueueError> {
        if !self.push(queue, &payload).await? {
            return Err(QueueError::PushRejected {
                queue: queue.to_string(),
            });
        }
        if track {
            self.status.create(&payload.id).await?;
        }
        Ok(payload.id)
    }
}
