//! Worker registration and bookkeeping.

use std::sync::Arc;

use backend::Store;
use chrono::{DateTime, Utc};
use queue_core::{Job, JobStatus, WorkerId, WorkerSnapshot, keys};

use crate::QueueError;
use crate::process;
use crate::status::StatusTracker;

/// Answers which worker processes are still running on this host.
pub trait LivenessProbe: Send + Sync + 'static {
    /// Name of this host, as recorded in worker ids.
    fn hostname(&self) -> String;

    /// Pid of the calling process, which pruning never removes.
    fn current_pid(&self) -> u32;

    /// Whether a process with this pid is running on this host.
    fn is_alive(&self, pid: u32) -> bool;
}

/// Probe backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessProbe;

impl LivenessProbe for ProcessProbe {
    fn hostname(&self) -> String {
        process::hostname()
    }

    fn current_pid(&self) -> u32 {
        std::process::id()
    }

    fn is_alive(&self, pid: u32) -> bool {
        process::is_alive(pid)
    }
}

/// Registry of live workers, their current jobs and their counters.
pub struct WorkerRegistry<S> {
    store: Arc<S>,
    status: StatusTracker<S>,
    probe: Arc<dyn LivenessProbe>,
}

impl<S> Clone for WorkerRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            status: self.status.clone(),
            probe: self.probe.clone(),
        }
    }
}

impl<S: Store> WorkerRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            status: StatusTracker::new(store.clone()),
            store,
            probe: Arc::new(ProcessProbe),
        }
    }

    /// Use a different liveness probe for pruning.
    pub fn with_probe<P: LivenessProbe>(mut self, probe: P) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Identity for a worker in this process serving `queues`.
    pub fn local_id(&self, queues: Vec<String>) -> WorkerId {
        WorkerId::new(self.probe.hostname(), self.probe.current_pid(), queues)
    }

    pub async fn register(&self, worker: &WorkerId) -> Result<(), QueueError> {
        let id = worker.to_string();
        self.store.add_to_set(keys::WORKERS, &id).await?;
        self.store
            .set(&keys::worker_started(&id), &Utc::now().to_rfc3339())
            .await?;
        tracing::info!("Registered worker {}", id);
        Ok(())
    }

    /// Forget a worker and its counters.
    ///
    /// A job still recorded as in flight is counted as failed, since nothing
    /// will ever finish it.
    pub async fn unregister(&self, worker: &WorkerId) -> Result<(), QueueError> {
        let id = worker.to_string();

        if let Some(snapshot) = self.current_job(worker).await? {
            tracing::warn!(
                "Worker {} exited while running job {}",
                id,
                snapshot.payload.id
            );
            self.status
                .update(&snapshot.payload.id, JobStatus::Failed)
                .await?;
            self.store.increment(keys::FAILED, 1).await?;
        }

        self.store.remove_from_set(keys::WORKERS, &id).await?;
        self.store.delete(&keys::worker(&id)).await?;
        self.store.delete(&keys::worker_started(&id)).await?;
        self.store.delete(&keys::processed(&id)).await?;
        self.store.delete(&keys::failed(&id)).await?;

        tracing::info!("Unregistered worker {}", id);
        Ok(())
    }

    /// Record the job a worker just started, or with `None`, that it finished one.
    pub async fn update_current_job(&self, worker: &WorkerId, job: Option<&Job>) -> Result<(), QueueError> {
        let id = worker.to_string();
        match job {
            Some(job) => {
                let snapshot = serde_json::to_string(&WorkerSnapshot::of(job))?;
                self.store.set(&keys::worker(&id), &snapshot).await?;
            }
            None => {
                self.store.delete(&keys::worker(&id)).await?;
                self.store.increment(keys::PROCESSED, 1).await?;
                self.store.increment(&keys::processed(&id), 1).await?;
            }
        }
        Ok(())
    }

    pub async fn record_failure(&self, worker: &WorkerId) -> Result<(), QueueError> {
        self.store.increment(keys::FAILED, 1).await?;
        self.store
            .increment(&keys::failed(&worker.to_string()), 1)
            .await?;
        Ok(())
    }

    /// Unregister workers on this host whose process is gone.
    pub async fn prune_dead_workers(&self) -> Result<Vec<WorkerId>, QueueError> {
        let hostname = self.probe.hostname();
        let me = self.probe.current_pid();
        let mut pruned = Vec::new();

        for worker in self.all().await? {
            if worker.hostname != hostname || worker.pid == me || self.probe.is_alive(worker.pid) {
                continue;
            }
            tracing::warn!("Pruning dead worker {}", worker);
            self.unregister(&worker).await?;
            pruned.push(worker);
        }

        Ok(pruned)
    }

    /// Every registered worker. Ids that do not parse are skipped.
    pub async fn all(&self) -> Result<Vec<WorkerId>, QueueError> {
        let members = self.store.members(keys::WORKERS).await?;
        Ok(members
            .iter()
            .filter_map(|raw| match raw.parse::<WorkerId>() {
                Ok(worker) => Some(worker),
                Err(e) => {
                    tracing::warn!("{}", e);
                    None
                }
            })
            .collect())
    }

    pub async fn exists(&self, worker: &WorkerId) -> Result<bool, QueueError> {
        let id = worker.to_string();
        Ok(self
            .store
            .members(keys::WORKERS)
            .await?
            .iter()
            .any(|member| *member == id))
    }

    pub async fn current_job(&self, worker: &WorkerId) -> Result<Option<WorkerSnapshot>, QueueError> {
        let Some(raw) = self.store.get(&keys::worker(&worker.to_string())).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub async fn started_at(&self, worker: &WorkerId) -> Result<Option<DateTime<Utc>>, QueueError> {
        let Some(raw) = self
            .store
            .get(&keys::worker_started(&worker.to_string()))
            .await?
        else {
            return Ok(None);
        };
        Ok(DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|started| started.with_timezone(&Utc)))
    }

    pub async fn processed(&self, worker: &WorkerId) -> Result<i64, QueueError> {
        self.counter(&keys::processed(&worker.to_string())).await
    }

    pub async fn failed(&self, worker: &WorkerId) -> Result<i64, QueueError> {
        self.counter(&keys::failed(&worker.to_string())).await
    }

    pub async fn processed_total(&self) -> Result<i64, QueueError> {
        self.counter(keys::PROCESSED).await
    }

    pub async fn failed_total(&self) -> Result<i64, QueueError> {
        self.counter(keys::FAILED).await
    }

    async fn counter(&self, key: &str) -> Result<i64, QueueError> {
        Ok(self
            .store
            .get(key)
            .await?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0))
    }
}
