//! Worker actor for executing jobs.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use backend::Store;
use queue_core::{Job, JobStatus, WorkerId};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use serde::{Deserialize, Serialize};

use crate::handler::JobHandlerRegistry;
use crate::messages::WorkerMessage;
use crate::{JobQueue, QueueError, WorkerRegistry};

/// Configuration for a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Queues to reserve from, highest priority first.
    pub queues: Vec<String>,
    /// How long one reservation waits before the mailbox is checked again (milliseconds).
    pub interval_ms: u64,
    /// Timeout for a single job (seconds).
    pub timeout_secs: u64,
    /// Unregister dead workers on this host before registering.
    pub prune_on_start: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queues: vec!["default".to_string()],
            interval_ms: 5_000,
            timeout_secs: 300,
            prune_on_start: true,
        }
    }
}

impl WorkerConfig {
    pub fn new(queues: Vec<String>) -> Self {
        Self {
            queues,
            ..Default::default()
        }
    }

    fn interval(&self) -> Duration {
        // A zero wait would block the actor forever.
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Worker actor arguments.
pub struct WorkerArgs<S> {
    pub queue: JobQueue<S>,
    pub registry: WorkerRegistry<S>,
    pub handlers: Arc<JobHandlerRegistry>,
    pub config: WorkerConfig,
    /// Identity to register under; derived from host, pid and queues when unset.
    pub id: Option<WorkerId>,
}

impl<S: Store> WorkerArgs<S> {
    pub fn new(queue: JobQueue<S>, handlers: JobHandlerRegistry, config: WorkerConfig) -> Self {
        Self {
            registry: WorkerRegistry::new(queue.store().clone()),
            queue,
            handlers: Arc::new(handlers),
            config,
            id: None,
        }
    }

    pub fn with_registry(mut self, registry: WorkerRegistry<S>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_id(mut self, id: WorkerId) -> Self {
        self.id = Some(id);
        self
    }
}

/// State for the worker actor.
pub struct WorkerActorState<S> {
    pub id: WorkerId,
    queue: JobQueue<S>,
    registry: WorkerRegistry<S>,
    handlers: Arc<JobHandlerRegistry>,
    config: WorkerConfig,
    /// Jobs finished by this worker, successful or not.
    processed: u64,
    running: bool,
}

impl<S: Store> WorkerActorState<S> {
    async fn work_once(&mut self) -> Result<(), QueueError> {
        let Some(job) = self
            .queue
            .reserve_blocking(&self.config.queues, self.config.interval())
            .await?
        else {
            return Ok(());
        };
        self.perform(job).await
    }

    async fn perform(&mut self, job: Job) -> Result<(), QueueError> {
        self.registry.update_current_job(&self.id, Some(&job)).await?;
        self.queue.update_job_status(&job, JobStatus::Running).await?;

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match self.handlers.dispatch(&job, timeout).await {
            Ok(()) => {
                self.queue.update_job_status(&job, JobStatus::Complete).await?;
                tracing::info!("Job {} ({}) completed on {}", job.id(), job.class(), job.queue);
            }
            Err(error) => {
                tracing::warn!("Job {} ({}) failed: {}", job.id(), job.class(), error);
                self.queue.update_job_status(&job, JobStatus::Failed).await?;
                self.registry.record_failure(&self.id).await?;
            }
        }

        self.registry.update_current_job(&self.id, None).await?;
        self.processed += 1;
        Ok(())
    }
}

/// Worker actor that reserves and executes jobs.
pub struct WorkerActor<S>(PhantomData<fn() -> S>);

impl<S> Default for WorkerActor<S> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<S: Store> Actor for WorkerActor<S> {
    type Msg = WorkerMessage;
    type State = WorkerActorState<S>;
    type Arguments = WorkerArgs<S>;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let id = args
            .id
            .unwrap_or_else(|| args.registry.local_id(args.config.queues.clone()));
        tracing::info!("Starting worker: {}", id);

        if args.config.prune_on_start {
            args.registry.prune_dead_workers().await?;
        }
        args.registry.register(&id).await?;

        // Start the work loop
        myself.send_message(WorkerMessage::Work)?;

        Ok(WorkerActorState {
            id,
            queue: args.queue,
            registry: args.registry,
            handlers: args.handlers,
            config: args.config,
            processed: 0,
            running: true,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Work => {
                if !state.running {
                    return Ok(());
                }
                state.work_once().await?;
                // Queued behind anything that arrived while we were blocked.
                myself.send_message(WorkerMessage::Work)?;
            }

            WorkerMessage::Prune => {
                let pruned = state.registry.prune_dead_workers().await?;
                if !pruned.is_empty() {
                    tracing::info!("Pruned {} dead workers", pruned.len());
                }
            }

            WorkerMessage::Processed { reply } => {
                let _ = reply.send(state.processed);
            }

            WorkerMessage::Shutdown => {
                tracing::info!("Shutting down worker: {}", state.id);
                state.running = false;
                state.registry.unregister(&state.id).await?;
                myself.stop(None);
            }
        }

        Ok(())
    }
}

/// Spawn a worker actor.
pub async fn start_worker<S: Store>(
    args: WorkerArgs<S>,
) -> Result<(ActorRef<WorkerMessage>, tokio::task::JoinHandle<()>), ractor::SpawnErr> {
    Actor::spawn(None, WorkerActor::default(), args).await
}
