//! Job queue engine.
//!
//! This crate drives the shared backend: enqueueing with observer vetoes,
//! reservation, safe removal, status tracking, worker bookkeeping and the
//! Ractor-based worker loop.
//!
//! # Architecture
//!
//! - `JobQueue` - Push, pop, reserve and remove jobs
//! - `StatusTracker` - Per-job lifecycle records
//! - `WorkerRegistry` - Live workers, their current jobs and counters
//! - `WorkerActor` - Reserves jobs and dispatches them to handlers
//!
//! # Usage
//!
//! ```ignore
//! use engine::{JobQueue, JobHandlerRegistry, WorkerArgs, WorkerConfig, start_worker};
//!
//! let queue = JobQueue::new(Arc::new(backend::MemoryStore::default()));
//! queue.enqueue("mail", "SendWelcome", json!({"user": 7}), true).await?;
//!
//! let args = WorkerArgs::new(queue, handlers, WorkerConfig::new(vec!["mail".into()]));
//! let (worker, handle) = start_worker(args).await?;
//! ```

mod enqueue;
mod error;
mod handler;
mod messages;
mod process;
mod queue;
mod registry;
mod removal;
mod reserve;
mod status;
mod worker_actor;

pub use enqueue::Enqueued;
pub use error::{ForkError, QueueError};
pub use handler::{FnHandler, HandlerFuture, HandlerResult, JobHandler, JobHandlerRegistry};
pub use messages::WorkerMessage;
pub use process::{Forked, fork, hostname, is_alive};
pub use queue::JobQueue;
pub use registry::{LivenessProbe, ProcessProbe, WorkerRegistry};
pub use removal::SafeRemoval;
pub use status::StatusTracker;
pub use worker_actor::{WorkerActor, WorkerActorState, WorkerArgs, WorkerConfig, start_worker};

pub use queue_core::{
    Args, EnqueueEvent, EnqueueObserver, Job, JobId, JobStatus, Payload, RemovalRule, Verdict,
    WorkerId, WorkerSnapshot,
};

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort};
