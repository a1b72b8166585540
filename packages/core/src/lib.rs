//! Core domain types for the job queue system.
//!
//! This crate contains shared types used across all packages:
//! - Payload, Job and JobId for units of work and their wire format
//! - JobStatus for tracked job lifecycles
//! - Enqueue events and the observer veto contract
//! - Worker identity and current-job snapshots
//! - Removal rules and backend key naming

mod events;
mod job;
pub mod keys;
mod removal;
mod status;
mod worker;

pub use events::{EnqueueEvent, EnqueueObserver, ObserverList, Verdict};
pub use job::{Args, Job, JobId, Payload, PayloadError, validate_args};
pub use removal::{RemovalRule, matches_any};
pub use status::{JobStatus, StatusRecord};
pub use worker::{WorkerId, WorkerIdError, WorkerSnapshot};
