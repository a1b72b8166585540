//! Shared backend for the job queue system.
//!
//! This crate provides the atomic list/set/key-value contract every
//! process coordinates through, and its implementations.
//!
//! # Features
//!
//! - default: in-process [`MemoryStore`] only
//! - `redis`: [`RedisStore`] for a backend shared across processes and hosts

mod connection;
mod memory;
#[cfg(feature = "redis")]
mod redis_store;
mod store;

pub use connection::{AnyStore, BackendConfig, DEFAULT_NAMESPACE, connect};
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use store::{Store, StoreError};
