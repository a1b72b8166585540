//! Backend key naming. All keys are relative to the store's namespace.

use crate::JobId;

/// Set of every queue name that has ever been pushed to.
pub const QUEUES: &str = "queues";

/// Set of registered worker ids.
pub const WORKERS: &str = "workers";

/// Global processed-job counter.
pub const PROCESSED: &str = "processed";

/// Global failed-job counter.
pub const FAILED: &str = "failed";

/// Prefix of every queue list key.
pub const QUEUE_PREFIX: &str = "queue:";

pub fn queue(name: &str) -> String {
    format!("{QUEUE_PREFIX}{name}")
}

pub fn worker(id: &str) -> String {
    format!("worker:{id}")
}

pub fn worker_started(id: &str) -> String {
    format!("worker:{id}:started")
}

pub fn processed(id: &str) -> String {
    format!("{PROCESSED}:{id}")
}

pub fn failed(id: &str) -> String {
    format!("{FAILED}:{id}")
}

pub fn status(id: &JobId) -> String {
    format!("job:{id}:status")
}
