//! Engine error types.

use backend::StoreError;
use queue_core::PayloadError;

/// Errors from queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Backend error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend refused push to queue {queue}")]
    PushRejected { queue: String },
}

/// Process duplication failed. The caller is expected to abort.
#[derive(Debug, thiserror::Error)]
pub enum ForkError {
    #[error("Unable to fork child worker: {0}")]
    Failed(#[source] std::io::Error),
}
