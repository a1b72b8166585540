//! Job status tracking types.

use serde::{Deserialize, Serialize};

/// Current status of a tracked job in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting in a queue.
    #[default]
    Waiting,
    /// Job is currently being executed by a worker.
    Running,
    /// Job failed.
    Failed,
    /// Job completed successfully.
    Complete,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Complete)
    }

    /// Get a simple status string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Waiting => "waiting",
            JobStatus::Running => "running",
            JobStatus::Failed => "failed",
            JobStatus::Complete => "complete",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored form of a tracked status: the state plus epoch-second timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: JobStatus,
    /// When the status last changed.
    pub updated: i64,
    /// When tracking began.
    pub started: i64,
}
