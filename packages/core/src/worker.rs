//! Worker identity and the current-job snapshot.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Job, Payload};

/// Identity of a worker process: `hostname:pid:queue1,queue2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerId {
    pub hostname: String,
    pub pid: u32,
    pub queues: Vec<String>,
}

impl WorkerId {
    pub fn new(hostname: impl Into<String>, pid: u32, queues: Vec<String>) -> Self {
        Self {
            hostname: hostname.into(),
            pid,
            queues,
        }
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.hostname, self.pid, self.queues.join(","))
    }
}

#[derive(Debug, Error)]
#[error("Invalid worker id: {0}")]
pub struct WorkerIdError(String);

impl FromStr for WorkerId {
    type Err = WorkerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(hostname), Some(pid), Some(queues)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(WorkerIdError(s.to_string()));
        };
        let pid = pid.parse().map_err(|_| WorkerIdError(s.to_string()))?;
        let queues = queues
            .split(',')
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self::new(hostname, pid, queues))
    }
}

/// What a worker is doing right now, stored while a job runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    pub queue: String,
    pub run_started_at: DateTime<Utc>,
    pub payload: Payload,
}

impl WorkerSnapshot {
    pub fn of(job: &Job) -> Self {
        Self {
            queue: job.queue.clone(),
            run_started_at: Utc::now(),
            payload: job.payload.clone(),
        }
    }

    pub fn job(&self) -> Job {
        Job::new(self.queue.clone(), self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_id_round_trips_through_its_string_form() {
        let id = WorkerId::new("box-1", 4242, vec!["high".into(), "low".into()]);
        assert_eq!(id.to_string(), "box-1:4242:high,low");
        assert_eq!(id.to_string().parse::<WorkerId>().unwrap(), id);
    }

    #[test]
    fn worker_id_parsing_rejects_garbage() {
        assert!("box-1".parse::<WorkerId>().is_err());
        assert!("box-1:pid:q".parse::<WorkerId>().is_err());
        assert!("box-1:12:".parse::<WorkerId>().unwrap().queues.is_empty());
    }
}
