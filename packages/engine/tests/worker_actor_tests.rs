#![allow(clippy::disallowed_methods)]

mod common;

use std::error::Error;
use std::time::Duration;

use engine::{
    JobHandlerRegistry, JobStatus, WorkerArgs, WorkerConfig, WorkerId, WorkerMessage,
    WorkerRegistry, job_handler, start_worker,
};
use ractor::rpc::CallResult;
use serde_json::json;
use tokio::time::Instant;

fn handlers() -> JobHandlerRegistry {
    let mut handlers = JobHandlerRegistry::new();
    handlers.register(job_handler!("Succeed", |job| {
        let _ = job;
        Ok(())
    }));
    handlers.register(job_handler!("Explode", |job| Err(format!(
        "job {} exploded",
        job.id()
    ))));
    handlers.register(job_handler!("Stall", |job| {
        let _ = job;
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    }));
    handlers
}

async fn wait_for_processed(registry: &WorkerRegistry<backend::MemoryStore>, total: i64) -> Result<(), Box<dyn Error>> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while registry.processed_total().await? < total {
        if Instant::now() > deadline {
            return Err("worker did not finish in time".into());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    Ok(())
}

#[tokio::test]
async fn test_worker_runs_jobs_to_completion() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue();
    let ok = queue.enqueue("work", "Succeed", json!(null), true).await?;
    let boom = queue.enqueue("work", "Explode", json!({"n": 1}), true).await?;
    let unknown = queue.enqueue("work", "Unknown", json!(null), true).await?;

    let config = WorkerConfig {
        queues: vec!["work".to_string()],
        interval_ms: 100,
        timeout_secs: 1,
        prune_on_start: false,
    };
    let id = WorkerId::new("test-host", 1, config.queues.clone());
    let registry = WorkerRegistry::new(queue.store().clone());
    let args = WorkerArgs::new(queue.clone(), handlers(), config)
        .with_registry(registry.clone())
        .with_id(id.clone());

    let (worker, handle) = start_worker(args).await?;
    wait_for_processed(&registry, 3).await?;

    let tracker = queue.status();
    let ok = ok.id().ok_or("missing id")?;
    let boom = boom.id().ok_or("missing id")?;
    let unknown = unknown.id().ok_or("missing id")?;
    assert_eq!(tracker.get(ok).await?, Some(JobStatus::Complete));
    assert_eq!(tracker.get(boom).await?, Some(JobStatus::Failed));
    assert_eq!(tracker.get(unknown).await?, Some(JobStatus::Failed));
    assert_eq!(registry.processed(&id).await?, 3);
    assert_eq!(registry.failed(&id).await?, 2);
    assert!(registry.current_job(&id).await?.is_none());

    let processed = worker
        .call(
            |reply| WorkerMessage::Processed { reply },
            Some(Duration::from_secs(2)),
        )
        .await?;
    assert!(matches!(processed, CallResult::Success(3)));

    worker.send_message(WorkerMessage::Shutdown)?;
    handle.await?;
    assert!(!registry.exists(&id).await?);

    Ok(())
}

#[tokio::test]
async fn test_worker_times_out_slow_jobs() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue();
    let stalled = queue.enqueue("slow", "Stall", json!(null), true).await?;

    let config = WorkerConfig {
        queues: vec!["slow".to_string()],
        interval_ms: 100,
        timeout_secs: 1,
        prune_on_start: false,
    };
    let id = WorkerId::new("test-host", 2, config.queues.clone());
    let registry = WorkerRegistry::new(queue.store().clone());
    let args = WorkerArgs::new(queue.clone(), handlers(), config)
        .with_registry(registry.clone())
        .with_id(id.clone());

    let (worker, handle) = start_worker(args).await?;
    wait_for_processed(&registry, 1).await?;

    let stalled = stalled.id().ok_or("missing id")?;
    assert_eq!(queue.status().get(stalled).await?, Some(JobStatus::Failed));
    assert_eq!(registry.failed_total().await?, 1);

    worker.send_message(WorkerMessage::Shutdown)?;
    handle.await?;
    Ok(())
}

#[test]
fn test_worker_config_defaults() -> Result<(), Box<dyn Error>> {
    let config: WorkerConfig = serde_json::from_value(json!({"queues": ["a", "b"]}))?;
    assert_eq!(config.queues, vec!["a", "b"]);
    assert_eq!(config.interval_ms, 5_000);
    assert_eq!(config.timeout_secs, 300);
    assert!(config.prune_on_start);
    Ok(())
}
