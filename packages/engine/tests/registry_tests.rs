#![allow(clippy::disallowed_methods)]

mod common;

use std::error::Error;

use engine::{JobStatus, LivenessProbe, WorkerId, WorkerRegistry};
use serde_json::json;

struct FakeProbe {
    host: &'static str,
    me: u32,
    alive: Vec<u32>,
}

impl LivenessProbe for FakeProbe {
    fn hostname(&self) -> String {
        self.host.to_string()
    }

    fn current_pid(&self) -> u32 {
        self.me
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.alive.contains(&pid)
    }
}

fn worker(host: &str, pid: u32) -> WorkerId {
    WorkerId::new(host, pid, vec!["high".to_string(), "low".to_string()])
}

#[tokio::test]
async fn test_worker_lifecycle() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue();
    let registry = WorkerRegistry::new(queue.store().clone());
    let id = worker("box", 42);

    registry.register(&id).await?;
    assert!(registry.exists(&id).await?);
    assert_eq!(registry.all().await?, vec![id.clone()]);
    assert!(registry.started_at(&id).await?.is_some());

    queue.enqueue("high", "Resize", json!({"w": 100}), true).await?;
    let job = queue.reserve("high").await?.ok_or("expected a job")?;

    registry.update_current_job(&id, Some(&job)).await?;
    let snapshot = registry.current_job(&id).await?.ok_or("expected a snapshot")?;
    assert_eq!(snapshot.queue, "high");
    assert_eq!(snapshot.job().id(), job.id());

    registry.record_failure(&id).await?;
    registry.update_current_job(&id, None).await?;
    assert!(registry.current_job(&id).await?.is_none());
    assert_eq!(registry.processed(&id).await?, 1);
    assert_eq!(registry.failed(&id).await?, 1);
    assert_eq!(registry.processed_total().await?, 1);
    assert_eq!(registry.failed_total().await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_unregister_fails_in_flight_job() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue();
    let registry = WorkerRegistry::new(queue.store().clone());
    let id = worker("box", 7);
    registry.register(&id).await?;

    queue.enqueue("low", "Export", json!(null), true).await?;
    let job = queue.reserve("low").await?.ok_or("expected a job")?;
    registry.update_current_job(&id, Some(&job)).await?;

    registry.unregister(&id).await?;

    assert!(!registry.exists(&id).await?);
    assert!(registry.current_job(&id).await?.is_none());
    assert!(registry.started_at(&id).await?.is_none());
    assert_eq!(registry.processed(&id).await?, 0);
    assert_eq!(queue.job_status(&job).await?, Some(JobStatus::Failed));
    assert_eq!(registry.failed_total().await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_prune_dead_workers_on_this_host() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue();
    let registry = WorkerRegistry::new(queue.store().clone()).with_probe(FakeProbe {
        host: "box",
        me: 1,
        alive: vec![2],
    });

    let me = worker("box", 1);
    let alive = worker("box", 2);
    let dead = worker("box", 3);
    let elsewhere = worker("other", 3);
    for id in [&me, &alive, &dead, &elsewhere] {
        registry.register(id).await?;
    }

    assert_eq!(registry.local_id(vec!["high".into(), "low".into()]), me);

    let pruned = registry.prune_dead_workers().await?;

    assert_eq!(pruned, vec![dead.clone()]);
    assert!(!registry.exists(&dead).await?);
    for id in [&me, &alive, &elsewhere] {
        assert!(registry.exists(id).await?);
    }
    Ok(())
}

#[test]
fn test_worker_id_text_form() -> Result<(), Box<dyn Error>> {
    let id = worker("box.local", 4242);
    assert_eq!(id.to_string(), "box.local:4242:high,low");
    assert_eq!("box.local:4242:high,low".parse::<WorkerId>()?, id);
    Ok(())
}
