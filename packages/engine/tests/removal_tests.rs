#![allow(clippy::disallowed_methods)]

mod common;

use std::error::Error;

use backend::{MemoryStore, Store};
use engine::{JobQueue, RemovalRule, SafeRemoval};
use serde_json::json;

async fn classes(queue: &JobQueue<MemoryStore>, name: &str) -> Result<Vec<String>, Box<dyn Error>> {
    Ok(queue
        .peek(name, 0, 100)
        .await?
        .into_iter()
        .map(|payload| payload.class)
        .collect())
}

async fn fill(queue: &JobQueue<MemoryStore>, name: &str, classes: &[&str]) -> Result<(), Box<dyn Error>> {
    for class in classes {
        queue.push(name, &common::payload(class, json!(null))).await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_remove_by_class_keeps_order() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue();
    fill(&queue, "q", &["A", "B", "A", "C"]).await?;

    let removed = queue.dequeue("q", &[RemovalRule::class("A")]).await?;

    assert_eq!(removed, 2);
    assert_eq!(classes(&queue, "q").await?, vec!["B", "C"]);
    Ok(())
}

#[tokio::test]
async fn test_remove_by_args_and_id() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue();
    let seven = common::payload("Notify", json!({"user": 7}));
    let eight = common::payload("Notify", json!({"user": 8}));
    let bare = common::payload("Notify", json!(null));
    let other = common::payload("Audit", json!(null));
    for payload in [&seven, &eight, &bare, &other] {
        queue.push("q", payload).await?;
    }

    let rules = [
        RemovalRule::class_with_args("Notify", common::bundle(json!({"user": 7}))),
        RemovalRule::class_with_id("Audit", other.id.clone()),
    ];
    assert_eq!(queue.dequeue("q", &rules).await?, 2);

    let left: Vec<_> = queue.peek("q", 0, 10).await?.into_iter().map(|p| p.id).collect();
    assert_eq!(left, vec![eight.id, bare.id]);
    Ok(())
}

#[tokio::test]
async fn test_dequeue_without_rules_empties_queue() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue();
    fill(&queue, "q", &["A", "B", "C"]).await?;

    assert_eq!(queue.dequeue("q", &[]).await?, 3);
    assert_eq!(queue.size("q").await?, 0);
    assert_eq!(queue.queues().await?, vec!["q"]);
    Ok(())
}

#[tokio::test]
async fn test_nothing_matches() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue();
    fill(&queue, "q", &["A", "B"]).await?;

    assert_eq!(queue.dequeue("q", &[RemovalRule::class("Z")]).await?, 0);
    assert_eq!(classes(&queue, "q").await?, vec!["A", "B"]);
    Ok(())
}

#[tokio::test]
async fn test_restore_interrupted_pass() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue();
    fill(&queue, "q", &["A1", "B1", "A2", "B2", "B3"]).await?;
    let rules = [RemovalRule::class("A2"), RemovalRule::class("A1")];

    let mut pass = SafeRemoval::begin(queue.store().clone(), "q");
    let temp = pass.temp_list().to_string();
    let requeue = pass.requeue_list().to_string();
    assert!(pass.step(&rules).await?);
    assert!(pass.step(&rules).await?);
    assert!(pass.step(&rules).await?);
    assert_eq!(pass.removed(), 1);
    assert_eq!(pass.kept(), 2);

    // Interrupted before A1 and B1 were examined.
    let removed = pass.restore().await?;

    assert_eq!(removed, 1);
    assert_eq!(classes(&queue, "q").await?, vec!["A1", "B1", "B2", "B3"]);
    assert_eq!(queue.store().length(&temp).await?, 0);
    assert_eq!(queue.store().length(&requeue).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_restore_recovers_item_left_in_temp() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue();
    fill(&queue, "q", &["A", "B", "C"]).await?;
    let rules = [RemovalRule::class("none")];

    let mut pass = SafeRemoval::begin(queue.store().clone(), "q");
    assert!(pass.step(&rules).await?);
    // Simulate a crash right after an item reached the temp list.
    let original = queue_core::keys::queue("q");
    queue
        .store()
        .move_right_to_left(&original, pass.temp_list())
        .await?;

    assert_eq!(pass.restore().await?, 0);
    assert_eq!(classes(&queue, "q").await?, vec!["A", "B", "C"]);
    Ok(())
}

#[tokio::test]
async fn test_finished_pass_drops_disposable_lists() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue();
    fill(&queue, "q", &["A", "B"]).await?;

    let mut pass = SafeRemoval::begin(queue.store().clone(), "q");
    let temp = pass.temp_list().to_string();
    let requeue = pass.requeue_list().to_string();
    assert!(temp.starts_with("queue:q:temp:"));
    assert_eq!(requeue, format!("{temp}:requeue"));

    let rules = [RemovalRule::class("B")];
    while pass.step(&rules).await? {}
    assert_eq!(pass.finish().await?, 1);

    assert_eq!(classes(&queue, "q").await?, vec!["A"]);
    assert_eq!(queue.store().length(&temp).await?, 0);
    assert_eq!(queue.store().length(&requeue).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_push_during_pass_is_examined() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue();
    fill(&queue, "q", &["A", "B", "C"]).await?;
    let rules = [RemovalRule::class("B")];

    let mut pass = SafeRemoval::begin(queue.store().clone(), "q");
    assert!(pass.step(&rules).await?);

    // Arrives while the pass still has items left to examine.
    fill(&queue, "q", &["D", "B"]).await?;
    while pass.step(&rules).await? {}

    assert_eq!(pass.removed(), 2);
    assert_eq!(pass.kept(), 3);
    assert_eq!(pass.finish().await?, 2);
    // D overtakes C, which was examined before D arrived.
    assert_eq!(classes(&queue, "q").await?, vec!["A", "D", "C"]);
    Ok(())
}

#[tokio::test]
async fn test_push_after_queue_exhausted_lands_behind_survivors() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue();
    fill(&queue, "q", &["A", "B", "C"]).await?;
    let rules = [RemovalRule::class("B")];

    let mut pass = SafeRemoval::begin(queue.store().clone(), "q");
    while pass.step(&rules).await? {}

    fill(&queue, "q", &["B", "E"]).await?;

    assert_eq!(pass.finish().await?, 1);
    // Not examined, so the late B survives.
    assert_eq!(classes(&queue, "q").await?, vec!["A", "C", "B", "E"]);
    Ok(())
}
