#![allow(dead_code)]

use std::sync::Arc;

use backend::MemoryStore;
use engine::{Args, JobQueue, Payload};
use serde_json::Value;

pub fn job_queue() -> JobQueue<MemoryStore> {
    JobQueue::new(Arc::new(MemoryStore::new("test")))
}

pub fn bundle(value: Value) -> Args {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

pub fn payload(class: &str, args: Value) -> Payload {
    Payload::new(class, args).expect("valid args")
}
