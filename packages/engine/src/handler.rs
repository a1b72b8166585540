//! Job handlers, looked up by job class.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use queue_core::Job;

/// Result of running a job. The error string becomes the failure reason.
pub type HandlerResult = Result<(), String>;

pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Performs jobs of one class.
pub trait JobHandler: Send + Sync + 'static {
    fn class(&self) -> &str;

    fn handle(&self, job: &Job) -> HandlerFuture;
}

/// Maps job classes to their handlers.
#[derive(Default, Clone)]
pub struct JobHandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for its class, replacing any previous one.
    pub fn register<H: JobHandler>(&mut self, handler: H) {
        self.handlers
            .insert(handler.class().to_string(), Arc::new(handler));
    }

    pub fn with<H: JobHandler>(mut self, handler: H) -> Self {
        self.register(handler);
        self
    }

    pub fn get(&self, class: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(class).cloned()
    }

    pub fn has_handler(&self, class: &str) -> bool {
        self.handlers.contains_key(class)
    }

    /// Registered classes, sorted.
    pub fn classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        classes.sort_unstable();
        classes
    }

    /// Run `job` with the handler for its class, giving up after `timeout`.
    ///
    /// A missing handler and an expired timeout are both job failures.
    pub async fn dispatch(&self, job: &Job, timeout: Duration) -> HandlerResult {
        let Some(handler) = self.get(job.class()) else {
            return Err(format!("No handler for job class {}", job.class()));
        };
        match tokio::time::timeout(timeout, handler.handle(job)).await {
            Ok(result) => result,
            Err(_) => Err(format!("Job timed out after {}s", timeout.as_secs_f64())),
        }
    }
}

impl std::fmt::Debug for JobHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandlerRegistry")
            .field("classes", &self.classes())
            .finish()
    }
}

/// Handler built from a closure.
pub struct FnHandler<F> {
    class: String,
    run: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Job) -> HandlerFuture + Send + Sync + 'static,
{
    pub fn new(class: impl Into<String>, run: F) -> Self {
        Self {
            class: class.into(),
            run,
        }
    }
}

impl<F> JobHandler for FnHandler<F>
where
    F: Fn(&Job) -> HandlerFuture + Send + Sync + 'static,
{
    fn class(&self) -> &str {
        &self.class
    }

    fn handle(&self, job: &Job) -> HandlerFuture {
        (self.run)(job)
    }
}

/// Build a [`FnHandler`] from an async body. The job is cloned into the body.
#[macro_export]
macro_rules! job_handler {
    ($class:expr, |$job:ident| $body:expr) => {
        $crate::FnHandler::new($class, |$job: &$crate::Job| {
            let $job = $job.clone();
            Box::pin(async move { $body })
        })
    };
}
