//! Enqueue notifications and the observer veto contract.

use std::sync::Arc;

use serde::Serialize;

use crate::{Args, JobId, Payload};

/// What observers see before and after a job is enqueued.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnqueueEvent {
    pub class: String,
    pub args: Option<Args>,
    pub queue: String,
    pub id: JobId,
}

impl EnqueueEvent {
    pub fn new(queue: impl Into<String>, payload: &Payload) -> Self {
        Self {
            class: payload.class.clone(),
            args: payload.args.clone(),
            queue: queue.into(),
            id: payload.id.clone(),
        }
    }
}

/// An observer's answer to a before-enqueue notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verdict {
    #[default]
    Proceed,
    /// Veto: the job must not be created.
    DontCreate,
}

/// Receives enqueue notifications and may veto job creation.
pub trait EnqueueObserver: Send + Sync + 'static {
    fn before_enqueue(&self, _event: &EnqueueEvent) -> Verdict {
        Verdict::Proceed
    }

    fn after_enqueue(&self, _event: &EnqueueEvent) {}
}

/// Ordered list of observers injected into the enqueue pipeline.
#[derive(Clone, Default)]
pub struct ObserverList {
    observers: Vec<Arc<dyn EnqueueObserver>>,
}

impl ObserverList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<O: EnqueueObserver>(&mut self, observer: O) {
        self.observers.push(Arc::new(observer));
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Notify observers in registration order. The first veto wins and
    /// later observers are not consulted.
    pub fn before_enqueue(&self, event: &EnqueueEvent) -> Verdict {
        for observer in &self.observers {
            if observer.before_enqueue(event) == Verdict::DontCreate {
                return Verdict::DontCreate;
            }
        }
        Verdict::Proceed
    }

    pub fn after_enqueue(&self, event: &EnqueueEvent) {
        for observer in &self.observers {
            observer.after_enqueue(event);
        }
    }
}

impl std::fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct Refuse;

    impl EnqueueObserver for Refuse {
        fn before_enqueue(&self, _event: &EnqueueEvent) -> Verdict {
            Verdict::DontCreate
        }
    }

    #[derive(Default)]
    struct Count(Arc<Mutex<usize>>);

    impl EnqueueObserver for Count {
        fn before_enqueue(&self, _event: &EnqueueEvent) -> Verdict {
            *self.0.lock().unwrap() += 1;
            Verdict::Proceed
        }
    }

    fn event() -> EnqueueEvent {
        EnqueueEvent::new("q", &Payload::new("Job", json!({"a": 1})).unwrap())
    }

    #[test]
    fn test_empty_list_proceeds() {
        let observers = ObserverList::new();
        assert!(observers.is_empty());
        assert_eq!(observers.len(), 0);
        assert_eq!(observers.before_enqueue(&event()), Verdict::Proceed);
    }

    #[test]
    fn test_first_veto_stops_the_round() {
        let seen = Arc::new(Mutex::new(0));
        let mut observers = ObserverList::new();
        observers.register(Count(seen.clone()));
        observers.register(Refuse);
        observers.register(Count(seen.clone()));

        assert_eq!(observers.len(), 3);
        assert!(!observers.is_empty());
        assert_eq!(observers.before_enqueue(&event()), Verdict::DontCreate);
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
