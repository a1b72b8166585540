//! Message types for actor communication.

use ractor::RpcReplyPort;

/// Messages for the WorkerActor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Wait for one job and process it, then ask for more.
    Work,

    /// Unregister dead workers on this host.
    Prune,

    /// Number of jobs this worker has finished.
    Processed { reply: RpcReplyPort<u64> },

    /// Unregister and stop.
    Shutdown,
}
