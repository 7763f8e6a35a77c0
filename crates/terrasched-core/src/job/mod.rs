//! Jobs: identity, lifecycle state, admission request and completion handle.

mod handle;
mod request;

use serde::Serialize;

pub use handle::JobHandle;
pub(crate) use handle::JobCompletion;
pub use request::{AdmitFn, JobRequest, QueueFn};

/// Scheduler-assigned job identifier, unique for the scheduler's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a job was admitted against chunk queues or as a master job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobKind {
    Chunk,
    Master,
}

/// Where an admitted job is inside the scheduler.
///
/// Before `enqueue` a job is just a [`JobRequest`]; admission happens within
/// the `enqueue` call, under the table lock. Once a job has finished its entry
/// is gone and the outcome lives on the [`JobHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    /// Registered in its queues, waiting to head all of them.
    Queued,
    /// Heads every queue it owns; handed to the pool.
    Pending,
    /// Payload running on a worker.
    Executing,
}

/// How a job left the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The payload ran to completion.
    Completed,
    /// The job was skippable and a skip condition held when it became
    /// runnable; the payload never ran.
    Skipped,
    /// The payload panicked. Its queues were still advanced.
    Panicked { message: String },
}
