//! Scheduler error type.

use thiserror::Error;

/// Failures of the scheduler API itself.
///
/// Refused admission is not an error: it is reported as
/// [`Enqueued::Refused`](crate::scheduler::Enqueued::Refused) and the caller
/// simply tries again on a later tick.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler was shut down before the job could run, or enqueue was
    /// called after shutdown.
    #[error("scheduler is shut down")]
    ShutDown,
    /// A chunk job was enqueued with an empty chunk list.
    #[error("chunk job has no chunk resources")]
    NoResources,
    /// A dig radius that is negative, not finite, or wider than the dig limit.
    #[error("invalid dig radius {radius} (allowed 0..={max})")]
    InvalidDigRadius { radius: f32, max: f32 },
    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}
