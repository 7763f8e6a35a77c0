//! One-shot completion channel between a job and whoever enqueued it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::error::SchedulerError;

use super::{JobId, JobKind, JobOutcome};

/// Sending half, owned by the scheduler's job entry.
pub(crate) struct JobCompletion {
    tx: Sender<JobOutcome>,
    skip: Arc<AtomicBool>,
}

impl JobCompletion {
    pub(crate) fn channel(id: JobId, kind: JobKind, label: &'static str) -> (Self, JobHandle) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let skip = Arc::new(AtomicBool::new(false));
        let completion = JobCompletion {
            tx,
            skip: Arc::clone(&skip),
        };
        let handle = JobHandle {
            id,
            kind,
            label,
            rx,
            skip,
            outcome: OnceLock::new(),
        };
        (completion, handle)
    }

    pub(crate) fn skip_requested(&self) -> bool {
        self.skip.load(Ordering::Relaxed)
    }

    /// Deliver the outcome. A dropped handle is not an error.
    pub(crate) fn finish(self, outcome: JobOutcome) {
        let _ = self.tx.send(outcome);
    }
}

/// Receiving half returned by a successful admission.
///
/// Dropping the handle does not cancel the job.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    kind: JobKind,
    label: &'static str,
    rx: Receiver<JobOutcome>,
    skip: Arc<AtomicBool>,
    outcome: OnceLock<JobOutcome>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Ask the scheduler to drop this job's payload if it is skippable and
    /// has not started yet. No effect on a job already executing.
    pub fn request_skip(&self) {
        self.skip.store(true, Ordering::Relaxed);
    }

    /// Block until the job leaves the scheduler.
    pub fn wait(&self) -> Result<JobOutcome, SchedulerError> {
        if let Some(outcome) = self.outcome.get() {
            return Ok(outcome.clone());
        }
        match self.rx.recv() {
            Ok(outcome) => Ok(self.store(outcome)),
            Err(_) => Err(SchedulerError::ShutDown),
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`, returning `Ok(None)`.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<JobOutcome>, SchedulerError> {
        if let Some(outcome) = self.outcome.get() {
            return Ok(Some(outcome.clone()));
        }
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Ok(Some(self.store(outcome))),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SchedulerError::ShutDown),
        }
    }

    /// Non-blocking poll.
    pub fn try_outcome(&self) -> Result<Option<JobOutcome>, SchedulerError> {
        if let Some(outcome) = self.outcome.get() {
            return Ok(Some(outcome.clone()));
        }
        match self.rx.try_recv() {
            Ok(outcome) => Ok(Some(self.store(outcome))),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SchedulerError::ShutDown),
        }
    }

    fn store(&self, outcome: JobOutcome) -> JobOutcome {
        self.outcome.get_or_init(|| outcome).clone()
    }
}
