//! Scheduler counters and the snapshot handed to callers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::job::JobOutcome;

#[derive(Debug, Default)]
pub(super) struct Counters {
    pub(super) admitted: AtomicU64,
    pub(super) refused: AtomicU64,
    pub(super) executed: AtomicU64,
    pub(super) skipped: AtomicU64,
    pub(super) panicked: AtomicU64,
    pub(super) queues_removed: AtomicU64,
}

impl Counters {
    pub(super) fn bump(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub(super) fn record_outcome(&self, outcome: &JobOutcome) {
        let counter = match outcome {
            JobOutcome::Completed => &self.executed,
            JobOutcome::Skipped => &self.skipped,
            JobOutcome::Panicked { .. } => &self.panicked,
        };
        Self::bump(counter, 1);
    }
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStats {
    /// Worker threads in the pool.
    pub workers: usize,
    /// Chunk queues currently alive (the master queue is not counted).
    pub live_chunk_queues: usize,
    /// Admitted jobs that have not finished yet.
    pub jobs_in_flight: usize,
    /// Runnable jobs waiting for a worker.
    pub pool_queued: usize,
    /// Jobs running on a worker right now.
    pub pool_executing: usize,
    pub admitted: u64,
    /// Requests turned away by an admission predicate.
    pub refused: u64,
    /// Payloads that ran to completion.
    pub executed: u64,
    pub skipped: u64,
    pub panicked: u64,
    pub queues_removed: u64,
}

impl SchedulerStats {
    pub(super) fn load_counters(&mut self, c: &Counters) {
        self.admitted = c.admitted.load(Ordering::Relaxed);
        self.refused = c.refused.load(Ordering::Relaxed);
        self.executed = c.executed.load(Ordering::Relaxed);
        self.skipped = c.skipped.load(Ordering::Relaxed);
        self.panicked = c.panicked.load(Ordering::Relaxed);
        self.queues_removed = c.queues_removed.load(Ordering::Relaxed);
    }

    /// Jobs that left the scheduler by any route.
    pub fn finished(&self) -> u64 {
        self.executed + self.skipped + self.panicked
    }
}
