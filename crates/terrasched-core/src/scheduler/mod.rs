//! Chunk job scheduler.
//!
//! Every chunk with outstanding work owns a FIFO resource queue; one extra
//! master queue serializes grid-wide jobs. A job is admitted into all of its
//! queues at once or not at all, becomes runnable when it heads every queue it
//! owns, and on completion advances each of them. At most one job owning a
//! given chunk is ever runnable or executing, which is the only thing that
//! keeps concurrent jobs from racing on the same chunk's terrain data.
//!
//! Bookkeeping runs on whichever thread calls in, under one table lock held
//! only for short, non-blocking sections. Payloads run on the worker pool
//! outside the lock.

mod admission;
mod completion;
mod lifecycle;
mod stats;
mod table;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::chunk::{ChunkIndex, ChunkQueueState, DigOrigin};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::job::{JobHandle, JobId, JobKind, JobRequest, JobState};
use crate::pool::{PriorityMetric, WorkerPool};
use crate::resource::ResourceKey;

pub use stats::SchedulerStats;
use stats::Counters;
use table::QueueTable;

/// Result of an enqueue call.
#[derive(Debug)]
#[must_use]
pub enum Enqueued {
    /// Registered in every requested queue.
    Admitted(JobHandle),
    /// An admission predicate said no; nothing was changed. Try again later.
    Refused,
}

impl Enqueued {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Enqueued::Admitted(_))
    }

    pub fn handle(&self) -> Option<&JobHandle> {
        match self {
            Enqueued::Admitted(h) => Some(h),
            Enqueued::Refused => None,
        }
    }

    pub fn into_handle(self) -> Option<JobHandle> {
        match self {
            Enqueued::Admitted(h) => Some(h),
            Enqueued::Refused => None,
        }
    }
}

pub(crate) struct Inner {
    table: Mutex<QueueTable>,
    pool: WorkerPool,
    counters: Counters,
    shut_down: AtomicBool,
}

/// Scheduler context. Create one per terrain and share it behind an `Arc`.
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Start a scheduler with the pool size and priority metric from `config`.
    pub fn new(config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::with_workers(config.effective_worker_threads(), config.priority_metric)
    }

    pub fn with_workers(threads: usize, metric: PriorityMetric) -> Result<Self, SchedulerError> {
        let pool = WorkerPool::new(threads, metric)?;
        Ok(Self {
            inner: Arc::new(Inner {
                table: Mutex::new(QueueTable::new()),
                pool,
                counters: Counters::default(),
                shut_down: AtomicBool::new(false),
            }),
        })
    }

    /// Admit a chunk job against `chunks`. Duplicate chunks are ignored.
    ///
    /// `can_admit` is asked for every chunk in order; if any says no the call
    /// returns [`Enqueued::Refused`] without touching anything.
    pub fn enqueue(&self, request: JobRequest, chunks: &[ChunkIndex]) -> Result<Enqueued, SchedulerError> {
        let mut keys: Vec<ResourceKey> = Vec::with_capacity(chunks.len());
        for &chunk in chunks {
            let key = ResourceKey::Chunk(chunk);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        if keys.is_empty() {
            return Err(SchedulerError::NoResources);
        }
        self.inner.admit(request, JobKind::Chunk, keys)
    }

    /// Admit a master job: it owns the master queue and every chunk queue
    /// alive right now, so it runs only after all work already queued on
    /// those chunks, and everything queued after it waits for it.
    pub fn enqueue_master(&self, request: JobRequest) -> Result<Enqueued, SchedulerError> {
        self.inner.admit(request, JobKind::Master, Vec::new())
    }

    /// Remove idle queues of chunks outside `active`; busy ones are removed as
    /// soon as they go idle. Returns the number removed right away.
    pub fn update_active_chunks(&self, active: &HashSet<ChunkIndex>) -> usize {
        self.inner.update_active_chunks(active)
    }

    /// Filter `chunks` down to those whose queue state satisfies `predicate`.
    pub fn trim_chunks<F>(&self, chunks: &[ChunkIndex], predicate: F) -> Vec<ChunkIndex>
    where
        F: Fn(&ChunkQueueState) -> bool,
    {
        self.inner.trim_chunks(chunks, predicate)
    }

    pub fn can_load_points(&self, chunk: ChunkIndex) -> bool {
        self.inner.with_chunk_state(chunk, |s| s.can_load_points())
    }

    pub fn can_rebuild_mesh(&self, chunk: ChunkIndex) -> bool {
        self.inner.with_chunk_state(chunk, |s| s.can_rebuild_mesh())
    }

    pub fn can_update_mesh_filter(&self, chunk: ChunkIndex) -> bool {
        self.inner.with_chunk_state(chunk, |s| s.can_update_mesh_filter())
    }

    pub fn can_dig_circle(&self, chunk: ChunkIndex, origin: DigOrigin, radius: f32) -> bool {
        self.inner
            .with_chunk_state(chunk, |s| s.can_dig_circle(origin, radius))
    }

    /// True once points were loaded for `chunk` and its queue still exists.
    pub fn points_loaded(&self, chunk: ChunkIndex) -> bool {
        self.inner.with_chunk_state(chunk, |s| s.points_loaded())
    }

    /// Shared handle to a live chunk's state, e.g. to build admission closures.
    pub fn chunk_state(&self, chunk: ChunkIndex) -> Option<Arc<ChunkQueueState>> {
        let table = self.inner.table.lock();
        table
            .queues
            .get(&ResourceKey::Chunk(chunk))
            .and_then(|q| q.shared_state())
    }

    pub fn has_queue(&self, chunk: ChunkIndex) -> bool {
        self.inner
            .table
            .lock()
            .queues
            .contains_key(&ResourceKey::Chunk(chunk))
    }

    /// Jobs currently admitted against `key`, head first.
    pub fn queue_len(&self, key: ResourceKey) -> usize {
        self.inner
            .table
            .lock()
            .queues
            .get(&key)
            .map_or(0, |q| q.len())
    }

    /// State of a job still inside the scheduler; `None` once it has finished.
    pub fn job_state(&self, id: JobId) -> Option<JobState> {
        self.inner.table.lock().job_state(id)
    }

    /// Rank runnable work by distance to `chunks` (nearest first).
    pub fn set_priority_chunks(&self, chunks: Vec<ChunkIndex>) {
        self.inner.pool.set_priority_chunks(chunks);
    }

    pub fn priority_chunks(&self) -> Vec<ChunkIndex> {
        self.inner.pool.priority_chunks()
    }

    pub fn worker_count(&self) -> usize {
        self.inner.pool.threads()
    }

    pub fn stats(&self) -> SchedulerStats {
        let (live_chunk_queues, jobs_in_flight) = {
            let table = self.inner.table.lock();
            (table.queues.len() - 1, table.jobs.len())
        };
        let mut stats = SchedulerStats {
            workers: self.inner.pool.threads(),
            live_chunk_queues,
            jobs_in_flight,
            pool_queued: self.inner.pool.queued(),
            pool_executing: self.inner.pool.executing(),
            ..SchedulerStats::default()
        };
        stats.load_counters(&self.inner.counters);
        stats
    }

    /// Stop the pool. Jobs that have not started resolve their handles with
    /// [`SchedulerError::ShutDown`]; later enqueues fail the same way.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let abandoned = self.inner.pool.shutdown();
        drop(abandoned);
        let dropped = self.inner.table.lock().abandon_all();
        tracing::info!(dropped, "scheduler shut down");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("workers", &self.inner.pool.threads())
            .finish_non_exhaustive()
    }
}
