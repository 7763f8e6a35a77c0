//! Fixed-size worker pool.
//!
//! Workers block on a shared pending set and run each task synchronously on
//! their own thread. The pending set is a priority queue ranked by distance to
//! a settable list of priority chunks, falling back to arrival order.

mod priority;
mod queue;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::chunk::ChunkIndex;
use crate::error::SchedulerError;

pub use priority::{PriorityChunks, PriorityMetric};
pub(crate) use queue::PoolTask;
use queue::PendingQueue;

struct Shared {
    queue: Mutex<PendingQueue>,
    ready: Condvar,
    shutdown: AtomicBool,
    executing: AtomicUsize,
}

pub(crate) struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    threads: usize,
}

impl WorkerPool {
    /// Start `threads` workers (at least one).
    pub(crate) fn new(threads: usize, metric: PriorityMetric) -> Result<Self, SchedulerError> {
        let threads = threads.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(PendingQueue::new(metric)),
            ready: Condvar::new(),
            shutdown: AtomicBool::new(false),
            executing: AtomicUsize::new(0),
        });

        let mut workers = Vec::with_capacity(threads);
        for i in 0..threads {
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("terrasched-worker-{i}"))
                .spawn(move || worker_loop(&worker_shared));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Stop whatever already started before reporting.
                    shared.shutdown.store(true, Ordering::Release);
                    shared.ready.notify_all();
                    for w in workers {
                        let _ = w.join();
                    }
                    return Err(SchedulerError::WorkerSpawn(e));
                }
            }
        }
        tracing::info!(threads, ?metric, "worker pool started");

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            threads,
        })
    }

    pub(crate) fn threads(&self) -> usize {
        self.threads
    }

    /// Queue a runnable task. Returns the task back if the pool is shut down.
    pub(crate) fn submit(&self, task: PoolTask) -> Result<(), PoolTask> {
        let mut queue = self.shared.queue.lock();
        if self.shared.shutdown.load(Ordering::Acquire) {
            return Err(task);
        }
        queue.push(task);
        drop(queue);
        self.shared.ready.notify_one();
        Ok(())
    }

    pub(crate) fn set_priority_chunks(&self, chunks: Vec<ChunkIndex>) {
        self.shared.queue.lock().set_priority_chunks(chunks);
    }

    pub(crate) fn priority_chunks(&self) -> Vec<ChunkIndex> {
        self.shared.queue.lock().priority_chunks().to_vec()
    }

    /// Tasks waiting for a worker.
    pub(crate) fn queued(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Tasks currently running on a worker.
    pub(crate) fn executing(&self) -> usize {
        self.shared.executing.load(Ordering::Relaxed)
    }

    /// Stop accepting work, wake every worker and join them. Tasks that never
    /// started are returned so the caller can release their bookkeeping.
    ///
    /// A worker calling this (e.g. by dropping the last scheduler handle from
    /// inside a payload) is not joined.
    pub(crate) fn shutdown(&self) -> Vec<PoolTask> {
        let abandoned = {
            let mut queue = self.shared.queue.lock();
            if self.shared.shutdown.swap(true, Ordering::AcqRel) {
                return Vec::new();
            }
            queue.drain()
        };
        self.shared.ready.notify_all();

        let current = thread::current().id();
        let workers = std::mem::take(&mut *self.workers.lock());
        for w in workers {
            if w.thread().id() == current {
                continue;
            }
            if w.join().is_err() {
                tracing::warn!("worker thread exited with a panic");
            }
        }
        tracing::info!(abandoned = abandoned.len(), "worker pool stopped");
        abandoned
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        drop(self.shutdown());
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let task = {
            let mut queue = shared.queue.lock();
            loop {
                if shared.shutdown.load(Ordering::Acquire) {
                    return;
                }
                if let Some(task) = queue.pop() {
                    break task;
                }
                shared.ready.wait(&mut queue);
            }
        };
        shared.executing.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(job = %task.job, "worker picked up job");
        (task.run)();
        shared.executing.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobId;
    use std::time::Duration;

    fn task(id: u64, run: impl FnOnce() + Send + 'static) -> PoolTask {
        PoolTask {
            job: JobId(id),
            chunks: Vec::new(),
            run: Box::new(run),
        }
    }

    #[test]
    fn runs_submitted_tasks() {
        let pool = WorkerPool::new(2, PriorityMetric::Chebyshev).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        for i in 0..8u64 {
            let tx = tx.clone();
            assert!(pool.submit(task(i, move || tx.send(i).unwrap())).is_ok());
        }
        let mut got: Vec<u64> = (0..8)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        got.sort();
        assert_eq!(got, (0..8).collect::<Vec<_>>());
        assert_eq!(pool.threads(), 2);
    }

    #[test]
    fn submit_after_shutdown_returns_task() {
        let pool = WorkerPool::new(1, PriorityMetric::Chebyshev).unwrap();
        assert!(pool.shutdown().is_empty());
        let rejected = pool.submit(task(7, || {}));
        assert_eq!(rejected.err().map(|t| t.job), Some(JobId(7)));
    }

    #[test]
    fn zero_threads_still_gets_one_worker() {
        let pool = WorkerPool::new(0, PriorityMetric::Chebyshev).unwrap();
        assert_eq!(pool.threads(), 1);
        let (tx, rx) = crossbeam_channel::bounded(1);
        assert!(pool.submit(task(1, move || tx.send(()).unwrap())).is_ok());
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
}
