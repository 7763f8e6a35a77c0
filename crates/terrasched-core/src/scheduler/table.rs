//! Queue table: every live resource queue and every job still in the scheduler.
//!
//! Everything here runs under the scheduler's single table lock.

use std::collections::HashMap;

use crate::chunk::ChunkIndex;
use crate::job::{JobCompletion, JobId, JobKind, JobOutcome, JobRequest, JobState, QueueFn};
use crate::resource::{ResourceKey, ResourceQueue};

pub(super) struct JobEntry {
    pub(super) label: &'static str,
    pub(super) kind: JobKind,
    pub(super) state: JobState,
    /// Queues the job was appended to, in admission order.
    pub(super) owned: Vec<ResourceKey>,
    /// Queues whose gate callbacks apply. Differs from `owned` only when a
    /// chunk job was also enrolled behind a busy master queue.
    pub(super) gated: Vec<ResourceKey>,
    pub(super) work: Option<Box<dyn FnOnce() + Send>>,
    pub(super) on_unreserve: Option<QueueFn>,
    pub(super) can_skip: bool,
    pub(super) completion: Option<JobCompletion>,
}

impl JobEntry {
    /// Chunks used to rank the job in the pool. Master jobs have none so they
    /// sort ahead of chunk work.
    pub(super) fn priority_chunks(&self) -> Vec<ChunkIndex> {
        match self.kind {
            JobKind::Master => Vec::new(),
            JobKind::Chunk => self.gated.iter().filter_map(|k| k.chunk()).collect(),
        }
    }
}

/// A job that heads all of its queues and is about to go to the pool.
pub(super) struct Runnable {
    pub(super) id: JobId,
    pub(super) label: &'static str,
    pub(super) chunks: Vec<ChunkIndex>,
    pub(super) work: Box<dyn FnOnce() + Send>,
}

/// What to do with a job that just became runnable.
pub(super) enum Start {
    Run(Runnable),
    Skip(JobId),
}

/// Result of retiring one job: its completion channel plus the jobs that
/// moved to the head of every queue they own.
pub(super) struct Retired {
    pub(super) completion: Option<JobCompletion>,
    pub(super) ready: Vec<JobId>,
    pub(super) removed_queues: usize,
}

pub(super) struct QueueTable {
    pub(super) queues: HashMap<ResourceKey, ResourceQueue>,
    pub(super) jobs: HashMap<JobId, JobEntry>,
    /// Master-kind jobs registered and not yet retired.
    master_jobs: usize,
    next_id: u64,
}

impl QueueTable {
    pub(super) fn new() -> Self {
        let mut queues = HashMap::new();
        queues.insert(ResourceKey::Master, ResourceQueue::master());
        Self {
            queues,
            jobs: HashMap::new(),
            master_jobs: 0,
            next_id: 1,
        }
    }

    pub(super) fn next_job_id(&mut self) -> JobId {
        let id = JobId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create the queue for `key` if it does not exist. Returns true if created.
    pub(super) fn ensure_queue(&mut self, key: ResourceKey) -> bool {
        match key {
            ResourceKey::Master => false,
            ResourceKey::Chunk(chunk) => {
                if self.queues.contains_key(&key) {
                    return false;
                }
                self.queues.insert(key, ResourceQueue::for_chunk(chunk));
                true
            }
        }
    }

    /// A master job is queued or running. Chunk jobs merely enrolled in the
    /// master queue do not count.
    pub(super) fn master_pending(&self) -> bool {
        self.master_jobs > 0
    }

    pub(super) fn chunk_keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self
            .queues
            .keys()
            .copied()
            .filter(|k| !k.is_master())
            .collect();
        keys.sort();
        keys
    }

    /// Run the admission predicate against every key, in order.
    pub(super) fn all_admit(&self, request: &JobRequest, keys: &[ResourceKey]) -> bool {
        keys.iter().all(|key| {
            self.queues
                .get(key)
                .map_or(false, |queue| request.admits(queue))
        })
    }

    pub(super) fn reserve_all(&self, request: &JobRequest, keys: &[ResourceKey]) {
        if let Some(on_reserve) = &request.on_reserve {
            for key in keys {
                if let Some(queue) = self.queues.get(key) {
                    on_reserve(queue);
                }
            }
        }
    }

    /// Append `id` to every owned queue and register the entry.
    pub(super) fn register(&mut self, id: JobId, entry: JobEntry) {
        for key in &entry.owned {
            if let Some(queue) = self.queues.get_mut(key) {
                queue.enqueue(id);
            }
        }
        if entry.kind == JobKind::Master {
            self.master_jobs += 1;
        }
        self.jobs.insert(id, entry);
    }

    /// Drop a job entry without advancing its queues (pool already stopped).
    pub(super) fn forget(&mut self, id: JobId) {
        if let Some(entry) = self.jobs.remove(&id) {
            if entry.kind == JobKind::Master {
                self.master_jobs -= 1;
            }
        }
    }

    /// A job is ready when it heads every queue it owns.
    pub(super) fn is_ready(&self, id: JobId) -> bool {
        let Some(entry) = self.jobs.get(&id) else {
            return false;
        };
        entry.state == JobState::Queued
            && entry
                .owned
                .iter()
                .all(|key| self.queues.get(key).map_or(false, |q| q.is_head(id)))
    }

    /// Move a ready job to Pending and decide whether it runs or is skipped.
    pub(super) fn start(&mut self, id: JobId) -> Option<Start> {
        let skip = self.skip_condition(id);
        let entry = self.jobs.get_mut(&id)?;
        entry.state = JobState::Pending;
        if skip {
            tracing::debug!(job = %id, label = entry.label, "skipping superseded job");
            return Some(Start::Skip(id));
        }
        let work = entry.work.take()?;
        Some(Start::Run(Runnable {
            id,
            label: entry.label,
            chunks: entry.priority_chunks(),
            work,
        }))
    }

    /// A skippable job is dropped when a skip was requested through its
    /// handle, or when every chunk it owns has left the working set.
    fn skip_condition(&self, id: JobId) -> bool {
        let Some(entry) = self.jobs.get(&id) else {
            return false;
        };
        if !entry.can_skip {
            return false;
        }
        if entry
            .completion
            .as_ref()
            .map_or(false, |c| c.skip_requested())
        {
            return true;
        }
        let mut chunk_queues = entry
            .owned
            .iter()
            .filter(|k| !k.is_master())
            .filter_map(|k| self.queues.get(k))
            .peekable();
        chunk_queues.peek().is_some() && chunk_queues.all(|q| q.is_flagged_for_removal())
    }

    pub(super) fn mark_executing(&mut self, id: JobId) {
        if let Some(entry) = self.jobs.get_mut(&id) {
            entry.state = JobState::Executing;
        }
    }

    /// Unreserve and advance every queue owned by `id`, removing queues that
    /// went idle while flagged for removal.
    pub(super) fn retire(&mut self, id: JobId) -> Option<Retired> {
        let mut entry = self.jobs.remove(&id)?;
        if entry.kind == JobKind::Master {
            self.master_jobs -= 1;
        }

        if let Some(on_unreserve) = &entry.on_unreserve {
            for key in &entry.gated {
                if let Some(queue) = self.queues.get(key) {
                    on_unreserve(queue);
                }
            }
        }

        let mut ready = Vec::new();
        let mut removed_queues = 0;
        for key in &entry.owned {
            let Some(queue) = self.queues.get_mut(key) else {
                continue;
            };
            debug_assert!(queue.is_head(id), "retiring job {id} that is not head of {key}");
            match queue.advance() {
                Some(next) => {
                    if !ready.contains(&next) {
                        ready.push(next);
                    }
                }
                None => {
                    if queue.is_flagged_for_removal() && !key.is_master() {
                        self.queues.remove(key);
                        removed_queues += 1;
                        tracing::info!(resource = %key, "removed idle chunk queue");
                    }
                }
            }
        }
        ready.retain(|next| self.is_ready(*next));

        Some(Retired {
            completion: entry.completion.take(),
            ready,
            removed_queues,
        })
    }

    /// Forget every job (shutdown). Their handles resolve with `ShutDown`.
    pub(super) fn abandon_all(&mut self) -> usize {
        let n = self.jobs.len();
        self.jobs.clear();
        self.master_jobs = 0;
        for queue in self.queues.values_mut() {
            while queue.advance().is_some() {}
        }
        n
    }

    pub(super) fn job_state(&self, id: JobId) -> Option<JobState> {
        self.jobs.get(&id).map(|e| e.state)
    }
}

/// Outcome to deliver once the table lock is released.
pub(super) type Delivery = (Option<JobCompletion>, JobOutcome);
