//! FIFO of admitted jobs for one resource.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::chunk::{ChunkIndex, ChunkQueueState};
use crate::job::JobId;

use super::ResourceKey;

/// Ordered list of jobs admitted against one resource.
///
/// Jobs are only ever appended at the tail and removed at the head: terrain
/// side effects are not commutative, so a dig followed by a rebuild must never
/// run as rebuild-then-dig.
#[derive(Debug)]
pub struct ResourceQueue {
    key: ResourceKey,
    jobs: VecDeque<JobId>,
    flagged_for_removal: bool,
    state: Option<Arc<ChunkQueueState>>,
}

impl ResourceQueue {
    /// Queue for a chunk, with a fresh pipeline gate.
    pub fn for_chunk(chunk: ChunkIndex) -> Self {
        Self {
            key: ResourceKey::Chunk(chunk),
            jobs: VecDeque::new(),
            flagged_for_removal: false,
            state: Some(Arc::new(ChunkQueueState::new())),
        }
    }

    /// The master queue. It has no pipeline gate.
    pub fn master() -> Self {
        Self {
            key: ResourceKey::Master,
            jobs: VecDeque::new(),
            flagged_for_removal: false,
            state: None,
        }
    }

    pub fn key(&self) -> ResourceKey {
        self.key
    }

    pub fn chunk(&self) -> Option<ChunkIndex> {
        self.key.chunk()
    }

    /// Pipeline gate for chunk queues; `None` for the master queue.
    pub fn chunk_state(&self) -> Option<&ChunkQueueState> {
        self.state.as_deref()
    }

    pub(crate) fn shared_state(&self) -> Option<Arc<ChunkQueueState>> {
        self.state.clone()
    }

    /// Append `job` at the tail.
    pub fn enqueue(&mut self, job: JobId) {
        self.jobs.push_back(job);
    }

    pub fn is_head(&self, job: JobId) -> bool {
        self.jobs.front() == Some(&job)
    }

    pub fn head(&self) -> Option<JobId> {
        self.jobs.front().copied()
    }

    /// Drop the (completed) head and return the new head, if any.
    pub fn advance(&mut self) -> Option<JobId> {
        self.jobs.pop_front();
        self.jobs.front().copied()
    }

    pub fn is_idle(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_flagged_for_removal(&self) -> bool {
        self.flagged_for_removal
    }

    pub(crate) fn set_flagged_for_removal(&mut self, flagged: bool) {
        self.flagged_for_removal = flagged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_head_and_advance() {
        let mut q = ResourceQueue::for_chunk(ChunkIndex::new(0, 0));
        assert!(q.is_idle());
        assert_eq!(q.head(), None);

        q.enqueue(JobId(1));
        q.enqueue(JobId(2));
        q.enqueue(JobId(3));
        assert!(!q.is_idle());
        assert!(q.is_head(JobId(1)));
        assert!(!q.is_head(JobId(2)));
        assert_eq!(q.len(), 3);

        assert_eq!(q.advance(), Some(JobId(2)));
        assert_eq!(q.advance(), Some(JobId(3)));
        assert_eq!(q.advance(), None);
        assert!(q.is_idle());
    }

    #[test]
    fn master_queue_has_no_gate() {
        let q = ResourceQueue::master();
        assert!(q.key().is_master());
        assert!(q.chunk_state().is_none());
        assert!(ResourceQueue::for_chunk(ChunkIndex::new(1, 2))
            .chunk_state()
            .is_some());
    }
}
