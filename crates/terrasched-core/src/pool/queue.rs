//! Pending set of runnable tasks, ordered by priority score then arrival.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::chunk::ChunkIndex;
use crate::job::JobId;

use super::priority::{PriorityChunks, PriorityMetric};

/// A runnable job handed to the pool.
pub(crate) struct PoolTask {
    pub(crate) job: JobId,
    pub(crate) chunks: Vec<ChunkIndex>,
    pub(crate) run: Box<dyn FnOnce() + Send>,
}

struct Pending {
    score: u64,
    seq: u64,
    task: PoolTask,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    // BinaryHeap is a max-heap: the lowest score, then the oldest, must compare greatest.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub(crate) struct PendingQueue {
    heap: BinaryHeap<Pending>,
    next_seq: u64,
    priority: PriorityChunks,
}

impl PendingQueue {
    pub(crate) fn new(metric: PriorityMetric) -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            priority: PriorityChunks::new(metric),
        }
    }

    pub(crate) fn push(&mut self, task: PoolTask) {
        let score = self.priority.score(&task.chunks);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Pending { score, seq, task });
    }

    pub(crate) fn pop(&mut self) -> Option<PoolTask> {
        self.heap.pop().map(|p| p.task)
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Replace the priority chunks and re-rank everything already pending.
    /// Arrival order is kept as the tie-break.
    pub(crate) fn set_priority_chunks(&mut self, chunks: Vec<ChunkIndex>) {
        self.priority.set(chunks);
        let pending = std::mem::take(&mut self.heap).into_vec();
        self.heap = pending
            .into_iter()
            .map(|p| Pending {
                score: self.priority.score(&p.task.chunks),
                seq: p.seq,
                task: p.task,
            })
            .collect();
    }

    pub(crate) fn priority_chunks(&self) -> &[ChunkIndex] {
        self.priority.chunks()
    }

    pub(crate) fn drain(&mut self) -> Vec<PoolTask> {
        std::mem::take(&mut self.heap)
            .into_vec()
            .into_iter()
            .map(|p| p.task)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: u64, chunks: &[(i32, i32)]) -> PoolTask {
        PoolTask {
            job: JobId(id),
            chunks: chunks.iter().map(|&c| ChunkIndex::from(c)).collect(),
            run: Box::new(|| {}),
        }
    }

    fn pop_ids(q: &mut PendingQueue) -> Vec<u64> {
        std::iter::from_fn(|| q.pop()).map(|t| t.job.0).collect()
    }

    #[test]
    fn fifo_without_priority_chunks() {
        let mut q = PendingQueue::new(PriorityMetric::Chebyshev);
        q.push(task(1, &[(9, 9)]));
        q.push(task(2, &[(0, 0)]));
        q.push(task(3, &[(4, 4)]));
        assert_eq!(pop_ids(&mut q), vec![1, 2, 3]);
    }

    #[test]
    fn nearest_first_with_priority_chunks() {
        let mut q = PendingQueue::new(PriorityMetric::Chebyshev);
        q.set_priority_chunks(vec![ChunkIndex::new(0, 0)]);
        q.push(task(1, &[(9, 9)]));
        q.push(task(2, &[(1, 0)]));
        q.push(task(3, &[(4, 4)]));
        q.push(task(4, &[]));
        q.push(task(5, &[(0, 1)]));
        assert_eq!(pop_ids(&mut q), vec![4, 2, 5, 3, 1]);
    }

    #[test]
    fn reprioritise_reranks_pending() {
        let mut q = PendingQueue::new(PriorityMetric::Euclidean);
        q.set_priority_chunks(vec![ChunkIndex::new(0, 0)]);
        q.push(task(1, &[(0, 0)]));
        q.push(task(2, &[(20, 20)]));
        q.set_priority_chunks(vec![ChunkIndex::new(20, 20)]);
        assert_eq!(q.priority_chunks(), &[ChunkIndex::new(20, 20)]);
        assert_eq!(pop_ids(&mut q), vec![2, 1]);
    }
}
