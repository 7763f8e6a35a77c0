//! Queue lifecycle and per-chunk state queries.

use std::collections::HashSet;

use crate::chunk::{ChunkIndex, ChunkQueueState};
use crate::resource::ResourceKey;

use super::stats::Counters;
use super::Inner;

impl Inner {
    /// Drop idle queues of inactive chunks now; flag busy ones so they go
    /// when their last job retires. Chunks back in the active set are
    /// unflagged. Returns the number of queues removed immediately.
    pub(super) fn update_active_chunks(&self, active: &HashSet<ChunkIndex>) -> usize {
        let mut table = self.table.lock();
        let mut removed = Vec::new();
        let mut flagged = 0usize;
        for (key, queue) in table.queues.iter_mut() {
            let Some(chunk) = key.chunk() else {
                continue;
            };
            if active.contains(&chunk) {
                queue.set_flagged_for_removal(false);
            } else if queue.is_idle() {
                removed.push(*key);
            } else if !queue.is_flagged_for_removal() {
                queue.set_flagged_for_removal(true);
                flagged += 1;
            }
        }
        for key in &removed {
            table.queues.remove(key);
        }
        drop(table);

        Counters::bump(&self.counters.queues_removed, removed.len() as u64);
        if !removed.is_empty() || flagged > 0 {
            tracing::info!(
                removed = removed.len(),
                flagged,
                active = active.len(),
                "updated active chunks"
            );
        }
        removed.len()
    }

    /// Keep the chunks whose queue state satisfies `predicate`. Chunks with no
    /// queue are judged against a fresh state; no queue is created.
    pub(super) fn trim_chunks<F>(&self, chunks: &[ChunkIndex], predicate: F) -> Vec<ChunkIndex>
    where
        F: Fn(&ChunkQueueState) -> bool,
    {
        let fresh = ChunkQueueState::new();
        let table = self.table.lock();
        chunks
            .iter()
            .copied()
            .filter(|chunk| {
                let state = table
                    .queues
                    .get(&ResourceKey::Chunk(*chunk))
                    .and_then(|q| q.chunk_state());
                predicate(state.unwrap_or(&fresh))
            })
            .collect()
    }

    /// Evaluate `f` against the chunk's state (or a fresh one) under the table lock.
    pub(super) fn with_chunk_state<R>(&self, chunk: ChunkIndex, f: impl FnOnce(&ChunkQueueState) -> R) -> R {
        let table = self.table.lock();
        match table
            .queues
            .get(&ResourceKey::Chunk(chunk))
            .and_then(|q| q.chunk_state())
        {
            Some(state) => f(state),
            None => f(&ChunkQueueState::new()),
        }
    }
}
