//! Sets of chunks whose mesh-filter refresh must land in the same frame.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ChunkIndex;

/// Chunks that must see their derived mesh-filter update in the same frame.
///
/// A multi-chunk edit records every chunk it touched here so the renderer
/// never shows mismatched geometry across a chunk border for one frame.
/// Ordered so the collaborator receives a deterministic list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynchronizedChunkSet {
    chunks: BTreeSet<ChunkIndex>,
}

impl SynchronizedChunkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chunk: ChunkIndex) -> bool {
        self.chunks.insert(chunk)
    }

    /// Union `other` into this set.
    pub fn merge(&mut self, other: &SynchronizedChunkSet) {
        self.chunks.extend(other.chunks.iter().copied());
    }

    pub fn contains(&self, chunk: ChunkIndex) -> bool {
        self.chunks.contains(&chunk)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ChunkIndex> + '_ {
        self.chunks.iter().copied()
    }

    /// Move the contents out, leaving this set empty.
    pub fn take(&mut self) -> SynchronizedChunkSet {
        std::mem::take(self)
    }
}

impl FromIterator<ChunkIndex> for SynchronizedChunkSet {
    fn from_iter<I: IntoIterator<Item = ChunkIndex>>(iter: I) -> Self {
        Self {
            chunks: iter.into_iter().collect(),
        }
    }
}
