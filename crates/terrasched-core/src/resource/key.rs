use crate::chunk::ChunkIndex;

/// Identity of a resource queue: one per chunk, plus the single master queue.
///
/// `Master` sorts before every chunk so a master job's queue set is always
/// visited in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKey {
    Master,
    Chunk(ChunkIndex),
}

impl ResourceKey {
    pub fn chunk(self) -> Option<ChunkIndex> {
        match self {
            ResourceKey::Chunk(c) => Some(c),
            ResourceKey::Master => None,
        }
    }

    pub fn is_master(self) -> bool {
        matches!(self, ResourceKey::Master)
    }
}

impl From<ChunkIndex> for ResourceKey {
    fn from(chunk: ChunkIndex) -> Self {
        ResourceKey::Chunk(chunk)
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKey::Master => write!(f, "master"),
            ResourceKey::Chunk(c) => write!(f, "chunk {}", c),
        }
    }
}
