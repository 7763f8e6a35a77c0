//! Chunk coordinates and per-chunk admission state.

mod index;
mod state;
mod sync_set;

pub use index::{ChunkIndex, DigOrigin};
pub use state::ChunkQueueState;
pub use sync_set::SynchronizedChunkSet;
