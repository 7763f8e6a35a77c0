//! Resource queues: per-chunk FIFOs plus the master queue.

mod key;
mod queue;

pub use key::ResourceKey;
pub use queue::ResourceQueue;
