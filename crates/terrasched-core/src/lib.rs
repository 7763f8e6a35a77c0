pub mod config;
pub mod logging;

pub mod chunk;
pub mod error;
pub mod job;
pub mod pool;
pub mod resource;
pub mod scheduler;
pub mod terrain;

pub use chunk::{ChunkIndex, ChunkQueueState, DigOrigin, SynchronizedChunkSet};
pub use error::SchedulerError;
pub use job::{JobHandle, JobId, JobOutcome, JobRequest};
pub use scheduler::{Enqueued, Scheduler, SchedulerStats};
