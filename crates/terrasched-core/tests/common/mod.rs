//! Shared helpers for the integration tests.
#![allow(dead_code)]

pub mod probe;

use std::time::Duration;

use terrasched_core::pool::PriorityMetric;
use terrasched_core::{ChunkIndex, Scheduler};

pub const WAIT: Duration = Duration::from_secs(20);

pub fn scheduler(workers: usize) -> Scheduler {
    Scheduler::with_workers(workers, PriorityMetric::Chebyshev).unwrap()
}

/// Square `n` x `n` block of chunks starting at the origin.
pub fn grid(n: i32) -> Vec<ChunkIndex> {
    (0..n)
        .flat_map(|x| (0..n).map(move |y| ChunkIndex::new(x, y)))
        .collect()
}
