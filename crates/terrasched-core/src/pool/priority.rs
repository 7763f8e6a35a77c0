//! Distance-based ordering of runnable jobs.

use serde::{Deserialize, Serialize};

use crate::chunk::ChunkIndex;

/// Distance used to rank runnable jobs against the priority chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityMetric {
    #[default]
    Chebyshev,
    Euclidean,
}

impl PriorityMetric {
    pub fn distance(self, a: ChunkIndex, b: ChunkIndex) -> u64 {
        match self {
            PriorityMetric::Chebyshev => a.chebyshev_distance(b),
            PriorityMetric::Euclidean => a.euclidean_distance_sq(b),
        }
    }
}

/// The chunks runnable work should gravitate towards (e.g. around the camera).
#[derive(Debug, Clone, Default)]
pub struct PriorityChunks {
    metric: PriorityMetric,
    chunks: Vec<ChunkIndex>,
}

impl PriorityChunks {
    pub fn new(metric: PriorityMetric) -> Self {
        Self {
            metric,
            chunks: Vec::new(),
        }
    }

    pub fn set(&mut self, chunks: Vec<ChunkIndex>) {
        self.chunks = chunks;
    }

    pub fn chunks(&self) -> &[ChunkIndex] {
        &self.chunks
    }

    /// Lower is more urgent. Jobs without chunks (master jobs) and all jobs
    /// when no priority chunks are set score 0, which leaves FIFO order.
    pub fn score(&self, job_chunks: &[ChunkIndex]) -> u64 {
        if self.chunks.is_empty() || job_chunks.is_empty() {
            return 0;
        }
        job_chunks
            .iter()
            .flat_map(|&c| self.chunks.iter().map(move |&p| self.metric.distance(c, p)))
            .min()
            .unwrap_or(0)
    }
}
