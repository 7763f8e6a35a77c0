//! Terrain job pipeline on top of the scheduler.
//!
//! Builds the four chunk job kinds with their queue-state gates and drives
//! them from a per-frame [`TerrainJobs::tick`].

mod backend;

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::chunk::{ChunkIndex, ChunkQueueState, DigOrigin, SynchronizedChunkSet};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::job::{JobHandle, JobRequest};
use crate::pool::{PriorityChunks, PriorityMetric};
use crate::resource::ResourceQueue;
use crate::scheduler::{Enqueued, Scheduler};

pub use backend::TerrainBackend;

/// Run `f` against the queue's chunk state. The master queue has none.
fn gate(queue: &ResourceQueue, f: impl FnOnce(&ChunkQueueState)) {
    if let Some(state) = queue.chunk_state() {
        f(state);
    }
}

fn admits(queue: &ResourceQueue, f: impl FnOnce(&ChunkQueueState) -> bool) -> bool {
    queue.chunk_state().map_or(false, f)
}

/// Widest dig, in chunks, that [`TerrainJobs::dig_circle`] accepts.
pub const MAX_DIG_RADIUS_CHUNKS: f32 = 64.0;

/// What one tick admitted.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Idle chunk queues removed because their chunk left the active set.
    pub removed_queues: usize,
    pub loads: usize,
    pub rebuilds: usize,
    pub filters: usize,
    /// Handles of every job admitted this tick, in admission order.
    pub handles: Vec<JobHandle>,
}

impl TickReport {
    pub fn admitted(&self) -> usize {
        self.loads + self.rebuilds + self.filters
    }

    pub fn summary(&self) -> TickSummary {
        TickSummary {
            removed_queues: self.removed_queues,
            loads: self.loads,
            rebuilds: self.rebuilds,
            filters: self.filters,
        }
    }
}

/// Serializable counts of a [`TickReport`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub removed_queues: usize,
    pub loads: usize,
    pub rebuilds: usize,
    pub filters: usize,
}

/// Terrain job submission for one grid.
pub struct TerrainJobs<B: TerrainBackend> {
    scheduler: Arc<Scheduler>,
    backend: Arc<B>,
    chunk_size: u32,
    metric: PriorityMetric,
    max_rebuilds_per_tick: Option<usize>,
}

impl<B: TerrainBackend> TerrainJobs<B> {
    pub fn new(scheduler: Arc<Scheduler>, backend: Arc<B>, config: &SchedulerConfig) -> Self {
        Self {
            scheduler,
            backend,
            chunk_size: config.chunk_size.max(1),
            metric: config.priority_metric,
            max_rebuilds_per_tick: config.max_rebuilds_per_tick,
        }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Queue a point load for `chunk` unless one is already queued.
    pub fn load_points(&self, chunk: ChunkIndex) -> Result<Enqueued, SchedulerError> {
        let backend = Arc::clone(&self.backend);
        let request = JobRequest::new("load_points", move || backend.load_points(chunk))
            .admit_if(|q| admits(q, |s| s.can_load_points()))
            .on_reserve(|q| gate(q, |s| s.reserve_load_points()))
            .on_unreserve(|q| gate(q, |s| s.unreserve_load_points()));
        self.scheduler.enqueue(request, &[chunk])
    }

    /// Queue a mesh rebuild for `chunk` if one is required and none is queued.
    pub fn rebuild_mesh(&self, chunk: ChunkIndex) -> Result<Enqueued, SchedulerError> {
        let backend = Arc::clone(&self.backend);
        let request = JobRequest::new("rebuild_mesh", move || backend.rebuild_mesh(chunk))
            .admit_if(|q| admits(q, |s| s.can_rebuild_mesh()))
            .on_reserve(|q| gate(q, |s| s.reserve_rebuild_mesh()))
            .on_unreserve(|q| gate(q, |s| s.unreserve_rebuild_mesh()))
            .skippable();
        self.scheduler.enqueue(request, &[chunk])
    }

    /// Queue a mesh-filter refresh for `chunk`. The chunks it must be
    /// synchronized with are taken from the queue state at reservation.
    pub fn update_mesh_filter(&self, chunk: ChunkIndex) -> Result<Enqueued, SchedulerError> {
        let slot = Arc::new(Mutex::new(SynchronizedChunkSet::new()));
        let reserved = Arc::clone(&slot);
        let backend = Arc::clone(&self.backend);
        let request = JobRequest::new("update_mesh_filter", move || {
            let sync = slot.lock().take();
            backend.update_mesh_filter(chunk, &sync);
        })
        .admit_if(|q| admits(q, |s| s.can_update_mesh_filter()))
        .on_reserve(move |q| gate(q, |s| *reserved.lock() = s.reserve_update_mesh_filter()))
        .on_unreserve(|q| gate(q, |s| s.unreserve_update_mesh_filter()))
        .skippable();
        self.scheduler.enqueue(request, &[chunk])
    }

    /// Largest radius [`dig_circle`](Self::dig_circle) accepts.
    pub fn max_dig_radius(&self) -> f32 {
        self.chunk_size as f32 * MAX_DIG_RADIUS_CHUNKS
    }

    /// Queue a circular dig. Owns every chunk the circle touches; their mesh
    /// filters are refreshed as one synchronized set.
    ///
    /// `radius` must be finite and within `0..=max_dig_radius()`, otherwise
    /// [`SchedulerError::InvalidDigRadius`] is returned and nothing is queued.
    pub fn dig_circle(&self, origin: DigOrigin, radius: f32) -> Result<Enqueued, SchedulerError> {
        let max = self.max_dig_radius();
        if !(0.0..=max).contains(&radius) {
            return Err(SchedulerError::InvalidDigRadius { radius, max });
        }
        let chunks = ChunkIndex::covering_circle(origin, radius, self.chunk_size);
        let sync: SynchronizedChunkSet = chunks.iter().copied().collect();
        let backend = Arc::clone(&self.backend);
        let touched = chunks.clone();
        let request = JobRequest::new("dig_circle", move || {
            backend.dig_circle(origin, radius, &touched)
        })
        .admit_if(move |q| admits(q, |s| s.can_dig_circle(origin, radius)))
        .on_reserve(move |q| gate(q, |s| s.reserve_dig_circle(origin, radius, &sync)))
        .on_unreserve(move |q| gate(q, |s| s.unreserve_dig_circle(origin, radius)));
        self.scheduler.enqueue(request, &chunks)
    }

    /// Queue a grid-wide save behind all outstanding chunk work.
    pub fn save_all(&self) -> Result<Enqueued, SchedulerError> {
        let backend = Arc::clone(&self.backend);
        self.scheduler
            .enqueue_master(JobRequest::new("save_all", move || backend.save_all()))
    }

    /// Per-frame driver: drop queues of chunks outside `active`, then admit
    /// whatever load, rebuild and filter work the active chunks need,
    /// nearest to the priority chunks first.
    pub fn tick(&self, active: &HashSet<ChunkIndex>) -> Result<TickReport, SchedulerError> {
        let mut report = TickReport {
            removed_queues: self.scheduler.update_active_chunks(active),
            ..TickReport::default()
        };

        let mut priority = PriorityChunks::new(self.metric);
        priority.set(self.scheduler.priority_chunks());
        let mut ordered: Vec<ChunkIndex> = active.iter().copied().collect();
        ordered.sort_by_key(|&c| (priority.score(&[c]), c));

        for chunk in self.scheduler.trim_chunks(&ordered, ChunkQueueState::needs_points) {
            if let Some(h) = self.load_points(chunk)?.into_handle() {
                report.loads += 1;
                report.handles.push(h);
            }
        }

        let mut rebuild = self
            .scheduler
            .trim_chunks(&ordered, ChunkQueueState::can_rebuild_mesh);
        if let Some(cap) = self.max_rebuilds_per_tick {
            rebuild.truncate(cap);
        }
        for chunk in rebuild {
            if let Some(h) = self.rebuild_mesh(chunk)?.into_handle() {
                report.rebuilds += 1;
                report.handles.push(h);
            }
        }

        for chunk in self
            .scheduler
            .trim_chunks(&ordered, ChunkQueueState::can_update_mesh_filter)
        {
            if let Some(h) = self.update_mesh_filter(chunk)?.into_handle() {
                report.filters += 1;
                report.handles.push(h);
            }
        }

        if report.admitted() > 0 {
            tracing::debug!(
                loads = report.loads,
                rebuilds = report.rebuilds,
                filters = report.filters,
                removed = report.removed_queues,
                "terrain tick"
            );
        }
        Ok(report)
    }
}
