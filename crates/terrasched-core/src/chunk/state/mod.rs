//! Per-chunk pipeline gate.
//!
//! Each chunk runs a small pipeline: LoadPoints -> RebuildMesh ->
//! UpdateMeshFilter, plus DigCircle edits that feed RebuildMesh at any time.
//! The gate answers "may another job of this kind be admitted for this chunk
//! right now" and coalesces repeated requests of the same kind:
//!
//! ```text
//! Idle -> LoadingPoints -> Idle(+meshDirty) -> RebuildingMesh
//!      -> Idle(+filterDirty) -> UpdatingFilter -> Idle
//! ```
//!
//! The `can_*` predicates and `reserve_*` calls are made by the scheduler
//! while it holds its queue-table lock, so a predicate and the matching
//! reservation are atomic with respect to other admissions. The stage flags
//! still sit behind their own lock because the terrain loop also reads them
//! directly, and the dig map has a separate, narrower lock.

mod dig;

use parking_lot::Mutex;

use super::{DigOrigin, SynchronizedChunkSet};
use dig::DigTracker;

#[derive(Debug, Default)]
struct StageFlags {
    load_in_progress: bool,
    load_completed: bool,
    rebuild_in_progress: bool,
    rebuild_required: bool,
    rebuild_sync: SynchronizedChunkSet,
    filter_in_progress: bool,
    filter_required: bool,
    filter_sync: SynchronizedChunkSet,
}

/// Admission gate and coalescing state for one chunk.
#[derive(Debug, Default)]
pub struct ChunkQueueState {
    stages: Mutex<StageFlags>,
    digs: DigTracker,
}

impl ChunkQueueState {
    pub fn new() -> Self {
        Self::default()
    }

    // LoadPoints

    pub fn can_load_points(&self) -> bool {
        !self.stages.lock().load_in_progress
    }

    /// Mark loading in progress. Fresh point data always needs a rebuild.
    pub fn reserve_load_points(&self) {
        let mut s = self.stages.lock();
        s.load_in_progress = true;
        s.rebuild_required = true;
    }

    pub fn unreserve_load_points(&self) {
        let mut s = self.stages.lock();
        s.load_in_progress = false;
        s.load_completed = true;
    }

    /// True once a LoadPoints job has finished for this chunk.
    pub fn points_loaded(&self) -> bool {
        self.stages.lock().load_completed
    }

    /// Points have never been loaded and no load is queued.
    pub fn needs_points(&self) -> bool {
        let s = self.stages.lock();
        !s.load_completed && !s.load_in_progress
    }

    // RebuildMesh

    pub fn can_rebuild_mesh(&self) -> bool {
        let s = self.stages.lock();
        !s.rebuild_in_progress && s.rebuild_required
    }

    /// Hand the pending rebuild requirement (and its synchronized chunks) over
    /// to the mesh-filter stage and clear it here.
    pub fn reserve_rebuild_mesh(&self) {
        let mut s = self.stages.lock();
        s.rebuild_in_progress = true;
        if s.rebuild_required {
            s.filter_required = true;
        }
        let sync = s.rebuild_sync.take();
        s.filter_sync.merge(&sync);
        s.rebuild_required = false;
    }

    pub fn unreserve_rebuild_mesh(&self) {
        self.stages.lock().rebuild_in_progress = false;
    }

    /// Flag a rebuild as required, carrying `sync` along to the filter stage.
    pub fn request_rebuild(&self, sync: &SynchronizedChunkSet) {
        let mut s = self.stages.lock();
        s.rebuild_required = true;
        s.rebuild_sync.merge(sync);
    }

    pub fn rebuild_required(&self) -> bool {
        self.stages.lock().rebuild_required
    }

    // UpdateMeshFilter

    pub fn can_update_mesh_filter(&self) -> bool {
        let s = self.stages.lock();
        !s.filter_in_progress && s.filter_required
    }

    /// Reserve the filter refresh and return the chunks it must be
    /// synchronized with.
    pub fn reserve_update_mesh_filter(&self) -> SynchronizedChunkSet {
        let mut s = self.stages.lock();
        s.filter_in_progress = true;
        s.filter_required = false;
        s.filter_sync.take()
    }

    pub fn unreserve_update_mesh_filter(&self) {
        self.stages.lock().filter_in_progress = false;
    }

    pub fn filter_required(&self) -> bool {
        self.stages.lock().filter_required
    }

    // DigCircle

    /// True if no dig is in flight at `origin` or `radius` is strictly
    /// larger than the one in flight. Negative and non-finite radii never pass.
    pub fn can_dig_circle(&self, origin: DigOrigin, radius: f32) -> bool {
        self.digs.can_admit(origin, radius)
    }

    /// Record the dig at `origin` and flag the mesh for rebuild.
    pub fn reserve_dig_circle(&self, origin: DigOrigin, radius: f32, sync: &SynchronizedChunkSet) {
        self.digs.reserve(origin, radius);
        self.request_rebuild(sync);
    }

    /// Clear the in-flight dig at `origin` if it is still the one with
    /// `radius`. A larger dig that superseded it keeps its entry.
    pub fn unreserve_dig_circle(&self, origin: DigOrigin, radius: f32) {
        self.digs.unreserve(origin, radius);
    }

    /// Largest radius in flight at `origin`, if any.
    pub fn dig_in_flight(&self, origin: DigOrigin) -> Option<f32> {
        self.digs.in_flight(origin)
    }

    /// Nothing of any kind is reserved on this chunk.
    pub fn is_quiescent(&self) -> bool {
        let s = self.stages.lock();
        !s.load_in_progress
            && !s.rebuild_in_progress
            && !s.filter_in_progress
            && self.digs.is_empty()
    }
}

#[cfg(test)]
mod tests;
