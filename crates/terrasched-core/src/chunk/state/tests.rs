//! Tests for the per-chunk pipeline gate.

use super::ChunkQueueState;
use crate::chunk::{ChunkIndex, DigOrigin, SynchronizedChunkSet};

fn sync_of(chunks: &[(i32, i32)]) -> SynchronizedChunkSet {
    chunks.iter().map(|&c| ChunkIndex::from(c)).collect()
}

#[test]
fn load_points_gate_and_completion() {
    let state = ChunkQueueState::new();
    assert!(state.can_load_points());
    assert!(state.needs_points());
    assert!(!state.can_rebuild_mesh());

    state.reserve_load_points();
    assert!(!state.can_load_points());
    assert!(!state.needs_points());
    assert!(!state.points_loaded());
    // New point data implies a rebuild.
    assert!(state.rebuild_required());

    state.unreserve_load_points();
    assert!(state.can_load_points());
    assert!(state.points_loaded());
    assert!(!state.needs_points());
}

#[test]
fn rebuild_requires_dirty_flag() {
    let state = ChunkQueueState::new();
    assert!(!state.can_rebuild_mesh());
    state.request_rebuild(&SynchronizedChunkSet::new());
    assert!(state.can_rebuild_mesh());
}

#[test]
fn rebuild_hands_off_to_mesh_filter() {
    let state = ChunkQueueState::new();
    state.request_rebuild(&sync_of(&[(0, 0), (1, 0)]));
    assert!(!state.can_update_mesh_filter());

    state.reserve_rebuild_mesh();
    assert!(!state.can_rebuild_mesh());
    assert!(!state.rebuild_required());
    assert!(state.filter_required());
    // Filter refresh is admissible as soon as the rebuild is reserved; queue
    // order keeps it behind the rebuild.
    assert!(state.can_update_mesh_filter());

    state.unreserve_rebuild_mesh();
    let sync = state.reserve_update_mesh_filter();
    assert_eq!(sync, sync_of(&[(0, 0), (1, 0)]));
    assert!(!state.can_update_mesh_filter());
    state.unreserve_update_mesh_filter();
    assert!(!state.can_update_mesh_filter());
    assert!(state.is_quiescent());
}

#[test]
fn three_edits_coalesce_into_one_rebuild() {
    let state = ChunkQueueState::new();
    let sync = sync_of(&[(0, 0)]);
    for i in 0..3 {
        let origin = DigOrigin::new(i * 4, 0);
        assert!(state.can_dig_circle(origin, 2.0));
        state.reserve_dig_circle(origin, 2.0, &sync);
    }

    let mut rebuilds = 0;
    while state.can_rebuild_mesh() {
        state.reserve_rebuild_mesh();
        rebuilds += 1;
    }
    assert_eq!(rebuilds, 1);
}

#[test]
fn edit_during_rebuild_requests_another() {
    let state = ChunkQueueState::new();
    state.request_rebuild(&SynchronizedChunkSet::new());
    state.reserve_rebuild_mesh();

    state.reserve_dig_circle(DigOrigin::new(5, 5), 1.0, &SynchronizedChunkSet::new());
    assert!(!state.can_rebuild_mesh(), "rebuild still in progress");
    state.unreserve_rebuild_mesh();
    assert!(state.can_rebuild_mesh());
}

#[test]
fn larger_dig_supersedes_smaller() {
    let state = ChunkQueueState::new();
    let origin = DigOrigin::new(10, 10);
    let none = SynchronizedChunkSet::new();

    state.reserve_dig_circle(origin, 2.0, &none);
    assert!(!state.can_dig_circle(origin, 2.0));
    assert!(!state.can_dig_circle(origin, 1.5));
    assert!(state.can_dig_circle(origin, 2.5));
    // Other origins are independent.
    assert!(state.can_dig_circle(DigOrigin::new(11, 10), 0.5));

    state.reserve_dig_circle(origin, 2.5, &none);
    assert_eq!(state.dig_in_flight(origin), Some(2.5));
}

#[test]
fn stale_dig_unreserve_is_noop() {
    let state = ChunkQueueState::new();
    let origin = DigOrigin::new(0, 0);
    let none = SynchronizedChunkSet::new();

    state.reserve_dig_circle(origin, 1.0, &none);
    state.reserve_dig_circle(origin, 3.0, &none);

    // The superseded job finishes first.
    state.unreserve_dig_circle(origin, 1.0);
    assert_eq!(state.dig_in_flight(origin), Some(3.0));
    assert!(!state.can_dig_circle(origin, 3.0));

    state.unreserve_dig_circle(origin, 3.0);
    assert_eq!(state.dig_in_flight(origin), None);
    assert!(state.can_dig_circle(origin, 1.0));
}

#[test]
fn non_finite_dig_is_never_admitted() {
    let state = ChunkQueueState::new();
    let origin = DigOrigin::new(4, 4);
    assert!(!state.can_dig_circle(origin, f32::NAN));
    assert!(!state.can_dig_circle(origin, f32::INFINITY));
    assert!(!state.can_dig_circle(origin, -0.5));
    assert!(state.can_dig_circle(origin, 0.0));
    assert_eq!(state.dig_in_flight(origin), None);
}

#[test]
fn dig_sync_set_reaches_filter() {
    let state = ChunkQueueState::new();
    state.reserve_dig_circle(DigOrigin::new(31, 0), 2.0, &sync_of(&[(0, 0), (1, 0)]));
    state.reserve_dig_circle(DigOrigin::new(0, 31), 2.0, &sync_of(&[(0, 0), (0, 1)]));
    state.reserve_rebuild_mesh();
    let sync = state.reserve_update_mesh_filter();
    assert_eq!(sync, sync_of(&[(0, 0), (0, 1), (1, 0)]));
}
