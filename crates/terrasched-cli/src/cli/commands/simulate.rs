//! `terrasched simulate` – drive the terrain pipeline against an in-memory grid.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use terrasched_core::config::SchedulerConfig;
use terrasched_core::terrain::{TerrainJobs, TickSummary};
use terrasched_core::{ChunkIndex, DigOrigin, Enqueued, JobHandle, JobOutcome, Scheduler, SchedulerStats};

use super::memory_terrain::{MemoryTerrain, TerrainSummary};

/// Upper bound on settle ticks after the scripted ones.
const MAX_SETTLE_TICKS: u32 = 64;

#[derive(Debug, Clone)]
pub struct SimulateArgs {
    pub chunks: u32,
    pub edits: u32,
    pub ticks: u32,
    pub workers: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    chunks: usize,
    ticks: u32,
    settle_ticks: u32,
    edits_admitted: u32,
    edits_refused: u32,
    jobs_panicked: usize,
    elapsed_ms: u128,
    per_tick: Vec<TickSummary>,
    terrain: TerrainSummary,
    scheduler: SchedulerStats,
}

/// Deterministic scatter of edit `i` over a `world` x `world` cell square.
fn edit_origin(i: u32, world: u32) -> DigOrigin {
    let h = i.wrapping_mul(2_654_435_761);
    let x = h % world;
    let y = ((h >> 16) ^ i.wrapping_mul(40_503)) % world;
    DigOrigin::new(x as i32, y as i32)
}

fn edit_radius(i: u32, chunk_size: u32) -> f32 {
    let max = (chunk_size / 4).max(2);
    (2 + i % (max - 1)) as f32
}

/// Edits to issue on `tick` so that `total` spread evenly over `ticks`.
fn edits_for_tick(tick: u32, ticks: u32, total: u32) -> std::ops::Range<u32> {
    let (total, ticks) = (u64::from(total), u64::from(ticks.max(1)));
    let at = |t: u32| (total * u64::from(t) / ticks).min(total) as u32;
    at(tick)..at(tick + 1)
}

/// Side of the simulated world in cells. Must fit the `i32` cell coordinates.
fn world_side(chunks: u32, chunk_size: u32) -> Result<u32> {
    chunks
        .checked_mul(chunk_size)
        .filter(|&w| i32::try_from(w).is_ok())
        .with_context(|| format!("{chunks} chunks of {chunk_size} cells do not fit in i32 world coordinates"))
}

fn wait_all(handles: &[JobHandle]) -> Result<usize> {
    let mut panicked = 0;
    for h in handles {
        if let JobOutcome::Panicked { .. } = h.wait().with_context(|| format!("waiting on job {}", h.id()))? {
            panicked += 1;
        }
    }
    Ok(panicked)
}

pub fn run_simulate(cfg: &SchedulerConfig, args: &SimulateArgs, json: bool) -> Result<()> {
    let mut cfg = cfg.clone();
    if args.workers.is_some() {
        cfg.worker_threads = args.workers;
    }
    let side = args.chunks.max(1);
    let world = world_side(side, cfg.chunk_size.max(1))?;

    let scheduler = Arc::new(Scheduler::new(&cfg)?);
    let backend = Arc::new(MemoryTerrain::new(cfg.chunk_size));
    let terrain = TerrainJobs::new(Arc::clone(&scheduler), Arc::clone(&backend), &cfg);

    let active: HashSet<ChunkIndex> = (0..side as i32)
        .flat_map(|x| (0..side as i32).map(move |y| ChunkIndex::new(x, y)))
        .collect();
    let centre = ChunkIndex::new(side as i32 / 2, side as i32 / 2);
    scheduler.set_priority_chunks(vec![centre]);
    tracing::info!(chunks = active.len(), edits = args.edits, ticks = args.ticks, "simulation starting");

    let started = Instant::now();
    let mut handles = Vec::new();
    let mut per_tick = Vec::new();
    let (mut edits_admitted, mut edits_refused) = (0u32, 0u32);

    for tick in 0..args.ticks {
        let report = terrain.tick(&active)?;
        per_tick.push(report.summary());
        handles.extend(report.handles);

        for i in edits_for_tick(tick, args.ticks, args.edits) {
            let origin = edit_origin(i, world);
            match terrain.dig_circle(origin, edit_radius(i, cfg.chunk_size))? {
                Enqueued::Admitted(h) => {
                    edits_admitted += 1;
                    handles.push(h);
                }
                Enqueued::Refused => edits_refused += 1,
            }
        }
    }
    let mut jobs_panicked = wait_all(&handles)?;

    // Let the pipeline catch up with the last edits.
    let mut settle_ticks = 0;
    while settle_ticks < MAX_SETTLE_TICKS {
        let report = terrain.tick(&active)?;
        if report.admitted() == 0 {
            break;
        }
        settle_ticks += 1;
        per_tick.push(report.summary());
        jobs_panicked += wait_all(&report.handles)?;
    }

    if let Some(save) = terrain.save_all()?.into_handle() {
        jobs_panicked += wait_all(std::slice::from_ref(&save))?;
    }
    let elapsed_ms = started.elapsed().as_millis();
    scheduler.shutdown();

    let report = SimulationReport {
        chunks: active.len(),
        ticks: args.ticks,
        settle_ticks,
        edits_admitted,
        edits_refused,
        jobs_panicked,
        elapsed_ms,
        per_tick,
        terrain: backend.summary(),
        scheduler: scheduler.stats(),
    };
    tracing::info!(elapsed_ms, settle_ticks, "simulation finished");

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_human(&report);
    }
    Ok(())
}

fn print_human(r: &SimulationReport) {
    println!(
        "{} chunks, {} ticks (+{} settle) in {} ms",
        r.chunks, r.ticks, r.settle_ticks, r.elapsed_ms
    );
    println!(
        "edits:     {} admitted, {} refused",
        r.edits_admitted, r.edits_refused
    );
    let t = &r.terrain;
    println!(
        "terrain:   {} loads, {} meshes, {} filters ({} synchronized), {} cells dug, {} saves",
        t.chunks_loaded, t.meshes_built, t.filters_updated, t.synchronized_filters, t.cells_dug, t.saves
    );
    let s = &r.scheduler;
    println!(
        "scheduler: {} workers, {} admitted, {} refused, {} executed, {} skipped, {} panicked",
        s.workers, s.admitted, s.refused, s.executed, s.skipped, s.panicked
    );
    println!(
        "queues:    {} live, {} removed",
        s.live_chunk_queues, s.queues_removed
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_spread_over_ticks_without_gaps() {
        let ranges: Vec<_> = (0..4).map(|t| edits_for_tick(t, 4, 10)).collect();
        assert_eq!(ranges.first().map(|r| r.start), Some(0));
        assert_eq!(ranges.last().map(|r| r.end), Some(10));
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn edits_spread_without_overflow_at_large_counts() {
        let ticks = 1_000;
        let ranges: Vec<_> = (0..ticks).map(|t| edits_for_tick(t, ticks, u32::MAX)).collect();
        assert_eq!(ranges.first().map(|r| r.start), Some(0));
        assert_eq!(ranges.last().map(|r| r.end), Some(u32::MAX));
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn world_side_rejects_oversized_grids() {
        assert_eq!(world_side(8, 32).unwrap(), 256);
        assert!(world_side(u32::MAX, 2).is_err());
        assert!(world_side(1 << 16, 1 << 16).is_err());
        let err = world_side(70_000, 70_000).unwrap_err();
        assert!(err.to_string().contains("do not fit"), "{err}");
    }

    #[test]
    fn oversized_simulation_fails_before_starting() {
        let cfg = SchedulerConfig {
            chunk_size: u32::MAX,
            ..SchedulerConfig::default()
        };
        let args = SimulateArgs {
            chunks: 2,
            edits: 1,
            ticks: 1,
            workers: Some(1),
        };
        assert!(run_simulate(&cfg, &args, true).is_err());
    }

    #[test]
    fn edit_origins_stay_in_world() {
        for i in 0..500 {
            let o = edit_origin(i, 96);
            assert!((0..96).contains(&o.x) && (0..96).contains(&o.y));
        }
    }

    #[test]
    fn edit_radius_is_bounded() {
        for i in 0..50 {
            let r = edit_radius(i, 32);
            assert!((2.0..=8.0).contains(&r));
        }
    }

    #[test]
    fn small_simulation_completes() {
        let cfg = SchedulerConfig {
            chunk_size: 8,
            ..SchedulerConfig::default()
        };
        let args = SimulateArgs {
            chunks: 2,
            edits: 12,
            ticks: 3,
            workers: Some(2),
        };
        run_simulate(&cfg, &args, true).unwrap();
    }
}
