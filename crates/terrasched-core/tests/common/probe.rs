//! Exclusion probe: records every overlap between jobs that must never run
//! together, plus a terrain backend that reports through it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use terrasched_core::terrain::TerrainBackend;
use terrasched_core::{ChunkIndex, DigOrigin, SynchronizedChunkSet};

#[derive(Default)]
pub struct ExclusionProbe {
    in_use: Mutex<HashSet<ChunkIndex>>,
    master_running: AtomicBool,
    violations: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ExclusionProbe {
    pub fn enter(&self, chunks: &[ChunkIndex]) {
        {
            let mut in_use = self.in_use.lock();
            if self.master_running.load(Ordering::SeqCst) {
                self.violations.fetch_add(1, Ordering::SeqCst);
            }
            for &chunk in chunks {
                if !in_use.insert(chunk) {
                    self.violations.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self, chunks: &[ChunkIndex]) {
        self.running.fetch_sub(1, Ordering::SeqCst);
        let mut in_use = self.in_use.lock();
        for chunk in chunks {
            in_use.remove(chunk);
        }
    }

    /// Hold `chunks` for a short while, flagging any overlap.
    pub fn hold(&self, chunks: &[ChunkIndex]) {
        self.enter(chunks);
        thread::sleep(Duration::from_micros(300));
        self.exit(chunks);
    }

    pub fn hold_master(&self) {
        {
            let in_use = self.in_use.lock();
            if !in_use.is_empty() || self.master_running.swap(true, Ordering::SeqCst) {
                self.violations.fetch_add(1, Ordering::SeqCst);
            }
        }
        thread::sleep(Duration::from_millis(1));
        self.master_running.store(false, Ordering::SeqCst);
    }

    pub fn violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    /// Most jobs ever seen running at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Terrain backend that checks exclusion and counts calls per chunk.
#[derive(Default)]
pub struct ProbeBackend {
    pub probe: ExclusionProbe,
    loads: Mutex<HashMap<ChunkIndex, usize>>,
    rebuilds: Mutex<HashMap<ChunkIndex, usize>>,
    filters: Mutex<Vec<(ChunkIndex, Vec<ChunkIndex>)>>,
    digs: AtomicUsize,
    saves: AtomicUsize,
}

impl ProbeBackend {
    pub fn loads_of(&self, chunk: ChunkIndex) -> usize {
        self.loads.lock().get(&chunk).copied().unwrap_or(0)
    }

    pub fn rebuilds_of(&self, chunk: ChunkIndex) -> usize {
        self.rebuilds.lock().get(&chunk).copied().unwrap_or(0)
    }

    pub fn total_rebuilds(&self) -> usize {
        self.rebuilds.lock().values().sum()
    }

    pub fn filters(&self) -> Vec<(ChunkIndex, Vec<ChunkIndex>)> {
        self.filters.lock().clone()
    }

    pub fn digs(&self) -> usize {
        self.digs.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl TerrainBackend for ProbeBackend {
    fn load_points(&self, chunk: ChunkIndex) {
        self.probe.hold(&[chunk]);
        *self.loads.lock().entry(chunk).or_default() += 1;
    }

    fn rebuild_mesh(&self, chunk: ChunkIndex) {
        self.probe.hold(&[chunk]);
        *self.rebuilds.lock().entry(chunk).or_default() += 1;
    }

    fn update_mesh_filter(&self, chunk: ChunkIndex, sync: &SynchronizedChunkSet) {
        self.probe.hold(&[chunk]);
        self.filters.lock().push((chunk, sync.iter().collect()));
    }

    fn dig_circle(&self, _origin: DigOrigin, _radius: f32, chunks: &[ChunkIndex]) {
        self.probe.hold(chunks);
        self.digs.fetch_add(1, Ordering::SeqCst);
    }

    fn save_all(&self) {
        self.probe.hold_master();
        self.saves.fetch_add(1, Ordering::SeqCst);
    }
}
