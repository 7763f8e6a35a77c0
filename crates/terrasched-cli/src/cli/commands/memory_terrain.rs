//! In-memory terrain used by `terrasched simulate`.
//!
//! Each chunk is a square of solid/empty cells. Digs clear cells, rebuilds
//! count the solid ones, saves total what is left.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use terrasched_core::terrain::TerrainBackend;
use terrasched_core::{ChunkIndex, DigOrigin, SynchronizedChunkSet};

#[derive(Debug, Default)]
struct ChunkData {
    solid: Vec<bool>,
    mesh_cells: usize,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct TerrainSummary {
    pub chunks_loaded: u64,
    pub meshes_built: u64,
    /// Solid cells covered by the current meshes.
    pub mesh_cells: u64,
    pub filters_updated: u64,
    /// Filter refreshes that carried a synchronized chunk set.
    pub synchronized_filters: u64,
    pub digs: u64,
    pub cells_dug: u64,
    pub saves: u64,
    /// Solid cells seen by the last save.
    pub saved_solid_cells: u64,
}

pub struct MemoryTerrain {
    chunk_size: u32,
    chunks: Mutex<HashMap<ChunkIndex, ChunkData>>,
    loads: AtomicU64,
    meshes: AtomicU64,
    filters: AtomicU64,
    synchronized: AtomicU64,
    digs: AtomicU64,
    cells_dug: AtomicU64,
    saves: AtomicU64,
    saved_solid: AtomicU64,
}

impl MemoryTerrain {
    pub fn new(chunk_size: u32) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunks: Mutex::new(HashMap::new()),
            loads: AtomicU64::new(0),
            meshes: AtomicU64::new(0),
            filters: AtomicU64::new(0),
            synchronized: AtomicU64::new(0),
            digs: AtomicU64::new(0),
            cells_dug: AtomicU64::new(0),
            saves: AtomicU64::new(0),
            saved_solid: AtomicU64::new(0),
        }
    }

    pub fn summary(&self) -> TerrainSummary {
        TerrainSummary {
            chunks_loaded: self.loads.load(Ordering::Relaxed),
            meshes_built: self.meshes.load(Ordering::Relaxed),
            mesh_cells: self.chunks.lock().values().map(|d| d.mesh_cells as u64).sum(),
            filters_updated: self.filters.load(Ordering::Relaxed),
            synchronized_filters: self.synchronized.load(Ordering::Relaxed),
            digs: self.digs.load(Ordering::Relaxed),
            cells_dug: self.cells_dug.load(Ordering::Relaxed),
            saves: self.saves.load(Ordering::Relaxed),
            saved_solid_cells: self.saved_solid.load(Ordering::Relaxed),
        }
    }

    fn cells(&self) -> usize {
        (self.chunk_size as usize).pow(2)
    }
}

impl TerrainBackend for MemoryTerrain {
    fn load_points(&self, chunk: ChunkIndex) {
        let cells = self.cells();
        self.chunks.lock().entry(chunk).or_default().solid = vec![true; cells];
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    fn rebuild_mesh(&self, chunk: ChunkIndex) {
        if let Some(data) = self.chunks.lock().get_mut(&chunk) {
            data.mesh_cells = data.solid.iter().filter(|&&s| s).count();
        }
        self.meshes.fetch_add(1, Ordering::Relaxed);
    }

    fn update_mesh_filter(&self, chunk: ChunkIndex, sync: &SynchronizedChunkSet) {
        tracing::trace!(%chunk, synchronized = sync.len(), "mesh filter refreshed");
        self.filters.fetch_add(1, Ordering::Relaxed);
        if !sync.is_empty() {
            self.synchronized.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn dig_circle(&self, origin: DigOrigin, radius: f32, chunks: &[ChunkIndex]) {
        let size = self.chunk_size as i32;
        let r2 = radius * radius;
        let mut dug = 0u64;
        let mut map = self.chunks.lock();
        for chunk in chunks {
            // Not loaded yet: the load will overwrite it anyway.
            let Some(data) = map.get_mut(chunk) else {
                continue;
            };
            for (i, cell) in data.solid.iter_mut().enumerate() {
                let wx = chunk.x * size + (i as i32 % size);
                let wy = chunk.y * size + (i as i32 / size);
                let (dx, dy) = ((wx - origin.x) as f32, (wy - origin.y) as f32);
                if *cell && dx * dx + dy * dy <= r2 {
                    *cell = false;
                    dug += 1;
                }
            }
        }
        drop(map);
        self.digs.fetch_add(1, Ordering::Relaxed);
        self.cells_dug.fetch_add(dug, Ordering::Relaxed);
    }

    fn save_all(&self) {
        let solid: usize = self
            .chunks
            .lock()
            .values()
            .map(|d| d.solid.iter().filter(|&&s| s).count())
            .sum();
        self.saves.fetch_add(1, Ordering::Relaxed);
        self.saved_solid.store(solid as u64, Ordering::Relaxed);
    }
}
