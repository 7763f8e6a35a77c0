use crate::chunk::{ChunkIndex, DigOrigin, SynchronizedChunkSet};

/// The terrain data the jobs operate on.
///
/// The scheduler guarantees that no two calls touching the same chunk run at
/// the same time, and that `save_all` runs alone. Implementations can
/// therefore use per-chunk state without their own locking discipline beyond
/// what `Sync` requires.
pub trait TerrainBackend: Send + Sync + 'static {
    /// Load or generate the point data of `chunk`.
    fn load_points(&self, chunk: ChunkIndex);

    /// Rebuild the mesh of `chunk` from its point data.
    fn rebuild_mesh(&self, chunk: ChunkIndex);

    /// Refresh the derived mesh filter of `chunk`. `sync` lists the chunks
    /// whose refresh must be presented in the same frame as this one.
    fn update_mesh_filter(&self, chunk: ChunkIndex, sync: &SynchronizedChunkSet);

    /// Carve a circle out of every chunk in `chunks`.
    fn dig_circle(&self, origin: DigOrigin, radius: f32, chunks: &[ChunkIndex]);

    /// Persist the whole grid. Runs with no chunk job in flight.
    fn save_all(&self);
}
