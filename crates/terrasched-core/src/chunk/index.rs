//! Chunk and edit-origin coordinates on the 2D chunk grid.

use serde::{Deserialize, Serialize};

/// Index of a chunk on the 2D grid. Chunk `(x, y)` covers world cells
/// `[x * size, (x + 1) * size)` on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkIndex {
    pub x: i32,
    pub y: i32,
}

impl ChunkIndex {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing the world cell `(wx, wy)`.
    pub fn containing(wx: i32, wy: i32, chunk_size: u32) -> Self {
        let size = chunk_size.max(1) as i32;
        Self {
            x: wx.div_euclid(size),
            y: wy.div_euclid(size),
        }
    }

    /// Chebyshev (max-axis) distance in chunks.
    pub fn chebyshev_distance(self, other: ChunkIndex) -> u64 {
        let dx = (i64::from(self.x) - i64::from(other.x)).unsigned_abs();
        let dy = (i64::from(self.y) - i64::from(other.y)).unsigned_abs();
        dx.max(dy)
    }

    /// Squared Euclidean distance in chunks. Kept squared so ordering stays integral.
    pub fn euclidean_distance_sq(self, other: ChunkIndex) -> u64 {
        let dx = (i64::from(self.x) - i64::from(other.x)).unsigned_abs();
        let dy = (i64::from(self.y) - i64::from(other.y)).unsigned_abs();
        dx * dx + dy * dy
    }

    /// Every chunk whose area intersects the circle of `radius` cells around `origin`.
    /// A non-finite radius covers nothing. Callers bound the radius; the
    /// result grows with its square.
    ///
    /// Result is sorted so multi-chunk admissions always visit queues in the same order.
    pub fn covering_circle(origin: DigOrigin, radius: f32, chunk_size: u32) -> Vec<ChunkIndex> {
        if !radius.is_finite() {
            return Vec::new();
        }
        let size = i64::from(chunk_size.max(1));
        let r = f64::from(radius.max(0.0));
        let reach = r.ceil() as i64;
        let (ox, oy) = (i64::from(origin.x), i64::from(origin.y));
        let to_chunk = |w: i64| w.div_euclid(size).clamp(i64::from(i32::MIN), i64::from(i32::MAX));
        let (min_x, max_x) = (to_chunk(ox - reach), to_chunk(ox + reach));
        let (min_y, max_y) = (to_chunk(oy - reach), to_chunk(oy + reach));

        let (fx, fy) = (ox as f64, oy as f64);
        let mut out = Vec::new();
        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                // Closest point of the chunk rectangle to the circle centre.
                let x0 = (cx * size) as f64;
                let y0 = (cy * size) as f64;
                let nx = fx.clamp(x0, x0 + (size - 1) as f64);
                let ny = fy.clamp(y0, y0 + (size - 1) as f64);
                let (dx, dy) = (nx - fx, ny - fy);
                if dx * dx + dy * dy <= r * r {
                    out.push(ChunkIndex::new(cx as i32, cy as i32));
                }
            }
        }
        out.sort();
        out
    }
}

impl From<(i32, i32)> for ChunkIndex {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for ChunkIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// World-cell coordinate a terrain edit is centred on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DigOrigin {
    pub x: i32,
    pub y: i32,
}

impl DigOrigin {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_floors_negative_cells() {
        assert_eq!(ChunkIndex::containing(0, 0, 32), ChunkIndex::new(0, 0));
        assert_eq!(ChunkIndex::containing(31, 31, 32), ChunkIndex::new(0, 0));
        assert_eq!(ChunkIndex::containing(32, -1, 32), ChunkIndex::new(1, -1));
        assert_eq!(ChunkIndex::containing(-33, 64, 32), ChunkIndex::new(-2, 2));
    }

    #[test]
    fn distances() {
        let a = ChunkIndex::new(0, 0);
        let b = ChunkIndex::new(3, -4);
        assert_eq!(a.chebyshev_distance(b), 4);
        assert_eq!(a.euclidean_distance_sq(b), 25);
        assert_eq!(b.chebyshev_distance(b), 0);
    }

    #[test]
    fn small_circle_stays_in_one_chunk() {
        let chunks = ChunkIndex::covering_circle(DigOrigin::new(16, 16), 3.0, 32);
        assert_eq!(chunks, vec![ChunkIndex::new(0, 0)]);
    }

    #[test]
    fn circle_on_corner_touches_four_chunks() {
        let chunks = ChunkIndex::covering_circle(DigOrigin::new(32, 32), 2.0, 32);
        assert_eq!(
            chunks,
            vec![
                ChunkIndex::new(0, 0),
                ChunkIndex::new(0, 1),
                ChunkIndex::new(1, 0),
                ChunkIndex::new(1, 1),
            ]
        );
    }

    #[test]
    fn circle_at_world_edge_does_not_overflow() {
        let chunks = ChunkIndex::covering_circle(DigOrigin::new(i32::MIN + 1, 0), 10.0, 32);
        let edge = ChunkIndex::containing(i32::MIN, 0, 32);
        assert!(chunks.contains(&edge));
        assert!(chunks.contains(&ChunkIndex::new(edge.x - 1, 0)));

        let chunks = ChunkIndex::covering_circle(DigOrigin::new(i32::MAX, i32::MAX), 4.0, 1);
        assert!(chunks.contains(&ChunkIndex::new(i32::MAX, i32::MAX)));
    }

    #[test]
    fn non_finite_radius_covers_nothing() {
        let origin = DigOrigin::new(5, 5);
        assert!(ChunkIndex::covering_circle(origin, f32::NAN, 32).is_empty());
        assert!(ChunkIndex::covering_circle(origin, f32::INFINITY, 32).is_empty());
    }

    #[test]
    fn circle_near_edge_skips_diagonal_chunk() {
        // Reaches across the x edge only; the diagonal chunks are farther than the radius.
        let chunks = ChunkIndex::covering_circle(DigOrigin::new(30, 16), 4.0, 32);
        assert_eq!(chunks, vec![ChunkIndex::new(0, 0), ChunkIndex::new(1, 0)]);
    }
}
