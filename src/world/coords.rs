//! Coordinate types for the chunked world.
//!
//! Three spaces: real-valued positions (agents move continuously), integer
//! tile coordinates, and chunk coordinates. Tile -> chunk conversion uses
//! floor division so negative coordinates land in the right chunk.

use serde::{Deserialize, Serialize};

/// Continuous world position, in tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// The tile this position falls in.
    pub fn tile(&self) -> TilePos {
        TilePos::new(self.x.floor() as i32, self.y.floor() as i32)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Global integer tile coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing this tile.
    pub fn chunk(&self, chunk_size: usize) -> ChunkPos {
        let s = chunk_size as i32;
        ChunkPos::new(self.x.div_euclid(s), self.y.div_euclid(s))
    }

    /// Offset of this tile inside its chunk, always in `[0, chunk_size)`.
    pub fn local(&self, chunk_size: usize) -> (usize, usize) {
        let s = chunk_size as i32;
        (self.x.rem_euclid(s) as usize, self.y.rem_euclid(s) as usize)
    }

    /// Tile centre as a continuous position.
    pub fn center(&self) -> Position {
        Position::new(self.x as f32 + 0.5, self.y as f32 + 0.5)
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// 4-connected neighbours: left, right, up, down.
    pub fn neighbors(&self) -> [TilePos; 4] {
        [self.offset(-1, 0), self.offset(1, 0), self.offset(0, -1), self.offset(0, 1)]
    }

    pub fn distance(&self, other: TilePos) -> f32 {
        let dx = (other.x - self.x) as f32;
        let dy = (other.y - self.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::fmt::Display for TilePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// Chunk coordinate: tile `(x, y)` lives in chunk `(floor(x/S), floor(y/S))`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
}

impl ChunkPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing a continuous position.
    pub fn from_position(pos: Position, chunk_size: usize) -> Self {
        pos.tile().chunk(chunk_size)
    }

    /// Global coordinate of the tile at a local offset.
    pub fn tile_at(&self, local_x: usize, local_y: usize, chunk_size: usize) -> TilePos {
        let s = chunk_size as i32;
        TilePos::new(self.x * s + local_x as i32, self.y * s + local_y as i32)
    }

    /// Chebyshev distance in chunks.
    pub fn chebyshev(&self, other: ChunkPos) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// All chunk coordinates within `radius` (Chebyshev), row by row.
    pub fn around(&self, radius: i32) -> Vec<ChunkPos> {
        let radius = radius.max(0);
        let mut result = Vec::with_capacity(((2 * radius + 1) * (2 * radius + 1)) as usize);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                result.push(ChunkPos::new(self.x + dx, self.y + dy));
            }
        }
        result
    }

    /// Persistence key, `"{cx}_{cy}"`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.x, self.y)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        // Split on the separator after the first character so "-1_-2" parses
        let split = key.char_indices().skip(1).find(|&(_, c)| c == '_')?.0;
        let x = key[..split].parse().ok()?;
        let y = key[split + 1..].parse().ok()?;
        Some(Self::new(x, y))
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chunk({}, {})", self.x, self.y)
    }
}

/// Inclusive rectangle of chunk coordinates, e.g. a camera viewport or an
/// agent's vision square.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkBounds {
    pub min: ChunkPos,
    pub max: ChunkPos,
}

impl ChunkBounds {
    pub fn new(min: ChunkPos, max: ChunkPos) -> Self {
        Self {
            min: ChunkPos::new(min.x.min(max.x), min.y.min(max.y)),
            max: ChunkPos::new(min.x.max(max.x), min.y.max(max.y)),
        }
    }

    /// Square of chunks within `radius` of `center`.
    pub fn around(center: ChunkPos, radius: i32) -> Self {
        let r = radius.max(0);
        Self::new(
            ChunkPos::new(center.x - r, center.y - r),
            ChunkPos::new(center.x + r, center.y + r),
        )
    }

    /// Chunks covering a rectangle of tiles (e.g. a viewport in tile units).
    pub fn from_tiles(min: TilePos, max: TilePos, chunk_size: usize) -> Self {
        Self::new(min.chunk(chunk_size), max.chunk(chunk_size))
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_tiles_floor_into_chunks() {
        let s = 16;
        assert_eq!(TilePos::new(-1, -1).chunk(s), ChunkPos::new(-1, -1));
        assert_eq!(TilePos::new(-1, -1).local(s), (15, 15));
        assert_eq!(TilePos::new(-16, 0).chunk(s), ChunkPos::new(-1, 0));
        assert_eq!(TilePos::new(-16, 0).local(s), (0, 0));
        assert_eq!(TilePos::new(-17, 33).chunk(s), ChunkPos::new(-2, 2));
        assert_eq!(TilePos::new(-17, 33).local(s), (15, 1));
    }

    #[test]
    fn test_tile_round_trips_through_chunk() {
        let s = 8;
        for x in -20..20 {
            for y in [-9, -8, -1, 0, 7, 8] {
                let tile = TilePos::new(x, y);
                let (lx, ly) = tile.local(s);
                assert!(lx < s && ly < s);
                assert_eq!(tile.chunk(s).tile_at(lx, ly, s), tile);
            }
        }
    }

    #[test]
    fn test_position_floors_to_tile() {
        assert_eq!(Position::new(-0.2, 3.9).tile(), TilePos::new(-1, 3));
        assert_eq!(Position::new(-0.2, 3.9).tile().chunk(16), ChunkPos::new(-1, 0));
    }

    #[test]
    fn test_chunk_key_parsing() {
        for pos in [ChunkPos::new(0, 0), ChunkPos::new(-1, -2), ChunkPos::new(12, -7)] {
            assert_eq!(ChunkPos::from_key(&pos.key()), Some(pos));
        }
        assert_eq!(ChunkPos::from_key("nope"), None);
        assert_eq!(ChunkPos::from_key("3_"), None);
    }

    #[test]
    fn test_around_and_bounds() {
        let c = ChunkPos::new(2, -3);
        let ring = c.around(1);
        assert_eq!(ring.len(), 9);
        assert!(ring.iter().all(|p| p.chebyshev(c) <= 1));

        let bounds = ChunkBounds::around(c, 1);
        assert!(bounds.contains(ChunkPos::new(3, -2)));
        assert!(!bounds.contains(ChunkPos::new(4, -3)));
    }
}
