//! Fixed-size square blocks of tiles, the unit of generation and caching.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::biomes::{Biome, BiomeClassifier};
use crate::config::WorldConfig;
use crate::error::StorageError;
use crate::noise_field::NoiseField;
use crate::tilemap::Tilemap;
use crate::world::coords::{ChunkPos, TilePos};
use crate::world::entities::EntityKind;
use crate::world::tile::Tile;

/// S×S tiles plus the derived indices World and agents query.
#[derive(Clone, Debug)]
pub struct Chunk {
    pos: ChunkPos,
    size: usize,
    tiles: Tilemap<Tile>,
    /// Biome -> global coordinates of every tile with that biome
    biome_index: BTreeMap<Biome, BTreeSet<TilePos>>,
    /// Live entities per kind standing in this chunk, for spawn caps
    entity_counts: HashMap<EntityKind, usize>,
}

impl Chunk {
    /// Generate a chunk by sampling noise at every tile.
    pub fn generate(
        pos: ChunkPos,
        noise: &NoiseField,
        classifier: &BiomeClassifier,
        config: &WorldConfig,
    ) -> Self {
        let size = config.chunk_size;
        let tiles = Tilemap::from_fn(size, size, |lx, ly| {
            let tile_pos = pos.tile_at(lx, ly, size);
            let biome = classifier.classify(noise.tile_noise(tile_pos.x, tile_pos.y));
            Tile::new(tile_pos, biome, config)
        });
        Self::from_tiles(pos, size, tiles)
    }

    /// Build a chunk from explicit biomes, given row by row (`biomes[y][x]`).
    /// Missing cells become `Unknown`.
    pub fn from_biomes(pos: ChunkPos, biomes: &[Vec<Biome>], config: &WorldConfig) -> Self {
        let size = config.chunk_size;
        let tiles = Tilemap::from_fn(size, size, |lx, ly| {
            let biome = biomes
                .get(ly)
                .and_then(|row| row.get(lx))
                .copied()
                .unwrap_or(Biome::Unknown);
            Tile::new(pos.tile_at(lx, ly, size), biome, config)
        });
        Self::from_tiles(pos, size, tiles)
    }

    fn from_tiles(pos: ChunkPos, size: usize, tiles: Tilemap<Tile>) -> Self {
        let mut biome_index: BTreeMap<Biome, BTreeSet<TilePos>> = BTreeMap::new();
        for (_, _, tile) in tiles.iter() {
            biome_index.entry(tile.biome).or_default().insert(tile.pos);
        }
        Self {
            pos,
            size,
            tiles,
            biome_index,
            entity_counts: HashMap::new(),
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Tile at a local offset, both in `[0, S)`.
    pub fn local_tile(&self, lx: usize, ly: usize) -> &Tile {
        self.tiles.get(lx, ly)
    }

    pub fn local_tile_mut(&mut self, lx: usize, ly: usize) -> &mut Tile {
        self.tiles.get_mut(lx, ly)
    }

    /// Tile at a global coordinate, if it belongs to this chunk.
    pub fn tile(&self, pos: TilePos) -> Option<&Tile> {
        if pos.chunk(self.size) != self.pos {
            return None;
        }
        let (lx, ly) = pos.local(self.size);
        Some(self.tiles.get(lx, ly))
    }

    pub fn tile_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        if pos.chunk(self.size) != self.pos {
            return None;
        }
        let (lx, ly) = pos.local(self.size);
        Some(self.tiles.get_mut(lx, ly))
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().map(|(_, _, tile)| tile)
    }

    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut().map(|(_, _, tile)| tile)
    }

    pub fn biome_index(&self) -> &BTreeMap<Biome, BTreeSet<TilePos>> {
        &self.biome_index
    }

    /// Tiles of one biome in this chunk (possibly none).
    pub fn biome_tiles(&self, biome: Biome) -> impl Iterator<Item = &TilePos> {
        self.biome_index.get(&biome).into_iter().flatten()
    }

    pub fn has_biome(&self, biome: Biome) -> bool {
        self.biome_index.get(&biome).is_some_and(|set| !set.is_empty())
    }

    /// Overwrite a tile's biome, keeping the index and resource in step.
    pub fn set_biome(&mut self, pos: TilePos, biome: Biome, config: &WorldConfig) -> bool {
        let Some(tile) = self.tile_mut(pos) else {
            return false;
        };
        let old = tile.biome;
        let fresh = Tile::new(pos, biome, config);
        tile.biome = biome;
        tile.resource = fresh.resource;

        if let Some(set) = self.biome_index.get_mut(&old) {
            set.remove(&pos);
            if set.is_empty() {
                self.biome_index.remove(&old);
            }
        }
        self.biome_index.entry(biome).or_default().insert(pos);
        true
    }

    pub fn entity_count(&self, kind: EntityKind) -> usize {
        self.entity_counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn add_entity_count(&mut self, kind: EntityKind) {
        *self.entity_counts.entry(kind).or_insert(0) += 1;
    }

    pub fn remove_entity_count(&mut self, kind: EntityKind) {
        if let Some(count) = self.entity_counts.get_mut(&kind) {
            *count = count.saturating_sub(1);
        }
    }

    pub fn clear_entity_counts(&mut self) {
        self.entity_counts.clear();
    }

    /// Biome labels row by row, the shape stored in records.
    pub fn biome_rows(&self) -> Vec<Vec<Biome>> {
        (0..self.size)
            .map(|ly| (0..self.size).map(|lx| self.tiles.get(lx, ly).biome).collect())
            .collect()
    }

    /// Plain record for persistence.
    pub fn to_record(&self) -> ChunkRecord {
        ChunkRecord {
            coordinates: (self.pos.x, self.pos.y),
            tiles: self.biome_rows(),
            biome_index: self
                .biome_index
                .iter()
                .map(|(biome, set)| (*biome, set.iter().map(|p| (p.x, p.y)).collect()))
                .collect(),
        }
    }

    /// Rebuild a chunk from a record. Tile resources start fresh and the
    /// biome index is recomputed from the tile biomes, which are authoritative.
    pub fn from_record(record: &ChunkRecord, config: &WorldConfig) -> Result<Self, StorageError> {
        let pos = ChunkPos::new(record.coordinates.0, record.coordinates.1);
        let size = config.chunk_size;
        let rows_ok = record.tiles.len() == size && record.tiles.iter().all(|row| row.len() == size);
        if !rows_ok {
            let found = record
                .tiles
                .iter()
                .map(Vec::len)
                .find(|&len| len != size)
                .unwrap_or(record.tiles.len());
            return Err(StorageError::SizeMismatch { key: pos.key(), expected: size, found });
        }
        Ok(Self::from_biomes(pos, &record.tiles, config))
    }
}

/// Persistence shape: `{coordinates, tiles, biome_index}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub coordinates: (i32, i32),
    /// Biome labels, `tiles[y][x]`
    pub tiles: Vec<Vec<Biome>>,
    pub biome_index: BTreeMap<Biome, Vec<(i32, i32)>>,
}
