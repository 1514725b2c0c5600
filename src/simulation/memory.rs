//! Per-agent spatial memory.
//!
//! An agent only knows what it has seen: chunks enter memory when observed,
//! and with them the tile locations of every biome they contain. Memory only
//! grows. Entries can go stale (a lake filled in, berries picked clean); that
//! shows up as `find_resource` skipping them, never as an error.

use std::collections::{HashMap, HashSet};

use crate::biomes::Biome;
use crate::world::tile::resource_capacity;
use crate::world::{Chunk, ChunkPos, EntityId, Position, TilePos, World};

/// Most remembered tiles examined per lookup, nearest first.
const MAX_RESOURCE_CANDIDATES: usize = 256;

/// A remembered resource and the tile to stand on while using it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceSite {
    pub resource: TilePos,
    pub access: TilePos,
}

#[derive(Clone, Debug, Default)]
pub struct SpatialMemory {
    discovered: HashSet<ChunkPos>,
    resources: HashMap<Biome, HashSet<TilePos>>,
}

impl SpatialMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed chunk and every biome-tagged tile in it. Returns
    /// false if the chunk was already known.
    pub fn memorize_chunk(&mut self, chunk: &Chunk) -> bool {
        if !self.discovered.insert(chunk.pos()) {
            return false;
        }
        for (biome, tiles) in chunk.biome_index() {
            self.resources.entry(*biome).or_default().extend(tiles.iter().copied());
        }
        true
    }

    /// Record a single observed tile.
    pub fn memorize_tile(&mut self, pos: TilePos, biome: Biome) {
        self.resources.entry(biome).or_default().insert(pos);
    }

    pub fn has_discovered(&self, pos: ChunkPos) -> bool {
        self.discovered.contains(&pos)
    }

    pub fn discovered_count(&self) -> usize {
        self.discovered.len()
    }

    /// Discovered chunks, sorted.
    pub fn discovered(&self) -> Vec<ChunkPos> {
        let mut chunks: Vec<ChunkPos> = self.discovered.iter().copied().collect();
        chunks.sort();
        chunks
    }

    /// Membership only; the location may since have gone stale.
    pub fn has_resource(&self, biome: Biome) -> bool {
        self.resources.get(&biome).is_some_and(|set| !set.is_empty())
    }

    pub fn known_count(&self, biome: Biome) -> usize {
        self.resources.get(&biome).map_or(0, HashSet::len)
    }

    /// Remembered tiles of `biome`, nearest to `from` first.
    pub fn nearest_known(&self, biome: Biome, from: Position) -> Vec<TilePos> {
        let Some(set) = self.resources.get(&biome) else {
            return Vec::new();
        };
        let mut tiles: Vec<TilePos> = set.iter().copied().collect();
        tiles.sort_by(|a, b| {
            a.center()
                .distance(from)
                .total_cmp(&b.center().distance(from))
                .then(a.cmp(b))
        });
        tiles
    }

    /// Nearest remembered `biome` tile that still has an accessible
    /// 4-neighbour `id` may claim. The neighbour closest to `from` is chosen.
    pub fn find_resource(
        &self,
        biome: Biome,
        from: Position,
        world: &mut World,
        id: EntityId,
    ) -> Option<ResourceSite> {
        let depletable = resource_capacity(biome, &world.config().world) > 0.0;
        for resource in self.nearest_known(biome, from).into_iter().take(MAX_RESOURCE_CANDIDATES) {
            if world.biome_at(resource) != biome {
                continue;
            }
            if depletable && world.tile(resource).resource <= 0.0 {
                continue;
            }
            let access = resource
                .neighbors()
                .into_iter()
                .filter(|&n| world.tile(n).is_available_to(id))
                .min_by(|a, b| {
                    a.center()
                        .distance(from)
                        .total_cmp(&b.center().distance(from))
                        .then(a.cmp(b))
                });
            if let Some(access) = access {
                return Some(ResourceSite { resource, access });
            }
        }
        None
    }
}
