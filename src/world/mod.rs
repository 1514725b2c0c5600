//! The chunked world: lazily generated terrain, eviction, spatial queries and
//! the authoritative entity registry.
//!
//! `World` is single-owner. Every mutating call takes `&mut self`, so the
//! chunk map and the registry can never be observed mid-update. Parallel
//! chunk generation happens off-map and is published afterwards.

pub mod cache;
pub mod chunk;
pub mod coords;
pub mod entities;
pub mod events;
pub mod storage;
pub mod tile;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::biomes::{Biome, BiomeClassifier};
use crate::config::{SimConfig, WorldConfig};
use crate::error::{ConfigError, StorageError};
use crate::noise_field::NoiseField;
use crate::seeds::WorldSeeds;
use crate::simulation::fauna::{Food, FoodKind};

pub use cache::{CacheStats, ChunkCache};
pub use chunk::{Chunk, ChunkRecord};
pub use coords::{ChunkBounds, ChunkPos, Position, TilePos};
pub use entities::{Entity, EntityBody, EntityId, EntityKind, EntityRegistry};
pub use events::{Event, EventBus, EventKind, EventPayload};
pub use storage::ChunkStorage;
pub use tile::Tile;

/// Upper bound on events resolved per call; deaths may emit follow-ups.
const MAX_EVENTS_PER_RESOLVE: usize = 10_000;

pub struct World {
    config: SimConfig,
    seeds: WorldSeeds,
    noise: NoiseField,
    classifier: BiomeClassifier,
    chunks: HashMap<ChunkPos, Chunk>,
    cache: ChunkCache,
    /// Hand-placed biomes, reapplied whenever their chunk is generated
    overrides: HashMap<TilePos, Biome>,
    /// Destination claims; tiles mirror this while their chunk is loaded
    reservations: HashMap<TilePos, EntityId>,
    entities: EntityRegistry,
    events: EventBus,
    rng: ChaCha8Rng,
}

impl World {
    /// Validate `config` and build an empty world. The terrain seed is the
    /// configured noise seed; spawning and agent streams derive from it.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        let seed = config.world.noise.seed;
        let seeds = WorldSeeds::builder(seed).terrain(seed).build();
        Self::with_seeds(config, seeds)
    }

    pub fn with_seeds(config: SimConfig, seeds: WorldSeeds) -> Result<Self, ConfigError> {
        config.validate()?;
        let world = &config.world;
        let noise = NoiseField::new(seeds.terrain, world.noise.octaves, world.noise_scale());
        let classifier = BiomeClassifier::new(world.biomes.clone(), world.transition_zone);
        let cache = ChunkCache::new(world.chunk_cache_duration);
        let rng = ChaCha8Rng::seed_from_u64(seeds.spawning);

        info!(seed = seeds.master, chunk_size = world.chunk_size, "world created");
        Ok(Self {
            config,
            seeds,
            noise,
            classifier,
            chunks: HashMap::new(),
            cache,
            overrides: HashMap::new(),
            reservations: HashMap::new(),
            entities: EntityRegistry::new(),
            events: EventBus::new(),
            rng,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn seeds(&self) -> &WorldSeeds {
        &self.seeds
    }

    pub fn chunk_size(&self) -> usize {
        self.config.world.chunk_size
    }

    pub fn noise(&self) -> &NoiseField {
        &self.noise
    }

    pub fn classifier(&self) -> &BiomeClassifier {
        &self.classifier
    }

    /// Spawning random stream.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    // =========================================================================
    // Chunks
    // =========================================================================

    /// The chunk at `pos`, generated first if it is not loaded.
    pub fn get_chunk(&mut self, pos: ChunkPos) -> &Chunk {
        self.ensure_chunk(pos)
    }

    fn ensure_chunk(&mut self, pos: ChunkPos) -> &mut Chunk {
        match self.chunks.entry(pos) {
            Entry::Occupied(entry) => {
                self.cache.record_hit();
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                let mut chunk = generate_chunk(pos, &self.noise, &self.classifier, &self.config.world, &self.overrides);
                adopt_entities(&mut chunk, &self.entities, &self.reservations);
                self.cache.record_miss();
                self.cache.touch(pos);
                self.cache.set_loaded(self.cache.stats.loaded + 1);
                trace!(%pos, "generated chunk");
                entry.insert(chunk)
            }
        }
    }

    /// Put a fully built chunk into the map, replacing any loaded one.
    fn publish(&mut self, mut chunk: Chunk) {
        adopt_entities(&mut chunk, &self.entities, &self.reservations);
        let pos = chunk.pos();
        self.cache.touch(pos);
        self.chunks.insert(pos, chunk);
        self.cache.set_loaded(self.chunks.len());
    }

    /// Loaded chunk at `pos`, without generating.
    pub fn chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    pub fn is_loaded(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn loaded_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Loaded chunk coordinates, sorted.
    pub fn loaded_positions(&self) -> Vec<ChunkPos> {
        let mut positions: Vec<ChunkPos> = self.chunks.keys().copied().collect();
        positions.sort();
        positions
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats
    }

    /// Chunks within `radius` (Chebyshev) of the chunk containing `(x, y)`.
    pub fn get_chunks_around(&mut self, x: f32, y: f32, radius: i32) -> Vec<&Chunk> {
        let center = ChunkPos::from_position(Position::new(x, y), self.chunk_size());
        let positions = center.around(radius);
        for &pos in &positions {
            self.ensure_chunk(pos);
        }
        positions.iter().filter_map(|pos| self.chunks.get(pos)).collect()
    }

    /// Generate every missing chunk within `radius` of `(x, y)` in parallel,
    /// then publish them. Returns how many were generated.
    pub fn load_chunks_around(&mut self, x: f32, y: f32, radius: i32) -> usize {
        let center = ChunkPos::from_position(Position::new(x, y), self.chunk_size());
        let missing: Vec<ChunkPos> = center
            .around(radius)
            .into_iter()
            .filter(|pos| !self.chunks.contains_key(pos))
            .collect();

        let (noise, classifier, config, overrides) =
            (&self.noise, &self.classifier, &self.config.world, &self.overrides);
        let generated: Vec<Chunk> = missing
            .par_iter()
            .map(|&pos| generate_chunk(pos, noise, classifier, config, overrides))
            .collect();

        let count = generated.len();
        for chunk in generated {
            self.cache.record_miss();
            self.publish(chunk);
        }
        debug!(%center, radius, count, "preloaded chunks");
        count
    }

    /// Run one eviction cycle. Chunks inside any of `views` are refreshed,
    /// the rest count down and are dropped at zero. Returns evicted chunks.
    pub fn unload_chunks_outside_view(&mut self, views: &[ChunkBounds]) -> Vec<ChunkPos> {
        let expired = self.cache.cycle(self.loaded_positions(), views);
        for pos in &expired {
            self.chunks.remove(pos);
        }
        self.cache.set_loaded(self.chunks.len());
        if !expired.is_empty() {
            debug!(count = expired.len(), loaded = self.chunks.len(), "evicted chunks");
        }
        expired
    }

    /// Save every loaded chunk, merging into the storage file.
    pub fn save_chunks(&self, storage: &ChunkStorage) -> Result<usize, StorageError> {
        let mut chunks: Vec<&Chunk> = self.chunks.values().collect();
        chunks.sort_by_key(|c| c.pos());
        storage.save_chunks(chunks)
    }

    /// Load every stored chunk into the map, replacing loaded ones.
    pub fn load_chunks(&mut self, storage: &ChunkStorage) -> Result<usize, StorageError> {
        let records = storage.load_records()?;
        let count = records.len();
        for record in records.values() {
            let chunk = Chunk::from_record(record, &self.config.world)?;
            self.publish(chunk);
        }
        info!(count, "loaded chunks from storage");
        Ok(count)
    }

    // =========================================================================
    // Tiles
    // =========================================================================

    pub fn tile(&mut self, pos: TilePos) -> &Tile {
        self.tile_mut(pos)
    }

    pub fn tile_mut(&mut self, pos: TilePos) -> &mut Tile {
        let size = self.chunk_size();
        let (lx, ly) = pos.local(size);
        self.ensure_chunk(pos.chunk(size)).local_tile_mut(lx, ly)
    }

    /// Tile under a continuous world position (floor division).
    pub fn get_tile_at(&mut self, x: f32, y: f32) -> &Tile {
        self.tile(Position::new(x, y).tile())
    }

    /// Tile if its chunk is loaded; never generates.
    pub fn peek_tile(&self, pos: TilePos) -> Option<&Tile> {
        self.chunks.get(&pos.chunk(self.chunk_size()))?.tile(pos)
    }

    pub fn biome_at(&mut self, pos: TilePos) -> Biome {
        self.tile(pos).biome
    }

    pub fn traversal_cost(&mut self, pos: TilePos) -> f32 {
        self.tile(pos).traversal_cost()
    }

    /// Place a biome by hand. The edit is reapplied if the chunk is evicted
    /// and regenerated.
    pub fn set_biome(&mut self, pos: TilePos, biome: Biome) {
        self.overrides.insert(pos, biome);
        let size = self.chunk_size();
        if let Some(chunk) = self.chunks.get_mut(&pos.chunk(size)) {
            chunk.set_biome(pos, biome, &self.config.world);
        }
    }

    /// Regrow tile resources on every loaded chunk.
    pub fn regrow_resources(&mut self, dt: f32) {
        let amount = self.config.world.regrowth_rate * dt;
        if amount <= 0.0 {
            return;
        }
        let config = &self.config.world;
        for chunk in self.chunks.values_mut() {
            for tile in chunk.tiles_mut() {
                tile.regrow(amount, config);
            }
        }
    }

    /// Claim `pos` as `id`'s movement target. The claim outlives eviction
    /// of the tile's chunk.
    pub fn reserve_destination(&mut self, pos: TilePos, id: EntityId) -> bool {
        if self.reservations.get(&pos).is_some_and(|&holder| holder != id) {
            return false;
        }
        if !self.tile_mut(pos).reserve(id) {
            return false;
        }
        self.reservations.insert(pos, id);
        true
    }

    pub fn release_destination(&mut self, pos: TilePos, id: EntityId) {
        if self.reservations.get(&pos) == Some(&id) {
            self.reservations.remove(&pos);
        }
        let size = self.chunk_size();
        if let Some(tile) = self.chunks.get_mut(&pos.chunk(size)).and_then(|c| c.tile_mut(pos)) {
            tile.release(id);
        }
    }

    /// Holder of the claim on `pos`, loaded or not.
    pub fn reservation(&self, pos: TilePos) -> Option<EntityId> {
        self.reservations.get(&pos).copied()
    }

    // =========================================================================
    // Entities
    // =========================================================================

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Register a new entity and mark its tile. Returns its id.
    pub fn add_entity(&mut self, body: EntityBody) -> EntityId {
        let id = self.entities.allocate_id();
        let entity = Entity { id, body };
        let kind = entity.kind();
        let tile = entity.position().tile();

        let size = self.chunk_size();
        let chunk = self.ensure_chunk(tile.chunk(size));
        chunk.add_entity_count(kind);
        if occupies_tile(kind) {
            let (lx, ly) = tile.local(size);
            let slot = chunk.local_tile_mut(lx, ly);
            if slot.present.is_none() {
                slot.present = Some(id);
            }
        }

        debug!(%id, kind = kind.name(), %tile, "spawned entity");
        self.entities.insert(entity);
        id
    }

    /// Unregister an entity, clearing its tile marks.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(id)?;
        let kind = entity.kind();
        let tile = entity.position().tile();
        let size = self.chunk_size();
        let successor = self.successor_on(tile, id);

        if let Some(chunk) = self.chunks.get_mut(&tile.chunk(size)) {
            chunk.remove_entity_count(kind);
            if let Some(slot) = chunk.tile_mut(tile) {
                if slot.present == Some(id) {
                    slot.present = successor;
                }
            }
        }
        if kind == EntityKind::Agent {
            let held: Vec<TilePos> =
                self.reservations.iter().filter(|(_, holder)| **holder == id).map(|(pos, _)| *pos).collect();
            for pos in held {
                self.release_destination(pos, id);
            }
        }
        debug!(%id, kind = kind.name(), "despawned entity");
        Some(entity)
    }

    /// Take an entity out of the registry for an update that needs
    /// `&mut World`. Tile marks are left alone; pair with `restore_entity`.
    pub fn take_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(id)
    }

    pub fn restore_entity(&mut self, entity: Entity) {
        self.entities.insert(entity);
    }

    /// Move an entity's tile marks from `from` to `to`. Entering a tile held
    /// by someone else emits a collision.
    pub fn relocate_entity(&mut self, id: EntityId, kind: EntityKind, from: Position, to: Position) {
        let (old, new) = (from.tile(), to.tile());
        if old == new {
            return;
        }
        let size = self.chunk_size();
        let successor = self.successor_on(old, id);

        if let Some(chunk) = self.chunks.get_mut(&old.chunk(size)) {
            if old.chunk(size) != new.chunk(size) {
                chunk.remove_entity_count(kind);
            }
            if let Some(slot) = chunk.tile_mut(old) {
                if slot.present == Some(id) {
                    slot.present = successor;
                }
            }
        }

        let changed_chunk = old.chunk(size) != new.chunk(size);
        let chunk = self.ensure_chunk(new.chunk(size));
        if changed_chunk {
            chunk.add_entity_count(kind);
        }
        if !occupies_tile(kind) {
            return;
        }
        let (lx, ly) = new.local(size);
        let slot = chunk.local_tile_mut(lx, ly);
        let holder = slot.present;
        match holder {
            None => slot.present = Some(id),
            Some(other) if other != id => {
                self.events.emit(Event::collision(id, other, 1.0));
            }
            _ => {}
        }
    }

    /// Who takes over `tile`'s `present` slot when `id` leaves it: the
    /// lowest-id other occupant standing there, if `id` holds the slot.
    fn successor_on(&self, tile: TilePos, id: EntityId) -> Option<EntityId> {
        if self.peek_tile(tile).map_or(true, |slot| slot.present != Some(id)) {
            return None;
        }
        self.entities
            .iter()
            .filter(|e| e.id != id && occupies_tile(e.kind()) && e.position().tile() == tile)
            .map(|e| e.id)
            .min()
    }

    /// Entities of `kind` within `radius` of `(x, y)`. Linear scan.
    pub fn search_for_entities(&self, x: f32, y: f32, radius: f32, kind: EntityKind) -> Vec<&Entity> {
        let origin = Position::new(x, y);
        self.entities
            .of_kind(kind)
            .iter()
            .filter(|e| e.position().distance(origin) <= radius)
            .collect()
    }

    /// Nearest entity of `kind` to `(x, y)`, ties broken by id. Linear scan.
    pub fn get_closest_entity(&self, x: f32, y: f32, kind: EntityKind) -> Option<&Entity> {
        let origin = Position::new(x, y);
        self.entities.of_kind(kind).iter().min_by(|a, b| {
            a.position()
                .distance(origin)
                .total_cmp(&b.position().distance(origin))
                .then(a.id.cmp(&b.id))
        })
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn emit(&mut self, event: Event) {
        self.events.emit(event);
    }

    pub fn subscribe(&mut self, kind: EventKind, listener: impl FnMut(&Event) + 'static) {
        self.events.subscribe(kind, listener);
    }

    /// Apply queued events: attacks damage animals, deaths despawn their
    /// subject and killed animals leave meat behind. Returns events handled.
    pub fn resolve_events(&mut self) -> usize {
        let mut handled = 0;
        while handled < MAX_EVENTS_PER_RESOLVE {
            let batch = self.events.drain();
            if batch.is_empty() {
                break;
            }
            for event in batch {
                handled += 1;
                self.apply_event(&event);
            }
        }
        handled
    }

    fn apply_event(&mut self, event: &Event) {
        match (event.kind, event.target, &event.payload) {
            (EventKind::Attack, Some(target), EventPayload::Damage(damage)) => {
                let Some(animal) = self.entities.get_mut(target).and_then(Entity::as_animal_mut) else {
                    return;
                };
                animal.health -= damage;
                if animal.health <= 0.0 {
                    let at = animal.position;
                    self.events.emit(Event::death(event.source, target, at));
                }
            }
            (EventKind::Death, Some(target), _) => {
                let Some(entity) = self.remove_entity(target) else {
                    return;
                };
                match entity.kind() {
                    EntityKind::Animal => {
                        let at = entity.position().tile().center();
                        let nutrition = self.config.spawn.meat_nutrition;
                        self.add_entity(EntityBody::Food(Food::new(at, FoodKind::Meat, nutrition)));
                        debug!(%target, killer = %event.source, "animal killed");
                    }
                    EntityKind::Agent => {
                        let name = entity.as_agent().map(|a| a.name.clone()).unwrap_or_default();
                        info!(%target, %name, "agent died");
                    }
                    EntityKind::Food => {}
                }
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("seeds", &self.seeds)
            .field("loaded_chunks", &self.chunks.len())
            .field("entities", &self.entities.len())
            .field("events", &self.events)
            .finish()
    }
}

/// Agents and animals hold a tile's `present` slot; food lies on the ground.
fn occupies_tile(kind: EntityKind) -> bool {
    !matches!(kind, EntityKind::Food)
}

/// Generate a chunk with hand-placed biomes applied. Pure in its inputs.
fn generate_chunk(
    pos: ChunkPos,
    noise: &NoiseField,
    classifier: &BiomeClassifier,
    config: &WorldConfig,
    overrides: &HashMap<TilePos, Biome>,
) -> Chunk {
    let mut chunk = Chunk::generate(pos, noise, classifier, config);
    for (tile, biome) in overrides {
        if tile.chunk(config.chunk_size) == pos {
            chunk.set_biome(*tile, *biome, config);
        }
    }
    chunk
}

/// Rebuild per-chunk entity counts, occupancy and destination claims from
/// the registry and the reservation table.
fn adopt_entities(chunk: &mut Chunk, entities: &EntityRegistry, reservations: &HashMap<TilePos, EntityId>) {
    chunk.clear_entity_counts();
    let pos = chunk.pos();
    let size = chunk.size();
    for (&tile, &holder) in reservations {
        if tile.chunk(size) == pos {
            if let Some(slot) = chunk.tile_mut(tile) {
                slot.destination = Some(holder);
            }
        }
    }
    for entity in entities.iter() {
        let tile = entity.position().tile();
        if tile.chunk(size) != pos {
            continue;
        }
        let kind = entity.kind();
        chunk.add_entity_count(kind);
        if occupies_tile(kind) {
            if let Some(slot) = chunk.tile_mut(tile) {
                if slot.present.is_none() {
                    slot.present = Some(entity.id);
                }
            }
        }
    }
}
