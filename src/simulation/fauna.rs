//! Wildlife and food on the ground.
//!
//! Animals wander between random nearby tiles and graze the grass they
//! stand on. Food is inert until something eats it. Both are spawned by a
//! periodic pass that caps how many of each a chunk may hold.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::biomes::Biome;
use crate::config::SpawnParams;
use crate::world::{ChunkPos, EntityBody, EntityKind, Position, TilePos, World};

/// Furthest an animal strays per leg, in tiles
const WANDER_RADIUS: i32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoodKind {
    /// Picked from forests
    Fruit,
    /// Left behind by a killed animal
    Meat,
}

impl FoodKind {
    pub fn name(&self) -> &'static str {
        match self {
            FoodKind::Fruit => "fruit",
            FoodKind::Meat => "meat",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Food {
    pub position: Position,
    pub kind: FoodKind,
    /// Hunger restored when eaten
    pub nutrition: f32,
}

impl Food {
    pub fn new(position: Position, kind: FoodKind, nutrition: f32) -> Self {
        Self { position, kind, nutrition }
    }
}

#[derive(Clone, Debug)]
pub struct Animal {
    pub position: Position,
    pub size: f32,
    pub speed: f32,
    pub health: f32,
    pub max_health: f32,
    /// Tile the animal is currently walking to
    pub target: Option<TilePos>,
    rng: ChaCha8Rng,
}

impl Animal {
    pub fn new(position: Position, params: &SpawnParams, seed: u64) -> Self {
        Self {
            position,
            size: params.animal_size,
            speed: params.animal_speed,
            health: params.animal_health,
            max_health: params.animal_health,
            target: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Graze the current tile, then take one step of the wander.
    pub fn update(&mut self, world: &mut World, params: &SpawnParams, dt: f32) {
        let here = self.position.tile();
        let tile = world.tile_mut(here);
        if tile.biome == Biome::Plains {
            tile.take_resource(params.graze_rate * dt);
        }

        let target = match self.target {
            Some(target) => target,
            None => {
                let candidate = here.offset(
                    self.rng.gen_range(-WANDER_RADIUS..=WANDER_RADIUS),
                    self.rng.gen_range(-WANDER_RADIUS..=WANDER_RADIUS),
                );
                if candidate == here || !world.tile(candidate).biome.is_valid_destination() {
                    return;
                }
                self.target = Some(candidate);
                candidate
            }
        };

        let goal = target.center();
        let distance = self.position.distance(goal);
        if distance <= 0.1 {
            self.target = None;
            return;
        }
        let step = (self.speed * dt).min(distance);
        let next = Position::new(
            self.position.x + (goal.x - self.position.x) / distance * step,
            self.position.y + (goal.y - self.position.y) / distance * step,
        );
        if next.tile() != here && !world.tile(next.tile()).is_passable() {
            self.target = None;
            return;
        }
        self.position = next;
    }
}

/// What one spawn pass added.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpawnReport {
    pub food: usize,
    pub animals: usize,
}

/// Roll food and animal spawns for every loaded chunk, in chunk order.
/// Fruit appears on Forest tiles and animals on free Plains tiles, each
/// only while the chunk is under its cap.
pub fn spawn_pass(world: &mut World) -> SpawnReport {
    let params = world.config().spawn.clone();
    let mut report = SpawnReport::default();

    for pos in world.loaded_positions() {
        let (roll_food, roll_animal, seed) = {
            let rng = world.rng();
            (
                rng.gen_bool(params.food_chance.clamp(0.0, 1.0)),
                rng.gen_bool(params.animal_chance.clamp(0.0, 1.0)),
                rng.gen::<u64>(),
            )
        };
        let Some(chunk) = world.chunk(pos) else {
            continue;
        };
        let food_room = chunk.entity_count(EntityKind::Food) < params.max_food_per_chunk;
        let animal_room = chunk.entity_count(EntityKind::Animal) < params.max_animals_per_chunk;

        if roll_food && food_room {
            if let Some(tile) = pick_tile(world, pos, Biome::Forest) {
                let fruit = Food::new(tile.center(), FoodKind::Fruit, params.fruit_nutrition);
                world.add_entity(EntityBody::Food(fruit));
                report.food += 1;
            }
        }
        if roll_animal && animal_room {
            if let Some(tile) = pick_tile(world, pos, Biome::Plains) {
                let animal = Animal::new(tile.center(), &params, seed);
                world.add_entity(EntityBody::Animal(animal));
                report.animals += 1;
            }
        }
    }

    if report != SpawnReport::default() {
        debug!(food = report.food, animals = report.animals, "spawn pass");
    }
    report
}

/// A random unoccupied tile of `biome` in a loaded chunk.
fn pick_tile(world: &mut World, pos: ChunkPos, biome: Biome) -> Option<TilePos> {
    let candidates: Vec<TilePos> = {
        let chunk = world.chunk(pos)?;
        chunk
            .biome_tiles(biome)
            .copied()
            .filter(|&t| chunk.tile(t).is_some_and(|tile| tile.present.is_none()))
            .collect()
    };
    if candidates.is_empty() {
        trace!(chunk = %pos, biome = biome.name(), "no free tile to spawn on");
        return None;
    }
    let index = world.rng().gen_range(0..candidates.len());
    Some(candidates[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biomes::BiomeBand;
    use crate::config::SimConfig;

    fn world_of(biome: Biome) -> World {
        let mut config = SimConfig::with_seed(17);
        config.world.chunk_size = 8;
        config.world.biomes = vec![BiomeBand::new(biome, -1.0, 1.01)];
        config.spawn.food_chance = 1.0;
        config.spawn.animal_chance = 1.0;
        World::new(config).unwrap()
    }

    #[test]
    fn test_spawns_respect_biomes() {
        let mut world = world_of(Biome::Forest);
        world.load_chunks_around(0.0, 0.0, 0);
        let report = spawn_pass(&mut world);
        assert_eq!(report, SpawnReport { food: 1, animals: 0 });

        let mut world = world_of(Biome::Plains);
        world.load_chunks_around(0.0, 0.0, 0);
        let report = spawn_pass(&mut world);
        assert_eq!(report, SpawnReport { food: 0, animals: 1 });
        let animal = &world.entities().of_kind(EntityKind::Animal)[0];
        assert_eq!(world.biome_at(animal.position().tile()), Biome::Plains);
    }

    #[test]
    fn test_spawns_are_capped_per_chunk() {
        let mut world = world_of(Biome::Forest);
        world.load_chunks_around(0.0, 0.0, 1);
        for _ in 0..20 {
            spawn_pass(&mut world);
        }
        let cap = world.config().spawn.max_food_per_chunk;
        assert_eq!(world.entities().count(EntityKind::Food), cap * 9);
        for pos in world.loaded_positions() {
            assert_eq!(world.chunk(pos).unwrap().entity_count(EntityKind::Food), cap);
        }
    }

    #[test]
    fn test_spawning_is_deterministic() {
        let run = || {
            let mut config = SimConfig::with_seed(3);
            config.world.chunk_size = 8;
            config.spawn.food_chance = 0.5;
            config.spawn.animal_chance = 0.5;
            let mut world = World::new(config).unwrap();
            world.load_chunks_around(0.0, 0.0, 2);
            for _ in 0..5 {
                spawn_pass(&mut world);
            }
            world
                .entities()
                .iter()
                .map(|e| (e.id, e.kind(), e.position().tile()))
                .collect::<std::collections::BTreeSet<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_animal_grazes_and_stays_on_land() {
        let mut world = world_of(Biome::Plains);
        let params = world.config().spawn.clone();
        let pond = TilePos::new(2, 0);
        world.set_biome(pond, Biome::Water);
        let mut animal = Animal::new(Position::new(0.5, 0.5), &params, 6);

        let start_grass = world.tile(TilePos::new(0, 0)).resource;
        for _ in 0..500 {
            animal.update(&mut world, &params, 0.1);
            assert_ne!(animal.position.tile(), pond);
        }
        assert!(world.tile(TilePos::new(0, 0)).resource < start_grass);
        assert!(animal.position.distance(Position::new(0.5, 0.5)) > 0.0);
    }
}
