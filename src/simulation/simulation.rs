//! Simulation state and the fixed-step tick loop.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::simulation::agent::Agent;
use crate::simulation::fauna::spawn_pass;
use crate::simulation::tasks::StepReport;
use crate::world::{ChunkBounds, ChunkPos, EntityBody, EntityId, EntityKind, Event, Position, TilePos, World};

/// Placement attempts per agent before giving up
const SPAWN_ATTEMPTS: usize = 200;

/// Running totals over the whole run
#[derive(Clone, Debug, Default, Serialize)]
pub struct SimulationStats {
    pub agents_spawned: u32,
    pub agents_died: u32,
    pub food_spawned: u32,
    pub animals_spawned: u32,
    pub animals_killed: u32,
    pub tasks_completed: u64,
    pub tasks_cancelled: u64,
    pub tasks_interrupted: u64,
    pub events_resolved: u64,
    pub chunks_evicted: u64,
    pub current_agents: u32,
    pub current_animals: u32,
    pub current_food: u32,
}

/// Owns the world and drives every entity once per tick, sequentially.
pub struct Simulation {
    world: World,
    config: SimConfig,
    tick: u64,
    time: f64,
    pub stats: SimulationStats,
    /// Extra chunks to keep alive, e.g. a camera
    viewport: Option<ChunkBounds>,
    agent_rng: ChaCha8Rng,
}

impl Simulation {
    /// Build the world and preload chunks around the origin.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        let mut world = World::new(config.clone())?;
        let radius = config.world.initial_load_radius;
        let loaded = world.load_chunks_around(0.0, 0.0, radius);
        info!(chunks = loaded, radius, "initial chunks loaded");

        let agent_rng = ChaCha8Rng::seed_from_u64(world.seeds().agents);
        Ok(Self {
            world,
            config,
            tick: 0,
            time: 0.0,
            stats: SimulationStats::default(),
            viewport: None,
            agent_rng,
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds elapsed
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_viewport(&mut self, viewport: Option<ChunkBounds>) {
        self.viewport = viewport;
    }

    pub fn agent(&self, id: EntityId) -> Option<&Agent> {
        self.world.entity(id).and_then(|e| e.as_agent())
    }

    /// Living agents, by id.
    pub fn agents(&self) -> Vec<(EntityId, &Agent)> {
        let mut agents: Vec<(EntityId, &Agent)> = self
            .world
            .entities()
            .of_kind(EntityKind::Agent)
            .iter()
            .filter_map(|e| e.as_agent().map(|a| (e.id, a)))
            .collect();
        agents.sort_by_key(|(id, _)| *id);
        agents
    }

    /// Put a new agent at `position`.
    pub fn spawn_agent(&mut self, position: Position) -> EntityId {
        let seed = self.world.seeds().for_agent(u64::from(self.stats.agents_spawned));
        let agent = Agent::spawn(position, &self.config.agent, seed);
        let name = agent.name.clone();
        let id = self.world.add_entity(EntityBody::Agent(Box::new(agent)));
        self.stats.agents_spawned += 1;
        info!(%id, %name, %position, "agent spawned");
        id
    }

    /// Spawn up to `count` agents on random free land tiles inside the
    /// initially loaded area.
    pub fn spawn_agents(&mut self, count: usize) -> Vec<EntityId> {
        let reach = ((self.config.world.initial_load_radius.max(0) as usize + 1) * self.world.chunk_size()) as i32 - 1;
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let spot = (0..SPAWN_ATTEMPTS).find_map(|_| {
                let tile = TilePos::new(
                    self.agent_rng.gen_range(-reach..=reach),
                    self.agent_rng.gen_range(-reach..=reach),
                );
                let slot = self.world.tile(tile);
                (slot.biome.is_valid_destination() && slot.present.is_none()).then_some(tile)
            });
            match spot {
                Some(tile) => ids.push(self.spawn_agent(tile.center())),
                None => warn!(attempts = SPAWN_ATTEMPTS, "no free land tile for an agent"),
            }
        }
        ids
    }

    /// Advance the world by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        self.tick += 1;
        self.time += dt as f64;

        let interval = self.config.spawn.spawn_interval;
        if interval > 0 && (self.tick - 1) % interval == 0 {
            let report = spawn_pass(&mut self.world);
            self.stats.food_spawned += report.food as u32;
            self.stats.animals_spawned += report.animals as u32;
        }

        self.update_agents(dt);
        self.update_animals(dt);

        let animals_before = self.world.entities().count(EntityKind::Animal);
        let agents_before = self.world.entities().count(EntityKind::Agent);
        self.stats.events_resolved += self.world.resolve_events() as u64;
        let animals_after = self.world.entities().count(EntityKind::Animal);
        let agents_after = self.world.entities().count(EntityKind::Agent);
        self.stats.animals_killed += animals_before.saturating_sub(animals_after) as u32;
        self.stats.agents_died += agents_before.saturating_sub(agents_after) as u32;

        self.world.regrow_resources(dt);

        let views = self.views();
        let evicted = self.world.unload_chunks_outside_view(&views);
        self.stats.chunks_evicted += evicted.len() as u64;

        self.update_stats();
    }

    fn update_agents(&mut self, dt: f32) {
        for id in self.world.entities().ids(EntityKind::Agent) {
            let Some(mut entity) = self.world.take_entity(id) else {
                continue;
            };
            let outcome = match &mut entity.body {
                EntityBody::Agent(agent) => {
                    let from = agent.position;
                    let report = agent.update(id, &mut self.world, &self.config, dt);
                    Some((from, agent.position, report, agent.needs.depleted(), agent.name.clone()))
                }
                _ => None,
            };
            self.world.restore_entity(entity);
            let Some((from, to, report, depleted, name)) = outcome else {
                continue;
            };
            self.world.relocate_entity(id, EntityKind::Agent, from, to);

            match report {
                StepReport::Completed(_) => self.stats.tasks_completed += 1,
                StepReport::Cancelled(_) => self.stats.tasks_cancelled += 1,
                StepReport::Interrupted(_) => self.stats.tasks_interrupted += 1,
                StepReport::Running(_) | StepReport::Idle => {}
            }

            if let Some(need) = depleted {
                if self.config.needs.lethal {
                    info!(%id, %name, need = need.name(), "need depleted");
                    self.world.emit(Event::death(id, id, to));
                }
            }
        }
    }

    fn update_animals(&mut self, dt: f32) {
        for id in self.world.entities().ids(EntityKind::Animal) {
            let Some(mut entity) = self.world.take_entity(id) else {
                continue;
            };
            let moved = match &mut entity.body {
                EntityBody::Animal(animal) => {
                    let from = animal.position;
                    animal.update(&mut self.world, &self.config.spawn, dt);
                    Some((from, animal.position))
                }
                _ => None,
            };
            self.world.restore_entity(entity);
            if let Some((from, to)) = moved {
                self.world.relocate_entity(id, EntityKind::Animal, from, to);
            }
        }
    }

    /// Chunks that must stay loaded: every agent's vision plus the viewport.
    fn views(&self) -> Vec<ChunkBounds> {
        let size = self.world.chunk_size();
        let radius = self.config.agent.vision_chunk_radius;
        let mut views: Vec<ChunkBounds> = self
            .world
            .entities()
            .of_kind(EntityKind::Agent)
            .iter()
            .map(|e| ChunkBounds::around(ChunkPos::from_position(e.position(), size), radius))
            .collect();
        views.extend(self.viewport);
        views
    }

    fn update_stats(&mut self) {
        let entities = self.world.entities();
        self.stats.current_agents = entities.count(EntityKind::Agent) as u32;
        self.stats.current_animals = entities.count(EntityKind::Animal) as u32;
        self.stats.current_food = entities.count(EntityKind::Food) as u32;
    }

    /// Run `ticks` steps, logging progress every `report_every` ticks.
    pub fn run(&mut self, ticks: u64, dt: f32, report_every: u64) {
        for _ in 0..ticks {
            self.step(dt);
            if report_every > 0 && self.tick % report_every == 0 {
                info!(
                    tick = self.tick,
                    agents = self.stats.current_agents,
                    animals = self.stats.current_animals,
                    food = self.stats.current_food,
                    chunks = self.world.loaded_count(),
                    "progress"
                );
                for (id, agent) in self.agents() {
                    let snapshot = agent.debug_snapshot();
                    debug!(
                        %id,
                        name = %snapshot.name,
                        task = snapshot.task.as_deref().unwrap_or("-"),
                        hunger = snapshot.needs.hunger,
                        thirst = snapshot.needs.thirst,
                        energy = snapshot.needs.energy,
                        "agent"
                    );
                }
            }
        }
    }

    pub fn summary(&self) -> String {
        let s = &self.stats;
        format!(
            "tick {} ({:.1}s): {} agents alive ({} spawned, {} died), {} animals ({} killed), {} food; \
             tasks {} done / {} cancelled / {} interrupted; {} chunks loaded, {} evicted; {}",
            self.tick,
            self.time,
            s.current_agents,
            s.agents_spawned,
            s.agents_died,
            s.current_animals,
            s.animals_killed,
            s.current_food,
            s.tasks_completed,
            s.tasks_cancelled,
            s.tasks_interrupted,
            self.world.loaded_count(),
            s.chunks_evicted,
            self.world.cache_stats().summary(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biomes::{Biome, BiomeBand};

    fn plains_config() -> SimConfig {
        let mut config = SimConfig::fast_test();
        config.world.biomes = vec![BiomeBand::new(Biome::Plains, -1.0, 1.01)];
        config
    }

    #[test]
    fn test_new_preloads_origin() {
        let sim = Simulation::new(SimConfig::fast_test()).unwrap();
        assert_eq!(sim.world().loaded_count(), 9);
        assert_eq!(sim.tick(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = SimConfig::fast_test();
        config.world.chunk_size = 0;
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn test_spawned_agents_stand_on_land() {
        let mut sim = Simulation::new(SimConfig::fast_test()).unwrap();
        let ids = sim.spawn_agents(5);
        assert_eq!(ids.len(), 5);
        for id in ids {
            let tile = sim.agent(id).unwrap().position.tile();
            assert!(sim.world_mut().biome_at(tile).is_valid_destination());
        }
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = || {
            let mut sim = Simulation::new(SimConfig::fast_test()).unwrap();
            sim.spawn_agents(3);
            for _ in 0..50 {
                sim.step(0.1);
            }
            sim.agents()
                .iter()
                .map(|(id, a)| (*id, a.name.clone(), a.position.x.to_bits(), a.position.y.to_bits()))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_depleted_agent_dies_when_lethal() {
        let mut config = plains_config();
        config.needs.thirst_decay = 1000.0;
        let mut sim = Simulation::new(config).unwrap();
        let id = sim.spawn_agent(Position::new(0.5, 0.5));
        sim.step(0.5);
        assert!(sim.agent(id).is_none());
        assert_eq!(sim.stats.agents_died, 1);
        assert_eq!(sim.stats.current_agents, 0);
    }

    #[test]
    fn test_depleted_agent_survives_when_not_lethal() {
        let mut config = plains_config();
        config.needs.thirst_decay = 1000.0;
        config.needs.lethal = false;
        let mut sim = Simulation::new(config).unwrap();
        let id = sim.spawn_agent(Position::new(0.5, 0.5));
        sim.step(0.5);
        let agent = sim.agent(id).unwrap();
        assert_eq!(agent.needs.thirst, 0.0);
        assert_eq!(sim.stats.agents_died, 0);
    }

    #[test]
    fn test_far_chunks_are_evicted() {
        let mut sim = Simulation::new(plains_config()).unwrap();
        sim.spawn_agent(Position::new(0.5, 0.5));
        let far = ChunkPos::new(20, 20);
        sim.world_mut().get_chunk(far);
        assert!(sim.world().is_loaded(far));

        for _ in 0..5 {
            sim.step(0.1);
        }
        assert!(!sim.world().is_loaded(far));
        assert!(sim.world().is_loaded(ChunkPos::new(0, 0)));
        assert!(sim.stats.chunks_evicted > 0);
    }

    #[test]
    fn test_viewport_keeps_chunks_alive() {
        let mut sim = Simulation::new(plains_config()).unwrap();
        let far = ChunkPos::new(20, 20);
        sim.set_viewport(Some(ChunkBounds::around(far, 0)));
        sim.world_mut().get_chunk(far);
        for _ in 0..10 {
            sim.step(0.1);
        }
        assert!(sim.world().is_loaded(far));
    }

    #[test]
    fn test_long_run_keeps_books_balanced() {
        let mut sim = Simulation::new(SimConfig::fast_test()).unwrap();
        sim.spawn_agents(4);
        sim.run(300, 0.1, 0);
        let s = &sim.stats;
        assert_eq!(s.current_agents + s.agents_died, s.agents_spawned);
        assert_eq!(sim.tick(), 300);
        assert!(sim.summary().starts_with("tick 300"));
        for (_, agent) in sim.agents() {
            for need in crate::simulation::needs::Need::all() {
                assert!((0.0..=100.0).contains(&agent.needs.get(need)));
            }
        }
    }
}
