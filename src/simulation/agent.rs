//! Autonomous agents: needs, perception, decisions and movement.
//!
//! Per tick an agent decays its needs, observes the chunks around it, queues
//! at most one new plan for the most pressing unmet need, runs the head of
//! its task queue and finally moves by its velocity. Tile occupancy is the
//! caller's job (see `World::relocate_entity`).

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, trace};

use crate::biomes::Biome;
use crate::config::{AgentParams, SimConfig};
use crate::simulation::actions::{Action, ActionContext};
use crate::simulation::inventory::Inventory;
use crate::simulation::memory::SpatialMemory;
use crate::simulation::needs::{Need, Needs};
use crate::simulation::pathfinding::{line_of_sight, Pathfinder};
use crate::simulation::tasks::{StepReport, Task, TaskQueue};
use crate::world::{ChunkPos, EntityId, EntityKind, Position, TilePos, World};

/// Distance at which a waypoint counts as reached
pub const WAYPOINT_TOLERANCE: f32 = 0.1;

/// Result of one steering step toward a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Steering {
    Arrived,
    Moving,
    /// No route under current bounds
    Blocked,
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub name: String,
    pub position: Position,
    /// Tiles per second
    pub velocity: (f32, f32),
    pub size: f32,
    pub speed: f32,
    pub needs: Needs,
    pub memory: SpatialMemory,
    /// Waypoints still to visit, front first
    pub path: VecDeque<Position>,
    /// Tile the current path leads to
    pub path_goal: Option<TilePos>,
    pub inventory: Inventory,
    pub tasks: TaskQueue,
    pub(crate) rng: ChaCha8Rng,
}

impl Agent {
    pub fn new(name: impl Into<String>, position: Position, params: &AgentParams, seed: u64) -> Self {
        Self {
            name: name.into(),
            position,
            velocity: (0.0, 0.0),
            size: params.size,
            speed: params.speed,
            needs: Needs::default(),
            memory: SpatialMemory::new(),
            path: VecDeque::new(),
            path_goal: None,
            inventory: Inventory::new(params.inventory_capacity),
            tasks: TaskQueue::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// An agent with a name drawn from its own random stream.
    pub fn spawn(position: Position, params: &AgentParams, seed: u64) -> Self {
        let mut agent = Self::new(String::new(), position, params, seed);
        agent.name = generate_name(&mut agent.rng);
        agent
    }

    /// How close to a tile centre counts as having arrived.
    pub fn arrival_tolerance(&self) -> f32 {
        WAYPOINT_TOLERANCE + self.size / 2.0
    }

    pub fn stop(&mut self) {
        self.velocity = (0.0, 0.0);
    }

    pub fn clear_path(&mut self) {
        self.path.clear();
        self.path_goal = None;
    }

    /// Set velocity for one tick of travel toward the centre of `goal`,
    /// replanning when the goal changed or the path ran out.
    pub fn steer_to(&mut self, world: &mut World, pathfinder: &Pathfinder, goal: TilePos, dt: f32) -> Steering {
        if self.position.distance(goal.center()) <= self.arrival_tolerance() {
            self.stop();
            self.clear_path();
            return Steering::Arrived;
        }

        self.drop_reached_waypoints();
        if self.path_goal != Some(goal) || self.path.is_empty() {
            let path = pathfinder.find_path(world, self.position, goal);
            if path.is_empty() {
                trace!(agent = %self.name, %goal, "no route");
                self.stop();
                self.clear_path();
                return Steering::Blocked;
            }
            self.path = path.into();
            self.path_goal = Some(goal);
            self.drop_reached_waypoints();
        }

        let Some(&next) = self.path.front() else {
            self.stop();
            return Steering::Moving;
        };
        let (dx, dy) = (next.x - self.position.x, next.y - self.position.y);
        let distance = (dx * dx + dy * dy).sqrt();

        // Rough ground slows the walk
        let cost = world.traversal_cost(self.position.tile());
        let speed = if cost.is_finite() && cost > 0.0 { self.speed / cost } else { self.speed };
        let step = if dt > 0.0 { speed.min(distance / dt) } else { speed };
        self.velocity = (dx / distance * step, dy / distance * step);
        Steering::Moving
    }

    fn drop_reached_waypoints(&mut self) {
        while let Some(&next) = self.path.front() {
            if self.position.distance(next) > WAYPOINT_TOLERANCE {
                break;
            }
            self.path.pop_front();
        }
    }

    /// Move by the current velocity. A step that would cross or land on an
    /// impassable tile, or cut a blocked corner, is refused and stops the
    /// agent. Returns whether the agent moved.
    pub fn apply_velocity(&mut self, world: &mut World, dt: f32) -> bool {
        let (vx, vy) = self.velocity;
        if vx == 0.0 && vy == 0.0 {
            return false;
        }
        let next = Position::new(self.position.x + vx * dt, self.position.y + vy * dt);
        let here = self.position.tile();
        if next.tile() != here && !line_of_sight(world, here, next.tile()) {
            debug!(agent = %self.name, to = %next.tile(), "movement blocked");
            self.stop();
            self.clear_path();
            return false;
        }
        self.position = next;
        true
    }

    /// Memorize every chunk within `radius` chunks of the agent.
    pub fn observe(&mut self, world: &mut World, radius: i32) {
        let center = ChunkPos::from_position(self.position, world.chunk_size());
        for pos in center.around(radius) {
            if self.memory.memorize_chunk(world.get_chunk(pos)) {
                trace!(agent = %self.name, chunk = %pos, "discovered chunk");
            }
        }
    }

    /// Run one tick. The agent must have been taken out of the registry
    /// (or never put in it) so the world can be borrowed mutably.
    pub fn update(&mut self, id: EntityId, world: &mut World, config: &SimConfig, dt: f32) -> StepReport {
        self.needs.decay(&config.needs, dt);
        self.observe(world, config.agent.vision_chunk_radius);

        let ctx = ActionContext::new(id, config);
        self.decide(world, &ctx);

        let mut tasks = std::mem::take(&mut self.tasks);
        let report = tasks.execute(self, world, &ctx, dt);
        self.tasks = tasks;

        self.apply_velocity(world, dt);
        report
    }

    /// Queue a plan for the first low need (thirst, hunger, energy) that no
    /// queued task addresses yet. One new plan per tick at most; an agent
    /// with nothing to do goes wandering.
    pub fn decide(&mut self, world: &mut World, ctx: &ActionContext) {
        let pressing = Need::all()
            .into_iter()
            .find(|&need| self.needs.is_low(need, ctx.needs) && !self.tasks.addresses(need));
        match pressing {
            Some(Need::Thirst) => self.plan_drink(world, ctx),
            Some(Need::Hunger) => self.plan_meal(world, ctx),
            Some(Need::Energy) => {
                let task = make_task("rest", Action::Rest, ctx.agent.rest_priority, ctx);
                self.tasks.add(task.for_need(Need::Energy));
            }
            None if self.tasks.is_empty() => {
                let wander = Action::Explore { target: None };
                self.tasks.add(make_task("wander", wander, ctx.agent.wander_priority, ctx));
            }
            None => {}
        }
    }

    fn plan_drink(&mut self, world: &mut World, ctx: &ActionContext) {
        let priority = ctx.agent.thirst_priority;
        let Some(site) = self.memory.find_resource(Biome::Water, self.position, world, ctx.id) else {
            self.plan_search(Need::Thirst, ctx);
            return;
        };
        if !world.reserve_destination(site.access, ctx.id) {
            self.plan_search(Need::Thirst, ctx);
            return;
        }
        debug!(agent = %self.name, water = %site.resource, "heading for water");
        self.tasks.add_linked(vec![
            make_task("go to water", Action::MoveTo { target: site.access }, priority, ctx)
                .for_need(Need::Thirst)
                .with_reservation(site.access),
            make_task("drink", Action::Drink { source: site.resource }, priority, ctx)
                .for_need(Need::Thirst)
                .with_reservation(site.access),
        ]);
    }

    /// Food in hand, then food in sight, then remembered berries, then prey.
    fn plan_meal(&mut self, world: &mut World, ctx: &ActionContext) {
        let priority = ctx.agent.hunger_priority;
        let (x, y) = (self.position.x, self.position.y);

        if self.inventory.items().any(|item| item.is_edible()) {
            self.tasks.add(make_task("eat", Action::EatFood, priority, ctx).for_need(Need::Hunger));
            return;
        }

        let food = world
            .get_closest_entity(x, y, EntityKind::Food)
            .map(|e| e.position())
            .filter(|at| at.distance(self.position) <= ctx.agent.vision_range);
        if let Some(at) = food {
            self.tasks.add_linked(vec![
                make_task("go to food", Action::MoveTo { target: at.tile() }, priority, ctx).for_need(Need::Hunger),
                make_task("eat", Action::EatFood, priority, ctx).for_need(Need::Hunger),
            ]);
            return;
        }

        if let Some(site) = self.memory.find_resource(Biome::Forest, self.position, world, ctx.id) {
            if world.reserve_destination(site.access, ctx.id) {
                debug!(agent = %self.name, forest = %site.resource, "heading for berries");
                self.tasks.add_linked(vec![
                    make_task("go to berries", Action::MoveTo { target: site.access }, priority, ctx)
                        .for_need(Need::Hunger)
                        .with_reservation(site.access),
                    make_task("forage", Action::Forage { source: site.resource }, priority, ctx)
                        .for_need(Need::Hunger)
                        .with_reservation(site.access),
                ]);
                return;
            }
        }

        let prey = world
            .get_closest_entity(x, y, EntityKind::Animal)
            .filter(|e| e.position().distance(self.position) <= ctx.agent.vision_range)
            .map(|e| e.id);
        if let Some(prey) = prey {
            debug!(agent = %self.name, %prey, "hunting");
            self.tasks.add_linked(vec![
                make_task("hunt", Action::Hunt { prey }, priority, ctx).for_need(Need::Hunger),
                make_task("eat", Action::EatFood, priority, ctx).for_need(Need::Hunger),
            ]);
            return;
        }

        self.plan_search(Need::Hunger, ctx);
    }

    /// Nothing known satisfies `need`: go looking.
    fn plan_search(&mut self, need: Need, ctx: &ActionContext) {
        trace!(agent = %self.name, need = need.name(), "nothing known, exploring");
        let explore = Action::Explore { target: None };
        self.tasks.add(make_task("explore", explore, ctx.agent.explore_priority, ctx).for_need(need));
    }

    /// Summary for debug overlays and logs.
    pub fn debug_snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            name: self.name.clone(),
            position: (self.position.x, self.position.y),
            needs: self.needs.clone(),
            task: self.tasks.current().map(|t| t.name.clone()),
            queued: self.tasks.len(),
            path: self.path.iter().map(|p| (p.x, p.y)).collect(),
            discovered_chunks: self.memory.discovered_count(),
            inventory: self.inventory.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AgentSnapshot {
    pub name: String,
    pub position: (f32, f32),
    pub needs: Needs,
    pub task: Option<String>,
    pub queued: usize,
    pub path: Vec<(f32, f32)>,
    pub discovered_chunks: usize,
    pub inventory: String,
}

fn make_task(name: &str, action: Action, priority: i32, ctx: &ActionContext) -> Task {
    let cost = action.energy_cost(ctx.agent);
    Task::new(name, action, priority).with_energy_cost(cost)
}

fn pick<'a>(rng: &mut ChaCha8Rng, options: &[&'a str]) -> &'a str {
    options[rng.gen_range(0..options.len())]
}

/// Two or three syllables, capitalised.
pub fn generate_name(rng: &mut ChaCha8Rng) -> String {
    let first = pick(rng, &["Ka", "Lo", "Mi", "Sa", "To", "Ve", "Ar", "El", "Ro", "Du", "Ni", "Ba"]);
    let middle = pick(rng, &["ra", "li", "no", "ve", "tha", "mo", "su", "ri", "an", "el"]);
    let mut name = format!("{}{}", first, middle);
    if rng.gen_bool(0.4) {
        name.push_str(pick(rng, &["n", "s", "th", "r", "l", "x"]));
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biomes::BiomeBand;
    use crate::simulation::fauna::Animal;
    use crate::simulation::inventory::Item;
    use crate::world::EntityBody;

    fn plains_config() -> SimConfig {
        let mut config = SimConfig::with_seed(8);
        config.world.chunk_size = 8;
        config.world.biomes = vec![BiomeBand::new(Biome::Plains, -1.0, 1.01)];
        config
    }

    #[test]
    fn test_thirsty_agent_walks_to_water_and_drinks() {
        let config = plains_config();
        let mut world = World::new(config.clone()).unwrap();
        let water = TilePos::new(5, 0);
        let access = TilePos::new(4, 0);
        world.set_biome(water, Biome::Water);

        let id = EntityId(1);
        let mut agent = Agent::new("Tester", Position::new(0.0, 0.0), &config.agent, 1);
        agent.needs.thirst = 15.0;
        agent.memory.memorize_tile(water, Biome::Water);

        agent.update(id, &mut world, &config, 0.1);
        let head = agent.tasks.current().unwrap();
        assert_eq!(head.action, Action::MoveTo { target: access });
        assert_eq!(head.reservation, Some(access));
        assert_eq!(head.linked.len(), 1);
        assert_eq!(head.linked[0].action, Action::Drink { source: water });
        assert_eq!(world.tile(access).destination, Some(id));

        let mut arrived = false;
        for _ in 0..400 {
            agent.update(id, &mut world, &config, 0.1);
            let drinking = matches!(agent.tasks.current().map(|t| &t.action), Some(Action::Drink { .. }));
            if drinking && !arrived {
                arrived = true;
                assert!(agent.position.distance(access.center()) <= agent.arrival_tolerance() + 1e-4);
            }
            if !agent.tasks.addresses(Need::Thirst) {
                break;
            }
        }
        assert!(arrived);
        assert!(!agent.tasks.addresses(Need::Thirst));
        assert!(agent.needs.thirst >= 99.9);
        assert!(agent.position.distance(access.center()) <= agent.arrival_tolerance() + 1e-4);
        assert_eq!(world.tile(access).destination, None);
    }

    #[test]
    fn test_one_new_plan_per_tick() {
        let config = plains_config();
        let mut world = World::new(config.clone()).unwrap();
        world.set_biome(TilePos::new(6, 0), Biome::Water);
        world.set_biome(TilePos::new(0, 6), Biome::Forest);

        let id = EntityId(1);
        let mut agent = Agent::new("Tester", Position::new(0.5, 0.5), &config.agent, 1);
        agent.needs.thirst = 10.0;
        agent.needs.hunger = 10.0;

        agent.update(id, &mut world, &config, 0.1);
        assert!(agent.tasks.addresses(Need::Thirst));
        assert!(!agent.tasks.addresses(Need::Hunger));

        agent.update(id, &mut world, &config, 0.1);
        assert!(agent.tasks.addresses(Need::Hunger));
        // Thirst outranks hunger
        assert_eq!(agent.tasks.current().map(|t| t.need), Some(Some(Need::Thirst)));
    }

    #[test]
    fn test_idle_agent_wanders() {
        let config = plains_config();
        let mut world = World::new(config.clone()).unwrap();
        let mut agent = Agent::new("Tester", Position::new(0.5, 0.5), &config.agent, 1);
        agent.update(EntityId(1), &mut world, &config, 0.1);
        assert_eq!(agent.tasks.names(), vec!["wander"]);
        assert!(agent.memory.discovered_count() >= 9);
    }

    #[test]
    fn test_tired_agent_rests_first() {
        let config = plains_config();
        let mut world = World::new(config.clone()).unwrap();
        let mut agent = Agent::new("Tester", Position::new(0.5, 0.5), &config.agent, 1);
        agent.needs.energy = 10.0;
        agent.update(EntityId(1), &mut world, &config, 0.1);
        let head = agent.tasks.current().unwrap();
        assert_eq!(head.action, Action::Rest);
        assert!(agent.needs.energy > 10.0 - 0.01);
    }

    #[test]
    fn test_hungry_agent_eats_carried_food() {
        let config = plains_config();
        let mut world = World::new(config.clone()).unwrap();
        let mut agent = Agent::new("Tester", Position::new(0.5, 0.5), &config.agent, 1);
        agent.needs.hunger = 20.0;
        agent.inventory.add_item(Item::food("fruit", 2, 20.0));

        agent.update(EntityId(1), &mut world, &config, 0.1);
        assert!(agent.needs.hunger > 39.0);
        assert_eq!(agent.inventory.quantity("fruit"), 1);
    }

    #[test]
    fn test_hungry_agent_hunts_visible_prey() {
        let config = plains_config();
        let mut world = World::new(config.clone()).unwrap();
        let prey = world.add_entity(EntityBody::Animal(Animal::new(Position::new(3.5, 0.5), &config.spawn, 1)));
        let mut agent = Agent::new("Tester", Position::new(0.5, 0.5), &config.agent, 1);
        agent.needs.hunger = 20.0;

        agent.update(EntityId(99), &mut world, &config, 0.1);
        let head = agent.tasks.current().unwrap();
        assert_eq!(head.action, Action::Hunt { prey });
        assert_eq!(head.linked[0].action, Action::EatFood);
    }

    #[test]
    fn test_unknown_resource_triggers_exploration() {
        let config = plains_config();
        let mut world = World::new(config.clone()).unwrap();
        let mut agent = Agent::new("Tester", Position::new(0.5, 0.5), &config.agent, 1);
        agent.needs.thirst = 5.0;
        agent.update(EntityId(1), &mut world, &config, 0.1);
        let head = agent.tasks.current().unwrap();
        assert_eq!(head.name, "explore");
        assert_eq!(head.need, Some(Need::Thirst));
    }

    #[test]
    fn test_movement_refuses_impassable_tiles() {
        let config = plains_config();
        let mut world = World::new(config.clone()).unwrap();
        world.set_biome(TilePos::new(1, 0), Biome::Water);
        let mut agent = Agent::new("Tester", Position::new(0.9, 0.5), &config.agent, 1);
        agent.velocity = (1.0, 0.0);
        assert!(!agent.apply_velocity(&mut world, 0.5));
        assert_eq!(agent.position, Position::new(0.9, 0.5));
        assert_eq!(agent.velocity, (0.0, 0.0));

        agent.velocity = (0.0, 1.0);
        assert!(agent.apply_velocity(&mut world, 0.5));
        assert_eq!(agent.position.tile(), TilePos::new(0, 1));
    }

    #[test]
    fn test_long_step_cannot_jump_water() {
        let config = plains_config();
        let mut world = World::new(config.clone()).unwrap();
        world.set_biome(TilePos::new(2, 0), Biome::Water);
        let mut agent = Agent::new("Tester", Position::new(0.5, 0.5), &config.agent, 1);
        agent.velocity = (30.0, 0.0);
        assert!(!agent.apply_velocity(&mut world, 0.1));
        assert_eq!(agent.position, Position::new(0.5, 0.5));

        // Both tiles beside a diagonal step are water
        world.set_biome(TilePos::new(1, 4), Biome::Water);
        world.set_biome(TilePos::new(0, 5), Biome::Water);
        agent.position = Position::new(0.9, 4.9);
        agent.velocity = (0.4, 0.4);
        assert!(!agent.apply_velocity(&mut world, 1.0));
        assert_eq!(agent.position.tile(), TilePos::new(0, 4));
    }

    #[test]
    fn test_spawned_names_are_deterministic() {
        let params = AgentParams::default();
        let a = Agent::spawn(Position::new(0.0, 0.0), &params, 77);
        let b = Agent::spawn(Position::new(0.0, 0.0), &params, 77);
        assert_eq!(a.name, b.name);
        assert!(a.name.len() >= 4);
        assert!(a.name.chars().next().is_some_and(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn test_debug_snapshot_serializes() {
        let config = plains_config();
        let agent = Agent::new("Tester", Position::new(1.0, 2.0), &config.agent, 1);
        let json = serde_json::to_string(&agent.debug_snapshot()).unwrap();
        assert!(json.contains("\"name\":\"Tester\""));
        assert!(json.contains("\"discovered_chunks\":0"));
    }
}
