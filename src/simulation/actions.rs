//! Built-in task actions.
//!
//! An action runs one step per tick and reports how it went. It never
//! touches the queue; the owning task turns the status into a transition.

use std::f32::consts::TAU;

use rand::Rng;
use tracing::{debug, trace};

use crate::biomes::Biome;
use crate::config::{AgentParams, NeedsParams, SimConfig, SpawnParams};
use crate::simulation::agent::{Agent, Steering};
use crate::simulation::inventory::Item;
use crate::simulation::needs::Need;
use crate::simulation::pathfinding::Pathfinder;
use crate::world::{EntityBody, EntityId, EntityKind, Event, TilePos, World};

/// How far from a resource tile's centre an agent can still use it
const CONSUME_REACH: f32 = 1.5;

/// Per-agent view of the settings actions need.
#[derive(Clone, Copy, Debug)]
pub struct ActionContext<'a> {
    pub id: EntityId,
    pub agent: &'a AgentParams,
    pub needs: &'a NeedsParams,
    pub spawn: &'a SpawnParams,
    pub pathfinder: Pathfinder,
}

impl<'a> ActionContext<'a> {
    pub fn new(id: EntityId, config: &'a SimConfig) -> Self {
        Self {
            id,
            agent: &config.agent,
            needs: &config.needs,
            spawn: &config.spawn,
            pathfinder: Pathfinder::from_params(&config.agent),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionStatus {
    /// Progress made, call again next tick
    Running,
    Completed,
    /// No progress this tick; may recover
    Stalled,
    /// Cannot succeed any more
    Failed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Walk to the centre of `target`
    MoveTo { target: TilePos },
    /// Drink from the water tile `source` until thirst is satisfied
    Drink { source: TilePos },
    /// Pick berries from the forest tile `source`
    Forage { source: TilePos },
    /// Eat carried food, or the nearest food lying within reach
    EatFood,
    /// Chase and attack an animal until it dies
    Hunt { prey: EntityId },
    Rest,
    /// Walk to a random nearby tile, preferring unseen chunks
    Explore { target: Option<TilePos> },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::MoveTo { .. } => "move",
            Action::Drink { .. } => "drink",
            Action::Forage { .. } => "forage",
            Action::EatFood => "eat",
            Action::Hunt { .. } => "hunt",
            Action::Rest => "rest",
            Action::Explore { .. } => "explore",
        }
    }

    /// Energy per second the action costs while executing.
    pub fn energy_cost(&self, params: &AgentParams) -> f32 {
        match self {
            Action::MoveTo { .. } | Action::Explore { .. } => params.move_energy_cost,
            Action::Hunt { .. } => params.hunt_energy_cost,
            _ => 0.0,
        }
    }

    pub fn run(&mut self, agent: &mut Agent, world: &mut World, ctx: &ActionContext, dt: f32) -> ActionStatus {
        match self {
            Action::MoveTo { target } => move_to(agent, world, ctx, *target, dt),
            Action::Drink { source } => drink(agent, world, ctx, *source, dt),
            Action::Forage { source } => forage(agent, world, ctx, *source, dt),
            Action::EatFood => eat_food(agent, world, ctx, dt),
            Action::Hunt { prey } => hunt(agent, world, ctx, *prey, dt),
            Action::Rest => rest(agent, ctx, dt),
            Action::Explore { target } => explore(agent, world, ctx, target, dt),
        }
    }
}

fn move_to(agent: &mut Agent, world: &mut World, ctx: &ActionContext, target: TilePos, dt: f32) -> ActionStatus {
    match agent.steer_to(world, &ctx.pathfinder, target, dt) {
        Steering::Arrived => ActionStatus::Completed,
        Steering::Moving => ActionStatus::Running,
        Steering::Blocked => ActionStatus::Stalled,
    }
}

fn within_reach(agent: &Agent, source: TilePos) -> bool {
    agent.position.distance(source.center()) <= CONSUME_REACH + agent.size / 2.0
}

fn drink(agent: &mut Agent, world: &mut World, ctx: &ActionContext, source: TilePos, dt: f32) -> ActionStatus {
    agent.stop();
    if !within_reach(agent, source) {
        return ActionStatus::Stalled;
    }
    if world.biome_at(source) != Biome::Water {
        debug!(agent = %agent.name, %source, "water source is gone");
        return ActionStatus::Failed;
    }
    agent.needs.consume(Need::Thirst, ctx.needs.drink_rate * dt);
    if agent.needs.is_satisfied(Need::Thirst, ctx.needs) {
        ActionStatus::Completed
    } else {
        ActionStatus::Running
    }
}

fn forage(agent: &mut Agent, world: &mut World, ctx: &ActionContext, source: TilePos, dt: f32) -> ActionStatus {
    agent.stop();
    if !within_reach(agent, source) {
        return ActionStatus::Stalled;
    }
    let tile = world.tile_mut(source);
    if tile.biome != Biome::Forest {
        return ActionStatus::Failed;
    }
    let taken = tile.take_resource(ctx.needs.forage_rate * dt);
    let left = tile.resource;
    if taken <= 0.0 {
        return ActionStatus::Failed;
    }
    agent.needs.consume(Need::Hunger, taken);
    if agent.needs.is_satisfied(Need::Hunger, ctx.needs) || left <= 0.0 {
        ActionStatus::Completed
    } else {
        ActionStatus::Running
    }
}

/// Apply `nutrition` to hunger; whatever hunger could not absorb is carried.
fn eat(agent: &mut Agent, name: &str, nutrition: f32) {
    let gained = agent.needs.consume(Need::Hunger, nutrition);
    let leftover = nutrition - gained;
    if leftover > 0.0 {
        let rejected = agent.inventory.add_item(Item::food(name, 1, leftover));
        if rejected > 0 {
            trace!(agent = %agent.name, item = name, "inventory full, leftovers dropped");
        }
    }
    debug!(agent = %agent.name, item = name, gained, "ate");
}

fn eat_food(agent: &mut Agent, world: &mut World, ctx: &ActionContext, dt: f32) -> ActionStatus {
    if let Some(item) = agent.inventory.take_food() {
        agent.stop();
        let gained = agent.needs.consume(Need::Hunger, item.nutrition);
        debug!(agent = %agent.name, item = %item.name, gained, "ate carried food");
        return ActionStatus::Completed;
    }

    let (x, y) = (agent.position.x, agent.position.y);
    let nearest = world
        .search_for_entities(x, y, ctx.agent.vision_range, EntityKind::Food)
        .into_iter()
        .min_by(|a, b| {
            a.position()
                .distance(agent.position)
                .total_cmp(&b.position().distance(agent.position))
                .then(a.id.cmp(&b.id))
        })
        .map(|e| (e.id, e.position()));
    let Some((food_id, at)) = nearest else {
        agent.stop();
        return ActionStatus::Failed;
    };

    if agent.position.distance(at) <= ctx.agent.eat_range + agent.size / 2.0 {
        agent.stop();
        let Some(entity) = world.remove_entity(food_id) else {
            return ActionStatus::Stalled;
        };
        if let EntityBody::Food(food) = entity.body {
            eat(agent, food.kind.name(), food.nutrition);
        }
        return ActionStatus::Completed;
    }

    match agent.steer_to(world, &ctx.pathfinder, at.tile(), dt) {
        Steering::Blocked => ActionStatus::Stalled,
        _ => ActionStatus::Running,
    }
}

fn hunt(agent: &mut Agent, world: &mut World, ctx: &ActionContext, prey: EntityId, dt: f32) -> ActionStatus {
    let target = world
        .entity(prey)
        .filter(|e| e.kind() == EntityKind::Animal)
        .map(|e| e.position());
    let Some(target) = target else {
        agent.stop();
        return ActionStatus::Completed;
    };

    let distance = agent.position.distance(target);
    if distance <= ctx.agent.attack_range + agent.size / 2.0 {
        agent.stop();
        world.emit(Event::attack(ctx.id, prey, ctx.agent.attack_damage * dt));
        return ActionStatus::Running;
    }
    if distance > ctx.agent.vision_range {
        debug!(agent = %agent.name, %prey, "prey escaped");
        agent.stop();
        return ActionStatus::Failed;
    }
    match agent.steer_to(world, &ctx.pathfinder, target.tile(), dt) {
        Steering::Blocked => ActionStatus::Stalled,
        _ => ActionStatus::Running,
    }
}

fn rest(agent: &mut Agent, ctx: &ActionContext, dt: f32) -> ActionStatus {
    agent.stop();
    agent.needs.consume(Need::Energy, ctx.needs.rest_rate * dt);
    if agent.needs.is_satisfied(Need::Energy, ctx.needs) {
        ActionStatus::Completed
    } else {
        ActionStatus::Running
    }
}

fn explore(
    agent: &mut Agent,
    world: &mut World,
    ctx: &ActionContext,
    target: &mut Option<TilePos>,
    dt: f32,
) -> ActionStatus {
    let goal = match *target {
        Some(goal) => goal,
        None => match pick_explore_target(agent, world, ctx) {
            Some(goal) => {
                trace!(agent = %agent.name, %goal, "exploring");
                *target = Some(goal);
                goal
            }
            None => return ActionStatus::Stalled,
        },
    };
    match agent.steer_to(world, &ctx.pathfinder, goal, dt) {
        Steering::Arrived => ActionStatus::Completed,
        Steering::Moving => ActionStatus::Running,
        Steering::Blocked => {
            *target = None;
            ActionStatus::Stalled
        }
    }
}

/// Sample up to `explore_attempts` tiles on a ring around the agent. The
/// first one in an undiscovered chunk wins; otherwise the first valid one.
pub fn pick_explore_target(agent: &mut Agent, world: &mut World, ctx: &ActionContext) -> Option<TilePos> {
    let params = ctx.agent;
    let lo = params.explore_min_distance.min(params.explore_max_distance).max(1.0);
    let hi = params.explore_max_distance.max(lo);
    let origin = agent.position;
    let chunk_size = world.chunk_size();

    let mut fallback = None;
    for _ in 0..params.explore_attempts {
        let angle = agent.rng.gen_range(0.0..TAU);
        let distance = agent.rng.gen_range(lo..=hi);
        let candidate = TilePos::new(
            (origin.x + angle.cos() * distance).floor() as i32,
            (origin.y + angle.sin() * distance).floor() as i32,
        );
        if !world.tile(candidate).is_available_to(ctx.id) {
            continue;
        }
        if !agent.memory.has_discovered(candidate.chunk(chunk_size)) {
            return Some(candidate);
        }
        fallback.get_or_insert(candidate);
    }
    fallback
}
