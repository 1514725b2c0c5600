//! Bounded grid A* over world tiles, with line-of-sight path compaction.
//!
//! Search is 4-connected with per-biome step costs and a Euclidean heuristic.
//! Every call is bounded twice: popping a node farther than the vision range
//! from the start ends the search with a partial path to it (agents plan as
//! far as they see and replan when closer), and a hard iteration cap ends it
//! with no path. The vision check comes first.
//! Neither is an error; callers retry on a later tick.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::trace;

use crate::config::AgentParams;
use crate::world::{Position, TilePos, World};

/// How a grid search ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathOutcome {
    /// Goal reached
    Found,
    /// Stopped at the vision range; path leads toward the goal
    Partial,
    /// Iteration cap hit
    Exhausted,
    /// Goal impassable or every reachable tile explored
    Unreachable,
}

/// Raw search result. `tiles` excludes the start tile.
#[derive(Clone, Debug)]
pub struct GridPath {
    pub tiles: Vec<TilePos>,
    pub outcome: PathOutcome,
    pub iterations: usize,
}

#[derive(Clone, Copy, PartialEq)]
struct Node {
    pos: TilePos,
    g: f32,
    f: f32,
    h: f32,
    seq: u64,
}

impl Eq for Node {}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on f, then h, then insertion order
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Run A* from `start` to `goal` and return the raw tile path.
pub fn search(
    world: &mut World,
    start: TilePos,
    goal: TilePos,
    vision_range: f32,
    max_iterations: usize,
) -> GridPath {
    let done = |tiles: Vec<TilePos>, outcome, iterations| GridPath { tiles, outcome, iterations };

    if start == goal {
        return done(Vec::new(), PathOutcome::Found, 0);
    }
    if !world.traversal_cost(goal).is_finite() {
        return done(Vec::new(), PathOutcome::Unreachable, 0);
    }

    let heuristic = |pos: TilePos| pos.distance(goal);

    let mut open = BinaryHeap::new();
    let mut came_from: HashMap<TilePos, TilePos> = HashMap::new();
    let mut g_score: HashMap<TilePos, f32> = HashMap::new();
    let mut closed: HashSet<TilePos> = HashSet::new();
    let mut seq = 0u64;

    let start_h = heuristic(start);
    g_score.insert(start, 0.0);
    open.push(Node { pos: start, g: 0.0, f: start_h, h: start_h, seq });
    let mut iterations = 0;

    while let Some(current) = open.pop() {
        if current.pos == goal {
            return done(reconstruct(&came_from, start, goal), PathOutcome::Found, iterations);
        }
        if !closed.insert(current.pos) {
            continue;
        }
        // The first node popped past the vision range has the lowest f on the
        // frontier, so its route is the best known prefix even when that
        // route first leads away from the goal.
        if current.pos.distance(start) > vision_range {
            let tiles = reconstruct(&came_from, start, current.pos);
            return done(tiles, PathOutcome::Partial, iterations);
        }
        iterations += 1;
        if iterations > max_iterations {
            trace!(%start, %goal, iterations, "path search exhausted");
            return done(Vec::new(), PathOutcome::Exhausted, iterations);
        }

        for neighbor in current.pos.neighbors() {
            if closed.contains(&neighbor) {
                continue;
            }
            let cost = world.traversal_cost(neighbor);
            if !cost.is_finite() {
                continue;
            }
            let tentative = current.g + cost;
            if g_score.get(&neighbor).is_some_and(|&g| tentative >= g) {
                continue;
            }
            came_from.insert(neighbor, current.pos);
            g_score.insert(neighbor, tentative);
            seq += 1;
            let h = heuristic(neighbor);
            open.push(Node { pos: neighbor, g: tentative, f: tentative + h, h, seq });
        }
    }

    done(Vec::new(), PathOutcome::Unreachable, iterations)
}

fn reconstruct(came_from: &HashMap<TilePos, TilePos>, start: TilePos, end: TilePos) -> Vec<TilePos> {
    let mut path = Vec::new();
    let mut pos = end;
    while pos != start {
        path.push(pos);
        match came_from.get(&pos) {
            Some(&prev) => pos = prev,
            None => break,
        }
    }
    path.reverse();
    path
}

/// Plan a route and return compacted waypoints at tile centres. Empty means
/// "no route under current bounds".
pub fn a_star(
    world: &mut World,
    start: TilePos,
    goal: TilePos,
    vision_range: f32,
    max_iterations: usize,
) -> Vec<Position> {
    if start == goal {
        return vec![goal.center()];
    }
    let raw = search(world, start, goal, vision_range, max_iterations);
    if raw.tiles.is_empty() {
        return Vec::new();
    }

    let mut full = Vec::with_capacity(raw.tiles.len() + 1);
    full.push(start);
    full.extend(raw.tiles);
    simplify_path(world, &full)
        .into_iter()
        .skip(1)
        .map(|tile| tile.center())
        .collect()
}

/// Line-of-sight compaction. Keeps the first and last points and only the
/// points where a straight walk would otherwise cross an impassable tile.
pub fn simplify_path(world: &mut World, path: &[TilePos]) -> Vec<TilePos> {
    let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
        return Vec::new();
    };
    if path.len() <= 2 {
        return path.to_vec();
    }

    let mut result = vec![first];
    let mut anchor = 0;
    let mut i = anchor + 2;
    while i < path.len() {
        if !line_of_sight(world, path[anchor], path[i]) {
            anchor = i - 1;
            result.push(path[anchor]);
        }
        i += 1;
    }
    result.push(last);
    result
}

/// Whether every tile on the line from `a` to `b` is passable. A diagonal
/// step also needs both tiles it squeezes between.
pub fn line_of_sight(world: &mut World, a: TilePos, b: TilePos) -> bool {
    let line = bresenham_line(a, b);
    for pair in line.windows(2) {
        let (p, q) = (pair[0], pair[1]);
        if p.x != q.x && p.y != q.y {
            let side_a = TilePos::new(q.x, p.y);
            let side_b = TilePos::new(p.x, q.y);
            if !world.traversal_cost(side_a).is_finite() || !world.traversal_cost(side_b).is_finite() {
                return false;
            }
        }
    }
    line.into_iter().all(|tile| world.traversal_cost(tile).is_finite())
}

/// Integer line from `a` to `b`, both ends included.
pub fn bresenham_line(a: TilePos, b: TilePos) -> Vec<TilePos> {
    let mut line = Vec::new();

    let dx = (b.x - a.x).abs();
    let dy = -(b.y - a.y).abs();
    let sx = if a.x < b.x { 1 } else { -1 };
    let sy = if a.y < b.y { 1 } else { -1 };
    let mut err = dx + dy;

    let (mut x, mut y) = (a.x, a.y);
    loop {
        line.push(TilePos::new(x, y));
        if x == b.x && y == b.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    line
}

/// Planning bounds shared by every agent.
#[derive(Clone, Copy, Debug)]
pub struct Pathfinder {
    pub vision_range: f32,
    pub max_iterations: usize,
}

impl Pathfinder {
    pub fn new(vision_range: f32, max_iterations: usize) -> Self {
        Self { vision_range, max_iterations }
    }

    pub fn from_params(params: &AgentParams) -> Self {
        Self::new(params.vision_range, params.max_path_iterations)
    }

    pub fn find_path(&self, world: &mut World, from: Position, to: TilePos) -> Vec<Position> {
        a_star(world, from.tile(), to, self.vision_range, self.max_iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biomes::{Biome, BiomeBand};
    use crate::config::SimConfig;

    fn plains_world() -> World {
        let mut config = SimConfig::with_seed(3);
        config.world.chunk_size = 8;
        config.world.biomes = vec![BiomeBand::new(Biome::Plains, -1.0, 1.01)];
        World::new(config).unwrap()
    }

    /// Vertical water wall at x = 5 from y = -3 to y = 3.
    fn walled_world() -> World {
        let mut world = plains_world();
        for y in -3..=3 {
            world.set_biome(TilePos::new(5, y), Biome::Water);
        }
        world
    }

    fn assert_sound(world: &mut World, start: TilePos, tiles: &[TilePos]) {
        let mut prev = start;
        for &tile in tiles {
            let step = (tile.x - prev.x).abs() + (tile.y - prev.y).abs();
            assert_eq!(step, 1, "non-adjacent step {} -> {}", prev, tile);
            assert!(world.traversal_cost(tile).is_finite());
            prev = tile;
        }
    }

    #[test]
    fn test_straight_path_on_open_ground() {
        let mut world = plains_world();
        let raw = search(&mut world, TilePos::new(0, 0), TilePos::new(6, 0), 50.0, 1000);
        assert_eq!(raw.outcome, PathOutcome::Found);
        assert_eq!(raw.tiles.len(), 6);
        assert_eq!(raw.tiles.last(), Some(&TilePos::new(6, 0)));

        let path = a_star(&mut world, TilePos::new(0, 0), TilePos::new(6, 0), 50.0, 1000);
        assert_eq!(path, vec![Position::new(6.5, 0.5)]);
    }

    #[test]
    fn test_path_routes_around_water() {
        let mut world = walled_world();
        let start = TilePos::new(0, 0);
        let goal = TilePos::new(10, 0);
        let raw = search(&mut world, start, goal, 50.0, 5000);
        assert_eq!(raw.outcome, PathOutcome::Found);
        assert_sound(&mut world, start, &raw.tiles);
        assert_eq!(raw.tiles.last(), Some(&goal));
        assert!(raw.tiles.iter().all(|t| t.x != 5 || t.y.abs() > 3));
    }

    #[test]
    fn test_mountains_cost_more_than_detour() {
        let mut world = plains_world();
        world.set_biome(TilePos::new(2, 0), Biome::Mountains);
        let raw = search(&mut world, TilePos::new(0, 0), TilePos::new(4, 0), 50.0, 1000);
        assert_eq!(raw.outcome, PathOutcome::Found);
        assert!(!raw.tiles.contains(&TilePos::new(2, 0)));
    }

    #[test]
    fn test_unknown_biome_is_impassable() {
        let mut world = plains_world();
        world.set_biome(TilePos::new(1, 0), Biome::Unknown);
        let raw = search(&mut world, TilePos::new(0, 0), TilePos::new(2, 0), 50.0, 1000);
        assert!(!raw.tiles.contains(&TilePos::new(1, 0)));
        assert!(search(&mut world, TilePos::new(0, 0), TilePos::new(1, 0), 50.0, 1000).tiles.is_empty());
    }

    #[test]
    fn test_enclosed_goal_terminates_within_budget() {
        let mut world = plains_world();
        let goal = TilePos::new(10, 10);
        for n in goal.neighbors() {
            world.set_biome(n, Biome::Water);
        }
        let raw = search(&mut world, TilePos::new(0, 0), goal, 10_000.0, 300);
        assert!(raw.tiles.is_empty());
        assert_eq!(raw.outcome, PathOutcome::Exhausted);
        assert!(raw.iterations <= 301);
    }

    #[test]
    fn test_island_start_is_unreachable() {
        let mut world = plains_world();
        let start = TilePos::new(0, 0);
        for n in start.neighbors() {
            world.set_biome(n, Biome::Water);
        }
        let raw = search(&mut world, start, TilePos::new(6, 6), 100.0, 1000);
        assert_eq!(raw.outcome, PathOutcome::Unreachable);
        assert!(raw.tiles.is_empty());
    }

    #[test]
    fn test_vision_cutoff_returns_partial_path() {
        let mut world = plains_world();
        let start = TilePos::new(0, 0);
        let goal = TilePos::new(40, 0);
        let raw = search(&mut world, start, goal, 8.0, 10_000);
        assert_eq!(raw.outcome, PathOutcome::Partial);
        assert!(!raw.tiles.is_empty());
        assert_sound(&mut world, start, &raw.tiles);
        let end = *raw.tiles.last().unwrap();
        assert!(end.distance(goal) < start.distance(goal));
        assert!(end.distance(start) <= 9.0);
    }

    #[test]
    fn test_vision_cutoff_wins_over_last_iteration() {
        let mut world = plains_world();
        let start = TilePos::new(0, 0);
        let raw = search(&mut world, start, TilePos::new(10, 0), 2.0, 3);
        assert_eq!(raw.outcome, PathOutcome::Partial);
        assert_eq!(raw.tiles, vec![TilePos::new(1, 0), TilePos::new(2, 0), TilePos::new(3, 0)]);
    }

    #[test]
    fn test_partial_path_may_lead_away_from_goal() {
        let mut world = plains_world();
        for y in -1..=30 {
            world.set_biome(TilePos::new(2, y), Biome::Water);
        }
        let start = TilePos::new(1, 0);
        let raw = search(&mut world, start, TilePos::new(20, 0), 4.0, 10_000);
        assert_eq!(raw.outcome, PathOutcome::Partial);
        assert_sound(&mut world, start, &raw.tiles);
        assert_eq!(raw.tiles.first(), Some(&TilePos::new(1, -1)));
        assert!(raw.tiles.last().is_some_and(|end| end.x > 2));
    }

    #[test]
    fn test_simplified_path_properties() {
        let mut world = walled_world();
        let start = TilePos::new(0, 0);
        let raw = search(&mut world, start, TilePos::new(10, 0), 50.0, 5000);
        let mut full = vec![start];
        full.extend(raw.tiles);

        let simple = simplify_path(&mut world, &full);
        assert_eq!(simple.first(), full.first());
        assert_eq!(simple.last(), full.last());
        assert!(simple.len() <= full.len());
        assert!(simple.len() < full.len());
        for pair in simple.windows(2) {
            assert!(line_of_sight(&mut world, pair[0], pair[1]));
        }
    }

    #[test]
    fn test_a_star_waypoints_are_tile_centres() {
        let mut world = walled_world();
        let path = a_star(&mut world, TilePos::new(0, 0), TilePos::new(10, 0), 50.0, 5000);
        assert!(path.len() >= 2);
        assert_eq!(path.last(), Some(&Position::new(10.5, 0.5)));
        for p in &path {
            assert!((p.x - p.x.floor() - 0.5).abs() < 1e-6);
            assert!((p.y - p.y.floor() - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_line_of_sight_blocked_by_water() {
        let mut world = walled_world();
        assert!(!line_of_sight(&mut world, TilePos::new(0, 0), TilePos::new(10, 0)));
        assert!(line_of_sight(&mut world, TilePos::new(0, 5), TilePos::new(10, 5)));
        assert_eq!(bresenham_line(TilePos::new(0, 0), TilePos::new(3, -3)).len(), 4);
        assert_eq!(bresenham_line(TilePos::new(2, 2), TilePos::new(2, 2)), vec![TilePos::new(2, 2)]);
    }
}
