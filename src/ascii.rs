//! ASCII rendering of the loaded world for debug output
//!
//! Renders a tile rectangle from whatever is currently loaded (never
//! generating), with optional entity, path and memory overlays.

use std::collections::{BTreeMap, HashSet};

use crate::biomes::Biome;
use crate::simulation::agent::Agent;
use crate::simulation::fauna::FoodKind;
use crate::world::{EntityBody, TilePos, World};

/// What the base layer shows
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AsciiMode {
    /// Biome characters
    Biome,
    /// Tile resource level, 0-9
    Resource,
}

impl AsciiMode {
    pub fn name(&self) -> &'static str {
        match self {
            AsciiMode::Biome => "Biome",
            AsciiMode::Resource => "Resource",
        }
    }

    pub fn all() -> &'static [AsciiMode] {
        &[AsciiMode::Biome, AsciiMode::Resource]
    }
}

/// Get ASCII character for a biome
pub fn biome_char(biome: &Biome) -> char {
    match biome {
        Biome::Water => '~',
        Biome::Beach => '.',
        Biome::Plains => '"',
        Biome::Forest => 'T',
        Biome::Mountains => '^',
        Biome::Unknown => '?',
    }
}

/// Resource amount as a digit, `-` for none
pub fn resource_char(amount: f32) -> char {
    if amount <= 0.0 {
        return '-';
    }
    let level = (amount / 10.0).floor().clamp(0.0, 9.0) as u32;
    char::from_digit(level, 10).unwrap_or('9')
}

/// Overlays drawn on top of the base layer
#[derive(Clone, Copy, Debug, Default)]
pub struct Overlay<'a> {
    /// Draw agents, animals and food
    pub entities: bool,
    /// Draw this agent's remaining path, and blank out chunks it has not seen
    pub focus: Option<&'a Agent>,
}

/// Render tiles from `min` to `max` inclusive. Unloaded tiles are blank.
pub fn render_viewport(world: &World, min: TilePos, max: TilePos, mode: AsciiMode, overlay: Overlay) -> String {
    let (x0, x1) = (min.x.min(max.x), min.x.max(max.x));
    let (y0, y1) = (min.y.min(max.y), min.y.max(max.y));
    let width = (x1 - x0 + 1) as usize;
    let height = (y1 - y0 + 1) as usize;
    let size = world.chunk_size();

    let mut marks: BTreeMap<TilePos, char> = BTreeMap::new();
    if overlay.entities {
        for entity in world.entities().iter() {
            let ch = match &entity.body {
                EntityBody::Agent(_) => '@',
                EntityBody::Animal(_) => 'a',
                EntityBody::Food(food) => match food.kind {
                    FoodKind::Fruit => '%',
                    FoodKind::Meat => '&',
                },
            };
            let tile = entity.position().tile();
            // Agents win over anything sharing their tile
            let slot = marks.entry(tile).or_insert(ch);
            if ch == '@' {
                *slot = ch;
            }
        }
    }

    let mut path: HashSet<TilePos> = HashSet::new();
    if let Some(agent) = overlay.focus {
        path.extend(agent.path.iter().map(|p| p.tile()));
        marks.insert(agent.position.tile(), '@');
    }

    let mut result = String::with_capacity((width + 1) * height);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let pos = TilePos::new(x, y);
            let known = overlay.focus.map_or(true, |a| a.memory.has_discovered(pos.chunk(size)));
            let ch = match world.peek_tile(pos) {
                None => ' ',
                Some(_) if !known => ' ',
                Some(tile) => {
                    if let Some(&mark) = marks.get(&pos) {
                        mark
                    } else if path.contains(&pos) {
                        '*'
                    } else {
                        match mode {
                            AsciiMode::Biome => biome_char(&tile.biome),
                            AsciiMode::Resource => resource_char(tile.resource),
                        }
                    }
                }
            };
            result.push(ch);
        }
        result.push('\n');
    }
    result
}

/// Generate legend for biome characters
pub fn biome_legend() -> String {
    let mut legend = String::new();
    legend.push_str("=== BIOME LEGEND ===\n");
    for biome in Biome::all() {
        legend.push_str(&format!("  {} {}\n", biome_char(biome), biome.name()));
    }
    legend.push_str("=== OVERLAYS ===\n");
    legend.push_str("  @ agent   a animal   % fruit   & meat   * path\n");
    legend
}

/// Count biomes over a rectangle of loaded tiles.
pub fn calculate_biome_stats(world: &World, min: TilePos, max: TilePos) -> BTreeMap<Biome, usize> {
    let mut stats = BTreeMap::new();
    for y in min.y.min(max.y)..=min.y.max(max.y) {
        for x in min.x.min(max.x)..=min.x.max(max.x) {
            if let Some(tile) = world.peek_tile(TilePos::new(x, y)) {
                *stats.entry(tile.biome).or_insert(0) += 1;
            }
        }
    }
    stats
}

/// Format a single character with ANSI true color (24-bit) - foreground and background
pub fn ansi_colored_char(ch: char, fg: (u8, u8, u8), bg: (u8, u8, u8)) -> String {
    format!(
        "\x1b[38;2;{};{};{}m\x1b[48;2;{};{};{}m{}\x1b[0m",
        fg.0, fg.1, fg.2,
        bg.0, bg.1, bg.2,
        ch
    )
}

/// Colour a plain rendering line by line, using each band's display colour
/// as the background of its biome character.
pub fn colorize(world: &World, rendered: &str) -> String {
    let colors: BTreeMap<char, (u8, u8, u8)> = world
        .classifier()
        .bands()
        .iter()
        .map(|band| (biome_char(&band.biome), band.display_color()))
        .collect();
    let mut out = String::with_capacity(rendered.len() * 8);
    for ch in rendered.chars() {
        match colors.get(&ch) {
            Some(&bg) => out.push_str(&ansi_colored_char(ch, (0, 0, 0), bg)),
            None => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biomes::BiomeBand;
    use crate::config::SimConfig;
    use crate::simulation::fauna::Food;
    use crate::world::{ChunkPos, Position};

    fn plains_world() -> World {
        let mut config = SimConfig::with_seed(2);
        config.world.chunk_size = 4;
        config.world.biomes = vec![BiomeBand::new(Biome::Plains, -1.0, 1.01)];
        World::new(config).unwrap()
    }

    #[test]
    fn test_renders_only_loaded_tiles() {
        let mut world = plains_world();
        world.set_biome(TilePos::new(1, 0), Biome::Water);
        world.get_chunk(ChunkPos::new(0, 0));

        let text = render_viewport(&world, TilePos::new(0, 0), TilePos::new(5, 1), AsciiMode::Biome, Overlay::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["\"~\"\"  ", "\"\"\"\"  "]);
    }

    #[test]
    fn test_entities_overlay() {
        let mut world = plains_world();
        world.get_chunk(ChunkPos::new(0, 0));
        world.add_entity(EntityBody::Food(Food::new(Position::new(2.5, 0.5), FoodKind::Fruit, 5.0)));

        let overlay = Overlay { entities: true, focus: None };
        let text = render_viewport(&world, TilePos::new(0, 0), TilePos::new(3, 0), AsciiMode::Biome, overlay);
        assert_eq!(text, "\"\"%\"\n");
    }

    #[test]
    fn test_focus_hides_unseen_chunks_and_draws_path() {
        let mut world = plains_world();
        world.load_chunks_around(0.0, 0.0, 1);
        let mut agent = Agent::new("Tester", Position::new(0.5, 0.5), &world.config().agent, 1);
        agent.memory.memorize_chunk(&world.get_chunk(ChunkPos::new(0, 0)).clone());
        agent.path.push_back(Position::new(2.5, 0.5));

        let overlay = Overlay { entities: false, focus: Some(&agent) };
        let text = render_viewport(&world, TilePos::new(-1, 0), TilePos::new(3, 0), AsciiMode::Biome, overlay);
        assert_eq!(text, " @\"*\"\n");
    }

    #[test]
    fn test_resource_mode_and_stats() {
        let mut world = plains_world();
        world.get_chunk(ChunkPos::new(0, 0));
        world.tile_mut(TilePos::new(0, 0)).resource = 0.0;
        world.tile_mut(TilePos::new(1, 0)).resource = 42.0;

        let text = render_viewport(&world, TilePos::new(0, 0), TilePos::new(1, 0), AsciiMode::Resource, Overlay::default());
        assert_eq!(text, "-4\n");

        let stats = calculate_biome_stats(&world, TilePos::new(0, 0), TilePos::new(3, 3));
        assert_eq!(stats.get(&Biome::Plains), Some(&16));
        assert!(biome_legend().contains("~ Water"));
    }
}
