//! A single grid cell.

use crate::biomes::Biome;
use crate::config::WorldConfig;
use crate::world::coords::TilePos;
use crate::world::entities::EntityId;

/// One tile of a chunk.
///
/// `present` and `destination` are weak references: they name an entity in
/// the registry but never own it.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    pub pos: TilePos,
    pub biome: Biome,
    /// Grass on Plains, berries on Forest, zero elsewhere
    pub resource: f32,
    /// Entity currently standing here
    pub present: Option<EntityId>,
    /// Entity that has claimed this tile as its movement target
    pub destination: Option<EntityId>,
}

impl Tile {
    pub fn new(pos: TilePos, biome: Biome, config: &WorldConfig) -> Self {
        Self {
            pos,
            biome,
            resource: resource_capacity(biome, config),
            present: None,
            destination: None,
        }
    }

    pub fn is_passable(&self) -> bool {
        self.biome.is_passable()
    }

    pub fn traversal_cost(&self) -> f32 {
        self.biome.traversal_cost()
    }

    /// Whether `id` may target this tile: a valid destination biome that is
    /// unclaimed or already claimed by `id`.
    pub fn is_available_to(&self, id: EntityId) -> bool {
        self.biome.is_valid_destination() && self.destination.map_or(true, |d| d == id)
    }

    /// Claim the destination slot. Fails if another entity holds it.
    pub fn reserve(&mut self, id: EntityId) -> bool {
        match self.destination {
            Some(holder) if holder != id => false,
            _ => {
                self.destination = Some(id);
                true
            }
        }
    }

    /// Release the destination slot if `id` holds it.
    pub fn release(&mut self, id: EntityId) {
        if self.destination == Some(id) {
            self.destination = None;
        }
    }

    /// Remove up to `amount` of the tile resource, returning what was taken.
    pub fn take_resource(&mut self, amount: f32) -> f32 {
        let taken = amount.max(0.0).min(self.resource);
        self.resource -= taken;
        taken
    }

    /// Regrow toward the biome's capacity.
    pub fn regrow(&mut self, amount: f32, config: &WorldConfig) {
        let cap = resource_capacity(self.biome, config);
        self.resource = (self.resource + amount).min(cap);
    }
}

/// Resource a fresh tile of `biome` starts with (and regrows to).
pub fn resource_capacity(biome: Biome, config: &WorldConfig) -> f32 {
    match biome {
        Biome::Plains => config.initial_grass,
        Biome::Forest => config.initial_berries,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_is_single_slot() {
        let config = WorldConfig::default();
        let mut tile = Tile::new(TilePos::new(0, 0), Biome::Plains, &config);
        let a = EntityId(1);
        let b = EntityId(2);

        assert!(tile.reserve(a));
        assert!(tile.reserve(a));
        assert!(!tile.reserve(b));
        assert!(!tile.is_available_to(b));

        tile.release(b);
        assert_eq!(tile.destination, Some(a));
        tile.release(a);
        assert!(tile.is_available_to(b));
    }

    #[test]
    fn test_water_is_never_available() {
        let config = WorldConfig::default();
        let tile = Tile::new(TilePos::new(0, 0), Biome::Water, &config);
        assert!(!tile.is_available_to(EntityId(1)));
        assert!(!tile.is_passable());
    }

    #[test]
    fn test_resource_take_and_regrow() {
        let config = WorldConfig::default();
        let mut tile = Tile::new(TilePos::new(0, 0), Biome::Plains, &config);
        assert_eq!(tile.resource, config.initial_grass);

        assert_eq!(tile.take_resource(30.0), 30.0);
        assert_eq!(tile.take_resource(500.0), config.initial_grass - 30.0);
        assert_eq!(tile.resource, 0.0);

        tile.regrow(1000.0, &config);
        assert_eq!(tile.resource, config.initial_grass);
    }
}
