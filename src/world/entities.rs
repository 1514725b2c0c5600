//! Entity records and the type-keyed registry.
//!
//! An entity is a common record (`id`) around a tagged body. Per-kind behaviour
//! dispatches on the body variant instead of an inheritance chain.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::simulation::agent::Agent;
use crate::simulation::fauna::{Animal, Food};
use crate::world::coords::Position;

/// Registry-assigned, never reused within a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Agent,
    Animal,
    Food,
}

impl EntityKind {
    pub fn all() -> &'static [EntityKind] {
        &[EntityKind::Agent, EntityKind::Animal, EntityKind::Food]
    }

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Agent => "agent",
            EntityKind::Animal => "animal",
            EntityKind::Food => "food",
        }
    }
}

#[derive(Clone, Debug)]
pub enum EntityBody {
    Agent(Box<Agent>),
    Animal(Animal),
    Food(Food),
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub body: EntityBody,
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self.body {
            EntityBody::Agent(_) => EntityKind::Agent,
            EntityBody::Animal(_) => EntityKind::Animal,
            EntityBody::Food(_) => EntityKind::Food,
        }
    }

    pub fn position(&self) -> Position {
        match &self.body {
            EntityBody::Agent(agent) => agent.position,
            EntityBody::Animal(animal) => animal.position,
            EntityBody::Food(food) => food.position,
        }
    }

    pub fn size(&self) -> f32 {
        match &self.body {
            EntityBody::Agent(agent) => agent.size,
            EntityBody::Animal(animal) => animal.size,
            EntityBody::Food(_) => 0.5,
        }
    }

    pub fn as_agent(&self) -> Option<&Agent> {
        match &self.body {
            EntityBody::Agent(agent) => Some(agent),
            _ => None,
        }
    }

    pub fn as_animal(&self) -> Option<&Animal> {
        match &self.body {
            EntityBody::Animal(animal) => Some(animal),
            _ => None,
        }
    }

    pub fn as_animal_mut(&mut self) -> Option<&mut Animal> {
        match &mut self.body {
            EntityBody::Animal(animal) => Some(animal),
            _ => None,
        }
    }

    pub fn as_food(&self) -> Option<&Food> {
        match &self.body {
            EntityBody::Food(food) => Some(food),
            _ => None,
        }
    }
}

/// Live entities grouped by kind. Order within a kind is not significant:
/// removal swaps the last entity into the hole.
#[derive(Clone, Debug, Default)]
pub struct EntityRegistry {
    by_kind: HashMap<EntityKind, Vec<Entity>>,
    next_id: u64,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next id. Ids are monotonic and start at 1.
    pub fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId(self.next_id)
    }

    pub fn insert(&mut self, entity: Entity) {
        self.by_kind.entry(entity.kind()).or_default().push(entity);
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        for list in self.by_kind.values_mut() {
            if let Some(idx) = list.iter().position(|e| e.id == id) {
                return Some(list.swap_remove(idx));
            }
        }
        None
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.by_kind.values().flatten().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.by_kind.values_mut().flatten().find(|e| e.id == id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn of_kind(&self, kind: EntityKind) -> &[Entity] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        EntityKind::all().iter().flat_map(move |kind| self.of_kind(*kind).iter())
    }

    /// Ids of one kind, sorted, for iteration that mutates the registry.
    pub fn ids(&self, kind: EntityKind) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.of_kind(kind).iter().map(|e| e.id).collect();
        ids.sort();
        ids
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.of_kind(kind).len()
    }

    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::fauna::FoodKind;

    fn food(registry: &mut EntityRegistry, x: f32) -> Entity {
        Entity {
            id: registry.allocate_id(),
            body: EntityBody::Food(Food::new(Position::new(x, 0.0), FoodKind::Fruit, 10.0)),
        }
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut registry = EntityRegistry::new();
        let a = registry.allocate_id();
        let b = registry.allocate_id();
        assert!(b > a);
        assert_eq!(a, EntityId(1));
    }

    #[test]
    fn test_insert_get_remove() {
        let mut registry = EntityRegistry::new();
        let first = food(&mut registry, 1.0);
        let second = food(&mut registry, 2.0);
        let (id1, id2) = (first.id, second.id);
        registry.insert(first);
        registry.insert(second);

        assert_eq!(registry.count(EntityKind::Food), 2);
        assert_eq!(registry.count(EntityKind::Agent), 0);
        assert_eq!(registry.get(id2).map(|e| e.position().x), Some(2.0));

        let removed = registry.remove(id1).unwrap();
        assert_eq!(removed.kind(), EntityKind::Food);
        assert!(!registry.contains(id1));
        assert!(registry.contains(id2));
        assert!(registry.remove(id1).is_none());
        assert_eq!(registry.len(), 1);
    }
}
