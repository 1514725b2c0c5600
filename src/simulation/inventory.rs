//! Carried items, stacked by name and nutrition.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub weight: f32,
    pub quantity: u32,
    /// Hunger restored per unit eaten; zero for inedible items
    pub nutrition: f32,
}

impl Item {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Item { name: name.into(), weight: 1.0, quantity, nutrition: 0.0 }
    }

    pub fn food(name: impl Into<String>, quantity: u32, nutrition: f32) -> Self {
        Item { nutrition, ..Item::new(name, quantity) }
    }

    pub fn is_edible(&self) -> bool {
        self.nutrition > 0.0
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (x{})", self.name, self.quantity)
    }
}

/// Item stacks; `capacity` bounds the total unit count. Two items share a
/// stack only if their name and per-unit nutrition both match, so leftovers
/// of different sizes never average out.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub capacity: u32,
    items: Vec<Item>,
}

impl Inventory {
    pub fn new(capacity: u32) -> Self {
        Inventory { capacity, items: Vec::new() }
    }

    /// Total units carried
    pub fn len(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn free_space(&self) -> u32 {
        self.capacity.saturating_sub(self.len())
    }

    /// Add as many units as fit, stacking onto a matching stack. Returns the
    /// number of units that did not fit.
    pub fn add_item(&mut self, item: Item) -> u32 {
        let accepted = item.quantity.min(self.free_space());
        let rejected = item.quantity - accepted;
        if accepted == 0 {
            return rejected;
        }
        match self.items.iter_mut().find(|s| s.name == item.name && s.nutrition == item.nutrition) {
            Some(stack) => stack.quantity += accepted,
            None => self.items.push(Item { quantity: accepted, ..item }),
        }
        rejected
    }

    /// Remove up to `quantity` units named `name`, across stacks in the order
    /// they were added. Returns how many were removed.
    pub fn remove_item(&mut self, name: &str, quantity: u32) -> u32 {
        let mut removed = 0;
        for stack in self.items.iter_mut().filter(|s| s.name == name) {
            let take = stack.quantity.min(quantity - removed);
            stack.quantity -= take;
            removed += take;
            if removed == quantity {
                break;
            }
        }
        self.items.retain(|s| s.quantity > 0);
        removed
    }

    pub fn has_item(&self, name: &str) -> bool {
        self.items.iter().any(|i| i.name == name)
    }

    pub fn quantity(&self, name: &str) -> u32 {
        self.items.iter().filter(|i| i.name == name).map(|i| i.quantity).sum()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Take one unit of the most nutritious edible item.
    pub fn take_food(&mut self) -> Option<Item> {
        let index = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, i)| i.is_edible())
            .max_by(|(_, a), (_, b)| a.nutrition.total_cmp(&b.nutrition))
            .map(|(index, _)| index)?;
        let stack = &mut self.items[index];
        let unit = Item { quantity: 1, ..stack.clone() };
        stack.quantity -= 1;
        if stack.quantity == 0 {
            self.items.remove(index);
        }
        Some(unit)
    }
}

impl std::fmt::Display for Inventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let items: Vec<String> = self.items.iter().map(Item::to_string).collect();
        write!(f, "Inventory: [{}]", items.join(", "))
    }
}
