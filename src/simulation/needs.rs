//! Agent needs: hunger, thirst and energy, each kept in [0, 100].

use serde::{Deserialize, Serialize};

use crate::config::NeedsParams;

/// Upper bound of every need
pub const NEED_MAX: f32 = 100.0;

/// The three needs, in the order decision logic evaluates them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Need {
    Thirst,
    Hunger,
    Energy,
}

impl Need {
    /// Evaluation order: thirst before hunger before energy.
    pub fn all() -> [Need; 3] {
        [Need::Thirst, Need::Hunger, Need::Energy]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Need::Thirst => "thirst",
            Need::Hunger => "hunger",
            Need::Energy => "energy",
        }
    }
}

impl std::fmt::Display for Need {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Current need levels (100 = fully satisfied, 0 = depleted)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Needs {
    pub hunger: f32,
    pub thirst: f32,
    pub energy: f32,
}

impl Default for Needs {
    fn default() -> Self {
        Needs { hunger: NEED_MAX, thirst: NEED_MAX, energy: NEED_MAX }
    }
}

impl Needs {
    pub fn get(&self, need: Need) -> f32 {
        match need {
            Need::Hunger => self.hunger,
            Need::Thirst => self.thirst,
            Need::Energy => self.energy,
        }
    }

    fn slot(&mut self, need: Need) -> &mut f32 {
        match need {
            Need::Hunger => &mut self.hunger,
            Need::Thirst => &mut self.thirst,
            Need::Energy => &mut self.energy,
        }
    }

    /// Set a need, clamped to [0, 100].
    pub fn set(&mut self, need: Need, value: f32) {
        *self.slot(need) = value.clamp(0.0, NEED_MAX);
    }

    /// Apply per-second decay for `dt` seconds. Never drops below zero.
    pub fn decay(&mut self, params: &NeedsParams, dt: f32) {
        for need in Need::all() {
            let value = self.get(need) - params.decay(need) * dt;
            self.set(need, value);
        }
    }

    /// Raise a need by `amount`, capped at 100. Returns the gain applied.
    pub fn consume(&mut self, need: Need, amount: f32) -> f32 {
        let before = self.get(need);
        self.set(need, before + amount.max(0.0));
        self.get(need) - before
    }

    /// Spend energy if at least `cost` is available. Nothing is deducted
    /// on failure.
    pub fn try_spend_energy(&mut self, cost: f32) -> bool {
        if self.energy < cost {
            return false;
        }
        self.set(Need::Energy, self.energy - cost);
        true
    }

    pub fn is_low(&self, need: Need, params: &NeedsParams) -> bool {
        self.get(need) < params.threshold(need)
    }

    pub fn is_satisfied(&self, need: Need, params: &NeedsParams) -> bool {
        self.get(need) >= params.satisfied_level
    }

    /// First need (in evaluation order) that has reached zero.
    pub fn depleted(&self) -> Option<Need> {
        Need::all().into_iter().find(|&need| self.get(need) <= 0.0)
    }
}

impl NeedsParams {
    pub fn decay(&self, need: Need) -> f32 {
        match need {
            Need::Hunger => self.hunger_decay,
            Need::Thirst => self.thirst_decay,
            Need::Energy => self.energy_decay,
        }
    }

    pub fn threshold(&self, need: Need) -> f32 {
        match need {
            Need::Hunger => self.hunger_threshold,
            Need::Thirst => self.thirst_threshold,
            Need::Energy => self.energy_threshold,
        }
    }
}
