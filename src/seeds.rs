//! Seed management for the simulation
//!
//! Provides separate seeds for each random system, so terrain stays identical
//! while spawning or agent behaviour is varied (and vice versa).

use std::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;

/// Seeds for all random systems.
///
/// Each system gets its own seed, derived from a master seed by default.
/// Individual seeds can be overridden for experimentation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Terrain noise (chunk generation must be reproducible from this alone)
    pub terrain: u64,
    /// Food and animal spawning
    pub spawning: u64,
    /// Per-agent decision streams (exploration targets, names)
    pub agents: u64,
}

impl WorldSeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            terrain: derive_seed(master, "terrain"),
            spawning: derive_seed(master, "spawning"),
            agents: derive_seed(master, "agents"),
        }
    }

    /// Create a builder for customizing individual seeds
    pub fn builder(master: u64) -> WorldSeedsBuilder {
        WorldSeedsBuilder::new(master)
    }

    /// Seed for one agent's private random stream.
    pub fn for_agent(&self, agent_id: u64) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.agents.hash(&mut hasher);
        agent_id.hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for WorldSeeds {
    fn default() -> Self {
        Self::from_master(rand::random())
    }
}

/// Builder for customizing individual seeds while deriving others from master
pub struct WorldSeedsBuilder {
    seeds: WorldSeeds,
}

impl WorldSeedsBuilder {
    pub fn new(master: u64) -> Self {
        Self {
            seeds: WorldSeeds::from_master(master),
        }
    }

    /// Override the terrain seed
    pub fn terrain(mut self, seed: u64) -> Self {
        self.seeds.terrain = seed;
        self
    }

    /// Override the spawning seed
    pub fn spawning(mut self, seed: u64) -> Self {
        self.seeds.spawning = seed;
        self
    }

    /// Override the agents seed
    pub fn agents(mut self, seed: u64) -> Self {
        self.seeds.agents = seed;
        self
    }

    /// Build the final WorldSeeds
    pub fn build(self) -> WorldSeeds {
        self.seeds
    }
}

/// Derive a sub-seed from a master seed and a system name.
fn derive_seed(master: u64, system: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    system.hash(&mut hasher);
    hasher.finish()
}

impl std::fmt::Display for WorldSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WorldSeeds {{ master: {}, terrain: {}, spawning: {}, agents: {} }}",
            self.master, self.terrain, self.spawning, self.agents,
        )
    }
}
