//! Configuration parameters for the world and its inhabitants
//!
//! Loaded by an outside collaborator (usually from a JSON file) and handed to
//! the core as plain data. Every section defaults field by field, so partial
//! files are fine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::biomes::{default_bands, BiomeBand};
use crate::error::ConfigError;

/// Root configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub needs: NeedsParams,
    pub agent: AgentParams,
    pub spawn: SpawnParams,
}

/// Terrain and chunk lifecycle settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Side length of a chunk in tiles
    pub chunk_size: usize,
    /// Noise bands, lowest first
    pub biomes: Vec<BiomeBand>,
    /// Width of the blend zone at band edges (noise units)
    pub transition_zone: f64,
    pub noise: NoiseConfig,
    /// Cycles a chunk survives outside every view before eviction
    pub chunk_cache_duration: u32,
    /// Chunk radius loaded around the origin at world start
    pub initial_load_radius: i32,

    // Tile resources
    /// Grass on a fresh Plains tile
    pub initial_grass: f32,
    /// Berries on a fresh Forest tile
    pub initial_berries: f32,
    /// Resource units regrown per second on loaded tiles
    pub regrowth_rate: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            chunk_size: 16,
            biomes: default_bands(),
            transition_zone: 0.02,
            noise: NoiseConfig::default(),
            chunk_cache_duration: 3,
            initial_load_radius: 2,

            initial_grass: 100.0,
            initial_berries: 50.0,
            regrowth_rate: 0.5,
        }
    }
}

/// Noise generator settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub seed: u64,
    pub octaves: usize,
    /// Tiles per noise unit. Falls back to the chunk size.
    pub scale: Option<f64>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        NoiseConfig { seed: 42, octaves: 4, scale: None }
    }
}

/// Need decay, thresholds and recovery rates. All needs live in [0, 100].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedsParams {
    // Decay per second
    pub hunger_decay: f32,
    pub thirst_decay: f32,
    pub energy_decay: f32,

    // Below these the agent starts looking for a fix
    pub hunger_threshold: f32,
    pub thirst_threshold: f32,
    pub energy_threshold: f32,

    // Recovery per second while consuming
    pub drink_rate: f32,
    pub forage_rate: f32,
    pub rest_rate: f32,

    /// Consumption stops once a need reaches this level
    pub satisfied_level: f32,
    /// Remove agents whose any need hits zero
    pub lethal: bool,
}

impl Default for NeedsParams {
    fn default() -> Self {
        NeedsParams {
            hunger_decay: 0.3,
            thirst_decay: 0.4,
            energy_decay: 0.05,

            hunger_threshold: 30.0,
            thirst_threshold: 20.0,
            energy_threshold: 25.0,

            drink_rate: 10.0,
            forage_rate: 10.0,
            rest_rate: 5.0,

            satisfied_level: 100.0,
            lethal: true,
        }
    }
}

/// Agent body, perception, planning and task settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentParams {
    /// Body diameter in tiles
    pub size: f32,
    /// Tiles per second
    pub speed: f32,
    /// Planning horizon in tiles
    pub vision_range: f32,
    /// Chunks observed around the agent each tick
    pub vision_chunk_radius: i32,
    /// Hard A* expansion budget per call
    pub max_path_iterations: usize,

    // Exploration
    pub explore_attempts: usize,
    pub explore_min_distance: f32,
    pub explore_max_distance: f32,

    /// Consecutive stalled ticks before a task is cancelled
    pub task_stall_limit: u32,

    // Energy per second spent by tasks
    pub move_energy_cost: f32,
    pub hunt_energy_cost: f32,

    // Hunting and eating
    pub attack_damage: f32,
    pub attack_range: f32,
    pub eat_range: f32,
    pub inventory_capacity: u32,

    // Task priorities (higher runs first)
    pub rest_priority: i32,
    pub thirst_priority: i32,
    pub hunger_priority: i32,
    pub explore_priority: i32,
    pub wander_priority: i32,
}

impl Default for AgentParams {
    fn default() -> Self {
        AgentParams {
            size: 1.75,
            speed: 1.5,
            vision_range: 20.0,
            vision_chunk_radius: 1,
            max_path_iterations: 4000,

            explore_attempts: 10,
            explore_min_distance: 4.0,
            explore_max_distance: 15.0,

            task_stall_limit: 5,

            move_energy_cost: 0.2,
            hunt_energy_cost: 0.5,

            attack_damage: 25.0,
            attack_range: 1.5,
            eat_range: 2.0,
            inventory_capacity: 10,

            rest_priority: 90,
            thirst_priority: 80,
            hunger_priority: 70,
            explore_priority: 10,
            wander_priority: 1,
        }
    }
}

/// Food and animal population settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnParams {
    /// Ticks between spawn passes
    pub spawn_interval: u64,
    pub max_food_per_chunk: usize,
    pub max_animals_per_chunk: usize,
    /// Chance per loaded chunk and spawn pass
    pub food_chance: f64,
    pub animal_chance: f64,

    pub fruit_nutrition: f32,
    pub meat_nutrition: f32,

    pub animal_health: f32,
    pub animal_speed: f32,
    pub animal_size: f32,
    /// Grass eaten per second while grazing
    pub graze_rate: f32,
}

impl Default for SpawnParams {
    fn default() -> Self {
        SpawnParams {
            spawn_interval: 30,
            max_food_per_chunk: 5,
            max_animals_per_chunk: 1,
            food_chance: 0.05,
            animal_chance: 0.02,

            fruit_nutrition: 20.0,
            meat_nutrition: 40.0,

            animal_health: 50.0,
            animal_speed: 0.8,
            animal_size: 1.2,
            graze_rate: 2.0,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Config with a fixed seed, for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        let mut config = Self::default();
        config.world.noise.seed = seed;
        config
    }

    /// Create params for a fast test run: small chunks, quick needs.
    pub fn fast_test() -> Self {
        let mut config = Self::default();
        config.world.chunk_size = 8;
        config.world.initial_load_radius = 1;
        config.needs.hunger_decay = 2.0;
        config.needs.thirst_decay = 3.0;
        config.spawn.spawn_interval = 5;
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.world.validate()?;
        self.needs.validate()?;
        self.agent.validate()
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::NonPositiveChunkSize);
        }
        if self.biomes.is_empty() {
            return Err(ConfigError::NoBiomeBands);
        }
        for (index, band) in self.biomes.iter().enumerate() {
            if band.min_noise >= band.max_noise {
                return Err(ConfigError::EmptyBand {
                    index,
                    name: band.biome.name().to_string(),
                    min: band.min_noise,
                    max: band.max_noise,
                });
            }
            if index > 0 {
                let previous_max = self.biomes[index - 1].max_noise;
                if band.min_noise < previous_max {
                    return Err(ConfigError::OverlappingBands {
                        index,
                        name: band.biome.name().to_string(),
                        min: band.min_noise,
                        previous_max,
                    });
                }
            }
        }
        if self.transition_zone < 0.0 {
            return Err(ConfigError::NegativeTransition(self.transition_zone));
        }
        if self.noise.octaves == 0 {
            return Err(ConfigError::NoOctaves);
        }
        if let Some(scale) = self.noise.scale {
            if scale <= 0.0 {
                return Err(ConfigError::NonPositive { name: "noise.scale", value: scale });
            }
        }
        if self.chunk_cache_duration == 0 {
            return Err(ConfigError::ZeroCacheDuration);
        }
        Ok(())
    }

    /// Tiles per noise unit
    pub fn noise_scale(&self) -> f64 {
        self.noise.scale.unwrap_or(self.chunk_size as f64)
    }
}

impl NeedsParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("hunger_threshold", self.hunger_threshold),
            ("thirst_threshold", self.thirst_threshold),
            ("energy_threshold", self.energy_threshold),
            ("satisfied_level", self.satisfied_level),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

impl AgentParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("agent.speed", self.speed as f64),
            ("agent.size", self.size as f64),
            ("agent.vision_range", self.vision_range as f64),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        Ok(())
    }
}
