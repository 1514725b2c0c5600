//! Error types for the few operations that can genuinely fail.
//!
//! Routine simulation outcomes (no path, nothing remembered, tile taken) are
//! never errors; they are `Option`s, empty paths and task states.

use std::path::PathBuf;

use thiserror::Error;

/// Invalid or unreadable configuration. Raised at initialization only.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chunk size must be positive")]
    NonPositiveChunkSize,
    #[error("biome band list is empty")]
    NoBiomeBands,
    #[error("biome band {index} ({name}) has min {min} >= max {max}")]
    EmptyBand {
        index: usize,
        name: String,
        min: f64,
        max: f64,
    },
    #[error("biome band {index} ({name}) starts at {min} before the previous band ends at {previous_max}")]
    OverlappingBands {
        index: usize,
        name: String,
        min: f64,
        previous_max: f64,
    },
    #[error("transition zone width must be non-negative, got {0}")]
    NegativeTransition(f64),
    #[error("noise must use at least one octave")]
    NoOctaves,
    #[error("chunk cache duration must be at least one cycle")]
    ZeroCacheDuration,
    #[error("{name} must be within [0, 100], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f32 },
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Chunk persistence failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("deserialization error: {0}")]
    Deserialization(String),
    #[error("malformed chunk key {0:?}, expected \"{{cx}}_{{cy}}\"")]
    BadKey(String),
    #[error("chunk record {key} has {found} tiles per side, world uses {expected}")]
    SizeMismatch {
        key: String,
        expected: usize,
        found: usize,
    },
}
