//! Countdown-based chunk eviction.
//!
//! Every loaded chunk carries a "recent" countdown. A chunk inside some view
//! has it reset to the cache duration; a chunk outside every view loses one
//! per cycle and is evicted when it reaches zero. An agent pacing along a
//! chunk border therefore keeps reusing the same chunks instead of
//! regenerating them every tick.

use std::collections::HashMap;

use crate::world::coords::{ChunkBounds, ChunkPos};

/// Cache statistics for monitoring
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served by an already loaded chunk
    pub hits: usize,
    /// Lookups that had to generate
    pub misses: usize,
    pub evictions: usize,
    /// Currently loaded chunks
    pub loaded: usize,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }

    /// Format as human-readable string
    pub fn summary(&self) -> String {
        format!(
            "Hits: {} | Misses: {} | Rate: {:.1}% | Loaded: {} | Evicted: {}",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.loaded,
            self.evictions
        )
    }
}

/// Per-chunk countdowns. Does not own the chunks.
#[derive(Clone, Debug)]
pub struct ChunkCache {
    duration: u32,
    countdowns: HashMap<ChunkPos, u32>,
    pub stats: CacheStats,
}

impl ChunkCache {
    pub fn new(duration: u32) -> Self {
        Self {
            duration: duration.max(1),
            countdowns: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Reset a chunk's countdown to the full duration.
    pub fn touch(&mut self, pos: ChunkPos) {
        self.countdowns.insert(pos, self.duration);
    }

    #[cfg(test)]
    fn remaining(&self, pos: ChunkPos) -> Option<u32> {
        self.countdowns.get(&pos).copied()
    }

    pub fn record_hit(&mut self) {
        self.stats.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.stats.misses += 1;
    }

    /// Run one eviction cycle over the `loaded` chunks.
    ///
    /// Returns the chunks whose countdown ran out. They are forgotten here;
    /// the caller drops them from its map.
    pub fn cycle(
        &mut self,
        loaded: impl IntoIterator<Item = ChunkPos>,
        views: &[ChunkBounds],
    ) -> Vec<ChunkPos> {
        let mut expired = Vec::new();
        for pos in loaded {
            if views.iter().any(|view| view.contains(pos)) {
                self.touch(pos);
                continue;
            }
            let remaining = self.countdowns.entry(pos).or_insert(self.duration);
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                expired.push(pos);
            }
        }
        for pos in &expired {
            self.countdowns.remove(pos);
        }
        self.stats.evictions += expired.len();
        expired.sort();
        expired
    }

    pub fn set_loaded(&mut self, loaded: usize) {
        self.stats.loaded = loaded;
    }
}
