//! Biome labels and noise-band classification
//!
//! Bands are configured as an ordered list of `[min, max)` noise ranges. Near a
//! band edge the classifier blends toward the neighbouring band with a coarse
//! two-valued mix, giving ragged borders instead of a single hard contour.

use serde::{Deserialize, Serialize};

/// Terrain category of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Biome {
    #[serde(alias = "water")]
    Water,
    #[serde(alias = "beach")]
    Beach,
    #[serde(alias = "plains")]
    Plains,
    #[serde(alias = "forest")]
    Forest,
    #[serde(alias = "mountains")]
    Mountains,
    /// Noise value outside every configured band. Never passable.
    #[serde(alias = "unknown")]
    Unknown,
}

impl Biome {
    pub fn all() -> &'static [Biome] {
        &[
            Biome::Water,
            Biome::Beach,
            Biome::Plains,
            Biome::Forest,
            Biome::Mountains,
            Biome::Unknown,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Biome::Water => "Water",
            Biome::Beach => "Beach",
            Biome::Plains => "Plains",
            Biome::Forest => "Forest",
            Biome::Mountains => "Mountains",
            Biome::Unknown => "Unknown",
        }
    }

    /// Default display color (RGB), used when a band does not set one.
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Biome::Water => (40, 90, 200),
            Biome::Beach => (230, 215, 150),
            Biome::Plains => (120, 190, 80),
            Biome::Forest => (30, 110, 40),
            Biome::Mountains => (130, 120, 110),
            Biome::Unknown => (255, 0, 255),
        }
    }

    /// Cost of stepping onto a tile of this biome. Infinite means impassable.
    pub fn traversal_cost(&self) -> f32 {
        match self {
            Biome::Water | Biome::Unknown => f32::INFINITY,
            Biome::Mountains => 5.0,
            Biome::Beach => 2.0,
            Biome::Plains => 1.0,
            _ => 2.0,
        }
    }

    pub fn is_passable(&self) -> bool {
        self.traversal_cost().is_finite()
    }

    /// Whether a land agent may pick a tile of this biome as a movement target.
    /// Mountains can be crossed but are never a destination.
    pub fn is_valid_destination(&self) -> bool {
        !matches!(self, Biome::Water | Biome::Mountains | Biome::Unknown)
    }
}

impl std::fmt::Display for Biome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One configured noise range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiomeBand {
    #[serde(alias = "name")]
    pub biome: Biome,
    #[serde(alias = "min_noise_value")]
    pub min_noise: f64,
    #[serde(alias = "max_noise_value")]
    pub max_noise: f64,
    /// Carried for renderers; ignored by the simulation.
    #[serde(default)]
    pub color: Option<(u8, u8, u8)>,
}

impl BiomeBand {
    pub fn new(biome: Biome, min_noise: f64, max_noise: f64) -> Self {
        Self { biome, min_noise, max_noise, color: None }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min_noise && value < self.max_noise
    }

    pub fn display_color(&self) -> (u8, u8, u8) {
        self.color.unwrap_or_else(|| self.biome.color())
    }
}

/// The reference band layout, lowest noise first.
pub fn default_bands() -> Vec<BiomeBand> {
    vec![
        BiomeBand::new(Biome::Water, -1.0, -0.15),
        BiomeBand::new(Biome::Beach, -0.15, -0.05),
        BiomeBand::new(Biome::Plains, -0.05, 0.25),
        BiomeBand::new(Biome::Forest, 0.25, 0.45),
        BiomeBand::new(Biome::Mountains, 0.45, 1.0),
    ]
}

/// Maps noise values to biomes, blending across band edges.
#[derive(Clone, Debug)]
pub struct BiomeClassifier {
    bands: Vec<BiomeBand>,
    transition: f64,
}

impl BiomeClassifier {
    /// `bands` must be sorted and non-overlapping (see `WorldConfig::validate`).
    pub fn new(bands: Vec<BiomeBand>, transition: f64) -> Self {
        Self { bands, transition: transition.max(0.0) }
    }

    pub fn bands(&self) -> &[BiomeBand] {
        &self.bands
    }

    pub fn transition(&self) -> f64 {
        self.transition
    }

    /// Classify a noise value.
    ///
    /// Inside a transition zone the mix factor runs from 0 at the zone's inner
    /// edge to 1 at the band boundary; below 0.5 the band keeps its own biome,
    /// from 0.5 on the neighbouring band's biome is used.
    pub fn classify(&self, value: f64) -> Biome {
        let Some(index) = self.bands.iter().position(|b| b.contains(value)) else {
            return Biome::Unknown;
        };
        let band = &self.bands[index];
        let tz = self.transition;
        if tz <= 0.0 {
            return band.biome;
        }

        if index > 0 && value < band.min_noise + tz {
            let mix = (band.min_noise + tz - value) / tz;
            return if mix < 0.5 { band.biome } else { self.bands[index - 1].biome };
        }
        if index + 1 < self.bands.len() && value > band.max_noise - tz {
            let mix = (value - (band.max_noise - tz)) / tz;
            return if mix < 0.5 { band.biome } else { self.bands[index + 1].biome };
        }
        band.biome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bands(transition: f64) -> BiomeClassifier {
        BiomeClassifier::new(
            vec![
                BiomeBand::new(Biome::Water, -1.0, 0.0),
                BiomeBand::new(Biome::Plains, 0.0, 1.0),
            ],
            transition,
        )
    }

    #[test]
    fn test_hard_bands_without_transition() {
        let c = two_bands(0.0);
        assert_eq!(c.classify(-0.5), Biome::Water);
        assert_eq!(c.classify(0.0), Biome::Plains);
        assert_eq!(c.classify(0.99), Biome::Plains);
    }

    #[test]
    fn test_out_of_range_is_unknown() {
        let c = two_bands(0.1);
        assert_eq!(c.classify(-1.5), Biome::Unknown);
        assert_eq!(c.classify(1.0), Biome::Unknown);
        assert!(!Biome::Unknown.is_passable());
    }

    #[test]
    fn test_transition_blends_near_edges() {
        let c = two_bands(0.1);
        // Deep inside the bands
        assert_eq!(c.classify(0.5), Biome::Plains);
        assert_eq!(c.classify(-0.5), Biome::Water);
        // Inner half of the plains transition zone keeps plains
        assert_eq!(c.classify(0.08), Biome::Plains);
        // Outer half takes the neighbour
        assert_eq!(c.classify(0.02), Biome::Water);
        assert_eq!(c.classify(-0.02), Biome::Plains);
        assert_eq!(c.classify(-0.08), Biome::Water);
    }

    #[test]
    fn test_outer_bands_have_no_neighbour_to_blend() {
        let c = two_bands(0.1);
        assert_eq!(c.classify(-0.98), Biome::Water);
        assert_eq!(c.classify(0.98), Biome::Plains);
    }

    #[test]
    fn test_costs_and_destinations() {
        assert_eq!(Biome::Plains.traversal_cost(), 1.0);
        assert_eq!(Biome::Beach.traversal_cost(), 2.0);
        assert_eq!(Biome::Mountains.traversal_cost(), 5.0);
        assert_eq!(Biome::Forest.traversal_cost(), 2.0);
        assert!(Biome::Water.traversal_cost().is_infinite());
        assert!(Biome::Mountains.is_passable());
        assert!(!Biome::Mountains.is_valid_destination());
        assert!(!Biome::Water.is_valid_destination());
        assert!(Biome::Beach.is_valid_destination());
    }

    #[test]
    fn test_band_names_accept_lowercase() {
        let band: BiomeBand = serde_json::from_str(
            r#"{"name": "plains", "min_noise_value": 0.0, "max_noise_value": 0.3}"#,
        )
        .unwrap();
        assert_eq!(band.biome, Biome::Plains);
        assert_eq!(band.display_color(), Biome::Plains.color());
    }
}
