//! Building records and the per-category rules that create and grow them.
//!
//! Buildings are plain data. Everything that varies by category lives in the
//! `match` arms of [`BuildingCategory`], and growth is a free function over the
//! record rather than behaviour attached to each instance.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CityError;

/// Chance per tick that a growable building gains a storey.
pub const GROWTH_PROBABILITY: f64 = 0.01;

/// Visual sub-styles are numbered from 1.
pub const VARIANTS: RangeInclusive<u8> = 1..=3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingCategory {
    Residential,
    Commercial,
    Industrial,
    Road,
}

impl BuildingCategory {
    pub const ALL: [BuildingCategory; 4] = [
        BuildingCategory::Residential,
        BuildingCategory::Commercial,
        BuildingCategory::Industrial,
        BuildingCategory::Road,
    ];

    pub fn id(self) -> &'static str {
        match self {
            BuildingCategory::Residential => "residential",
            BuildingCategory::Commercial => "commercial",
            BuildingCategory::Industrial => "industrial",
            BuildingCategory::Road => "road",
        }
    }

    pub fn initial_heights(self) -> RangeInclusive<u32> {
        match self {
            BuildingCategory::Residential | BuildingCategory::Commercial => 1..=3,
            BuildingCategory::Industrial => 1..=2,
            BuildingCategory::Road => 0..=0,
        }
    }

    pub fn max_height(self) -> u32 {
        match self {
            BuildingCategory::Residential => 5,
            BuildingCategory::Commercial => 8,
            BuildingCategory::Industrial => 6,
            BuildingCategory::Road => 0,
        }
    }

    /// Width and depth in tiles.
    pub fn footprint(self) -> (u32, u32) {
        match self {
            BuildingCategory::Residential
            | BuildingCategory::Commercial
            | BuildingCategory::Industrial
            | BuildingCategory::Road => (1, 1),
        }
    }

    pub fn growth_probability(self) -> f64 {
        match self {
            BuildingCategory::Road => 0.0,
            _ => GROWTH_PROBABILITY,
        }
    }
}

impl fmt::Display for BuildingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for BuildingCategory {
    type Err = CityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildingCategory::ALL
            .into_iter()
            .find(|category| category.id() == s)
            .ok_or_else(|| CityError::UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub category: BuildingCategory,
    pub variant: u8,
    pub height: u32,
    pub footprint: (u32, u32),
    #[serde(skip)]
    pub dirty: bool,
}

impl Building {
    /// Key a renderer uses to pick the visual style, e.g. `commercial-3`.
    pub fn asset_key(&self) -> String {
        format!("{}-{}", self.category.id(), self.variant)
    }

    pub fn at_max_height(&self) -> bool {
        self.height >= self.category.max_height()
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

pub fn create<R: Rng>(category: BuildingCategory, rng: &mut R) -> Building {
    Building {
        category,
        variant: rng.gen_range(VARIANTS),
        height: rng.gen_range(category.initial_heights()),
        footprint: category.footprint(),
        dirty: true,
    }
}

/// One growth step. Returns `true` when the building gained height.
pub fn grow<R: Rng>(building: &mut Building, rng: &mut R) -> bool {
    let probability = building.category.growth_probability();
    if probability <= 0.0 {
        return false;
    }
    if !rng.gen_bool(probability) {
        return false;
    }
    if building.at_max_height() {
        return false;
    }
    building.height += 1;
    building.dirty = true;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn created_buildings_start_dirty_within_category_rules() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for category in BuildingCategory::ALL {
            for _ in 0..50 {
                let building = create(category, &mut rng);
                assert!(building.dirty);
                assert!(category.initial_heights().contains(&building.height));
                assert!(VARIANTS.contains(&building.variant));
                assert_eq!(building.footprint, category.footprint());
            }
        }
    }

    #[test]
    fn every_variant_is_drawn() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut seen = [false; 3];
        for _ in 0..200 {
            let building = create(BuildingCategory::Commercial, &mut rng);
            seen[(building.variant - 1) as usize] = true;
        }
        assert_eq!(seen, [true, true, true]);
    }

    #[test]
    fn roads_never_grow_or_dirty() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut road = create(BuildingCategory::Road, &mut rng);
        road.dirty = false;
        for _ in 0..10_000 {
            assert!(!grow(&mut road, &mut rng));
        }
        assert_eq!(road.height, 0);
        assert!(!road.dirty);
    }

    #[test]
    fn growth_is_monotonic_and_capped() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for category in [
            BuildingCategory::Residential,
            BuildingCategory::Commercial,
            BuildingCategory::Industrial,
        ] {
            let mut building = create(category, &mut rng);
            let mut previous = building.height;
            for _ in 0..5_000 {
                grow(&mut building, &mut rng);
                assert!(building.height >= previous);
                assert!(building.height <= category.max_height());
                previous = building.height;
            }
        }
    }

    #[test]
    fn growth_marks_dirty() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut building = create(BuildingCategory::Residential, &mut rng);
        building.height = 1;
        building.dirty = false;
        let mut grew = false;
        for _ in 0..5_000 {
            if grow(&mut building, &mut rng) {
                grew = true;
                break;
            }
        }
        assert!(grew, "p = 0.01 over 5000 draws should fire at least once");
        assert!(building.dirty);
        assert_eq!(building.height, 2);
    }

    #[test]
    fn categories_parse_from_ids() {
        assert_eq!(
            "industrial".parse::<BuildingCategory>(),
            Ok(BuildingCategory::Industrial)
        );
        assert_eq!(
            "park".parse::<BuildingCategory>(),
            Err(CityError::UnknownCategory("park".into()))
        );
    }

    #[test]
    fn asset_keys_are_unique_per_category_and_variant() {
        let mut keys = std::collections::HashSet::new();
        for category in BuildingCategory::ALL {
            for variant in VARIANTS {
                let building = Building {
                    category,
                    variant,
                    height: 1,
                    footprint: category.footprint(),
                    dirty: false,
                };
                assert!(keys.insert(building.asset_key()));
            }
        }
        assert_eq!(keys.len(), 12);
    }
}
