use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::buildings::{self, Building};
use crate::error::{CityError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    #[default]
    Ground,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    x: usize,
    y: usize,
    pub terrain: Terrain,
    pub building: Option<Building>,
}

impl Tile {
    fn new(x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            terrain: Terrain::Ground,
            building: None,
        }
    }

    pub fn x(&self) -> usize {
        self.x
    }

    pub fn y(&self) -> usize {
        self.y
    }

    pub fn coords(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    pub fn is_empty(&self) -> bool {
        self.building.is_none()
    }
}

/// Largest side length a grid may be built with.
pub const MAX_GRID_SIZE: usize = 4096;

/// Square city grid stored row-major (`y * size + x`).
#[derive(Debug, Clone)]
pub struct Grid {
    size: usize,
    tiles: Vec<Tile>,
}

impl Grid {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(CityError::InvalidConfig(
                "grid size must be a positive integer".into(),
            ));
        }
        let capacity = size
            .checked_mul(size)
            .filter(|_| size <= MAX_GRID_SIZE)
            .ok_or_else(|| {
                CityError::InvalidConfig(format!(
                    "grid size {size} exceeds the maximum of {MAX_GRID_SIZE}"
                ))
            })?;
        let mut tiles = Vec::with_capacity(capacity);
        for y in 0..size {
            for x in 0..size {
                tiles.push(Tile::new(x, y));
            }
        }
        Ok(Self { size, tiles })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        self.contains(x, y).then(|| y * self.size + x)
    }

    pub fn tile(&self, x: usize, y: usize) -> Option<&Tile> {
        self.index(x, y).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, x: usize, y: usize) -> Option<&mut Tile> {
        self.index(x, y).map(move |i| &mut self.tiles[i])
    }

    pub fn building(&self, x: usize, y: usize) -> Option<&Building> {
        self.tile(x, y).and_then(|tile| tile.building.as_ref())
    }

    /// Tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub(crate) fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    pub fn building_count(&self) -> usize {
        self.tiles.iter().filter(|tile| !tile.is_empty()).count()
    }

    /// Puts `building` on an empty tile. An occupied or out-of-range tile hands
    /// the building back untouched.
    pub fn install(
        &mut self,
        x: usize,
        y: usize,
        building: Building,
    ) -> std::result::Result<(), Building> {
        match self.tile_mut(x, y) {
            Some(tile) if tile.is_empty() => {
                tile.building = Some(building);
                Ok(())
            }
            _ => Err(building),
        }
    }

    pub fn take(&mut self, x: usize, y: usize) -> Option<Building> {
        self.tile_mut(x, y).and_then(|tile| tile.building.take())
    }

    /// Runs one growth step on every building, row-major. Returns how many grew.
    pub fn tick<R: Rng>(&mut self, rng: &mut R) -> usize {
        let mut grown = 0;
        for tile in &mut self.tiles {
            if let Some(building) = tile.building.as_mut() {
                if buildings::grow(building, rng) {
                    grown += 1;
                }
            }
        }
        grown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::{create, BuildingCategory};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn new_grid_is_empty_ground() {
        let grid = Grid::new(4).unwrap();
        assert_eq!(grid.size(), 4);
        assert_eq!(grid.tiles().count(), 16);
        assert!(grid
            .tiles()
            .all(|tile| tile.is_empty() && tile.terrain == Terrain::Ground));
        assert_eq!(grid.tile(3, 1).map(Tile::coords), Some((3, 1)));
    }

    #[test]
    fn zero_size_is_invalid() {
        assert!(matches!(Grid::new(0), Err(CityError::InvalidConfig(_))));
    }

    #[test]
    fn oversized_grid_is_invalid() {
        assert!(matches!(
            Grid::new(usize::MAX),
            Err(CityError::InvalidConfig(_))
        ));
        assert!(matches!(
            Grid::new(MAX_GRID_SIZE + 1),
            Err(CityError::InvalidConfig(_))
        ));
    }

    #[test]
    fn tiles_iterate_row_major() {
        let grid = Grid::new(3).unwrap();
        let coords: Vec<_> = grid.tiles().map(Tile::coords).take(4).collect();
        assert_eq!(coords, vec![(0, 0), (1, 0), (2, 0), (0, 1)]);
    }

    #[test]
    fn out_of_range_lookups_are_none() {
        let mut grid = Grid::new(2).unwrap();
        assert!(grid.tile(2, 0).is_none());
        assert!(grid.tile_mut(0, 5).is_none());
        assert!(grid.take(9, 9).is_none());
    }

    #[test]
    fn install_refuses_occupied_tiles() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut grid = Grid::new(2).unwrap();
        let first = create(BuildingCategory::Residential, &mut rng);
        let second = create(BuildingCategory::Road, &mut rng);
        grid.install(1, 1, first.clone()).unwrap();
        let rejected = grid.install(1, 1, second.clone()).unwrap_err();
        assert_eq!(rejected, second);
        assert_eq!(grid.building(1, 1), Some(&first));
        assert_eq!(grid.building_count(), 1);
    }

    #[test]
    fn tick_is_deterministic_for_a_seed() {
        let build = || {
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            let mut grid = Grid::new(5).unwrap();
            for i in 0..5 {
                let building = create(BuildingCategory::Commercial, &mut rng);
                grid.install(i, i, building).unwrap();
            }
            for _ in 0..300 {
                grid.tick(&mut rng);
            }
            grid.tiles()
                .filter_map(|tile| tile.building.as_ref().map(|b| b.height))
                .collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }
}
