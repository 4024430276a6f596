//! Player tools and the state machine that applies them to tiles.
//!
//! The controller only ever writes to the [`Grid`]. Visual effects of its
//! mutations show up on the next reconciliation pass.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::buildings::{self, Building, BuildingCategory};
use crate::error::CityError;
use crate::grid::{Grid, Terrain};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Select,
    Bulldoze,
    Place(BuildingCategory),
    Move,
}

impl Tool {
    pub fn id(self) -> &'static str {
        match self {
            Tool::Select => "select",
            Tool::Bulldoze => "bulldoze",
            Tool::Move => "move",
            Tool::Place(category) => category.id(),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Tool {
    type Err = CityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "select" => Ok(Tool::Select),
            "bulldoze" => Ok(Tool::Bulldoze),
            "move" => Ok(Tool::Move),
            other => other.parse().map(Tool::Place),
        }
    }
}

impl Serialize for Tool {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

impl<'de> Deserialize<'de> for Tool {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        id.parse().map_err(serde::de::Error::custom)
    }
}

/// Read-only view of one tile for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileInfo {
    pub x: usize,
    pub y: usize,
    pub terrain: Terrain,
    pub building: Option<Building>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolOutcome {
    Selected { tile: TileInfo },
    Placed { category: BuildingCategory },
    Bulldozed { category: BuildingCategory },
    Lifted { category: BuildingCategory },
    Dropped { category: BuildingCategory },
    /// The tile already holds a building; nothing changed.
    Occupied,
    /// The tile has no building to act on; nothing changed.
    EmptyTile,
    OutOfBounds,
}

impl ToolOutcome {
    pub fn mutated(&self) -> bool {
        matches!(
            self,
            ToolOutcome::Placed { .. }
                | ToolOutcome::Bulldozed { .. }
                | ToolOutcome::Lifted { .. }
                | ToolOutcome::Dropped { .. }
        )
    }
}

/// What happened to a held building when the tool changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "switch", rename_all = "snake_case")]
pub enum ToolSwitch {
    Switched,
    ReturnedToOrigin { x: usize, y: usize },
    /// The origin tile was taken, so the held building was discarded.
    Discarded { category: BuildingCategory },
}

#[derive(Debug, Clone)]
struct Held {
    building: Building,
    origin: (usize, usize),
}

#[derive(Debug, Clone, Default)]
pub struct ToolController {
    active: Tool,
    held: Option<Held>,
    selected: Option<(usize, usize)>,
}

impl ToolController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_tool(&self) -> Tool {
        self.active
    }

    pub fn held(&self) -> Option<&Building> {
        self.held.as_ref().map(|held| &held.building)
    }

    /// Last coordinate a tool was applied to, for highlighting.
    pub fn selected(&self) -> Option<(usize, usize)> {
        self.selected
    }

    pub fn set_active_tool(&mut self, tool: Tool, grid: &mut Grid) -> ToolSwitch {
        let switch = if tool != Tool::Move {
            self.release_hold(grid)
        } else {
            ToolSwitch::Switched
        };
        debug!(from = %self.active, to = %tool, "tool switched");
        self.active = tool;
        switch
    }

    /// Like [`set_active_tool`](Self::set_active_tool) but from a tool id.
    /// An unknown id leaves the current tool in place.
    pub fn set_active_tool_id(
        &mut self,
        id: &str,
        grid: &mut Grid,
    ) -> Result<ToolSwitch, CityError> {
        match id.parse::<Tool>() {
            Ok(tool) => Ok(self.set_active_tool(tool, grid)),
            Err(err) => {
                warn!(id, "ignoring unknown tool");
                Err(err)
            }
        }
    }

    fn release_hold(&mut self, grid: &mut Grid) -> ToolSwitch {
        let Some(Held {
            mut building,
            origin: (x, y),
        }) = self.held.take()
        else {
            return ToolSwitch::Switched;
        };
        building.mark_dirty();
        let category = building.category;
        match grid.install(x, y, building) {
            Ok(()) => ToolSwitch::ReturnedToOrigin { x, y },
            Err(_) => {
                warn!(x, y, %category, "origin occupied, discarding held building");
                ToolSwitch::Discarded { category }
            }
        }
    }

    pub fn apply<R: Rng>(
        &mut self,
        grid: &mut Grid,
        x: usize,
        y: usize,
        rng: &mut R,
    ) -> ToolOutcome {
        let Some(tile) = grid.tile_mut(x, y) else {
            return ToolOutcome::OutOfBounds;
        };
        self.selected = Some((x, y));

        let outcome = match self.active {
            Tool::Select => ToolOutcome::Selected {
                tile: TileInfo {
                    x,
                    y,
                    terrain: tile.terrain,
                    building: tile.building.clone(),
                },
            },
            Tool::Bulldoze => match tile.building.take() {
                Some(building) => ToolOutcome::Bulldozed {
                    category: building.category,
                },
                None => ToolOutcome::EmptyTile,
            },
            Tool::Place(category) => {
                if tile.is_empty() {
                    tile.building = Some(buildings::create(category, rng));
                    ToolOutcome::Placed { category }
                } else {
                    ToolOutcome::Occupied
                }
            }
            Tool::Move => match self.held.take() {
                None => match tile.building.take() {
                    Some(building) => {
                        let category = building.category;
                        self.held = Some(Held {
                            building,
                            origin: (x, y),
                        });
                        ToolOutcome::Lifted { category }
                    }
                    None => ToolOutcome::EmptyTile,
                },
                Some(held) if tile.is_empty() => {
                    let mut building = held.building;
                    building.mark_dirty();
                    let category = building.category;
                    tile.building = Some(building);
                    ToolOutcome::Dropped { category }
                }
                Some(held) => {
                    self.held = Some(held);
                    ToolOutcome::Occupied
                }
            },
        };

        debug!(tool = %self.active, x, y, ?outcome, "tool applied");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (Grid, ToolController, ChaCha8Rng) {
        (
            Grid::new(4).unwrap(),
            ToolController::new(),
            ChaCha8Rng::seed_from_u64(23),
        )
    }

    #[test]
    fn tool_ids_round_trip() {
        for id in [
            "select",
            "bulldoze",
            "move",
            "residential",
            "commercial",
            "industrial",
            "road",
        ] {
            let tool: Tool = id.parse().unwrap();
            assert_eq!(tool.id(), id);
        }
        assert!(matches!(
            "park".parse::<Tool>(),
            Err(CityError::UnknownCategory(_))
        ));
    }

    #[test]
    fn unknown_tool_id_keeps_current_tool() {
        let (mut grid, mut tools, _) = setup();
        tools.set_active_tool(Tool::Bulldoze, &mut grid);
        assert!(tools.set_active_tool_id("stadium", &mut grid).is_err());
        assert_eq!(tools.active_tool(), Tool::Bulldoze);
    }

    #[test]
    fn place_respects_occupancy() {
        let (mut grid, mut tools, mut rng) = setup();
        tools.set_active_tool(Tool::Place(BuildingCategory::Residential), &mut grid);
        assert_eq!(
            tools.apply(&mut grid, 1, 1, &mut rng),
            ToolOutcome::Placed {
                category: BuildingCategory::Residential
            }
        );
        let original = grid.building(1, 1).cloned().unwrap();

        tools.set_active_tool(Tool::Place(BuildingCategory::Industrial), &mut grid);
        assert_eq!(tools.apply(&mut grid, 1, 1, &mut rng), ToolOutcome::Occupied);
        assert_eq!(grid.building(1, 1), Some(&original));
    }

    #[test]
    fn bulldoze_empty_tile_is_noop() {
        let (mut grid, mut tools, mut rng) = setup();
        tools.set_active_tool(Tool::Bulldoze, &mut grid);
        assert_eq!(tools.apply(&mut grid, 0, 0, &mut rng), ToolOutcome::EmptyTile);
        assert_eq!(grid.building_count(), 0);
    }

    #[test]
    fn out_of_bounds_is_reported() {
        let (mut grid, mut tools, mut rng) = setup();
        assert_eq!(tools.apply(&mut grid, 4, 0, &mut rng), ToolOutcome::OutOfBounds);
        assert_eq!(tools.selected(), None);
    }

    #[test]
    fn select_reports_without_mutating() {
        let (mut grid, mut tools, mut rng) = setup();
        tools.set_active_tool(Tool::Place(BuildingCategory::Road), &mut grid);
        tools.apply(&mut grid, 2, 3, &mut rng);
        grid.tile_mut(2, 3).unwrap().building.as_mut().unwrap().dirty = false;

        tools.set_active_tool(Tool::Select, &mut grid);
        let tile = match tools.apply(&mut grid, 2, 3, &mut rng) {
            ToolOutcome::Selected { tile } => tile,
            other => panic!("expected selection, got {other:?}"),
        };
        assert_eq!((tile.x, tile.y), (2, 3));
        assert_eq!(tile.building.unwrap().category, BuildingCategory::Road);
        assert!(!grid.building(2, 3).unwrap().dirty);
        assert_eq!(tools.selected(), Some((2, 3)));
    }

    #[test]
    fn move_lifts_and_drops_the_same_building() {
        let (mut grid, mut tools, mut rng) = setup();
        tools.set_active_tool(Tool::Place(BuildingCategory::Commercial), &mut grid);
        tools.apply(&mut grid, 0, 0, &mut rng);
        tools.apply(&mut grid, 3, 3, &mut rng);
        let original = grid.building(0, 0).cloned().unwrap();

        tools.set_active_tool(Tool::Move, &mut grid);
        assert!(matches!(
            tools.apply(&mut grid, 0, 0, &mut rng),
            ToolOutcome::Lifted { .. }
        ));
        assert!(grid.building(0, 0).is_none());
        assert_eq!(tools.held(), Some(&original));

        assert_eq!(tools.apply(&mut grid, 3, 3, &mut rng), ToolOutcome::Occupied);
        assert!(tools.held().is_some());

        assert!(matches!(
            tools.apply(&mut grid, 1, 2, &mut rng),
            ToolOutcome::Dropped { .. }
        ));
        assert!(tools.held().is_none());
        let moved = grid.building(1, 2).unwrap();
        assert_eq!(moved.category, original.category);
        assert_eq!(moved.variant, original.variant);
        assert_eq!(moved.height, original.height);
        assert!(moved.dirty);
        assert_eq!(grid.building_count(), 2);
    }

    #[test]
    fn switching_away_from_move_returns_held_building() {
        let (mut grid, mut tools, mut rng) = setup();
        tools.set_active_tool(Tool::Place(BuildingCategory::Residential), &mut grid);
        tools.apply(&mut grid, 2, 2, &mut rng);
        tools.set_active_tool(Tool::Move, &mut grid);
        tools.apply(&mut grid, 2, 2, &mut rng);
        assert_eq!(grid.building_count(), 0);

        assert_eq!(
            tools.set_active_tool(Tool::Move, &mut grid),
            ToolSwitch::Switched
        );
        assert!(tools.held().is_some());

        assert_eq!(
            tools.set_active_tool(Tool::Select, &mut grid),
            ToolSwitch::ReturnedToOrigin { x: 2, y: 2 }
        );
        assert!(tools.held().is_none());
        assert!(grid.building(2, 2).unwrap().dirty);
    }

    #[test]
    fn held_building_is_discarded_when_origin_taken() {
        let (mut grid, mut tools, mut rng) = setup();
        tools.set_active_tool(Tool::Place(BuildingCategory::Industrial), &mut grid);
        tools.apply(&mut grid, 0, 1, &mut rng);
        tools.set_active_tool(Tool::Move, &mut grid);
        tools.apply(&mut grid, 0, 1, &mut rng);
        grid.install(0, 1, buildings::create(BuildingCategory::Road, &mut rng))
            .unwrap();

        assert_eq!(
            tools.set_active_tool(Tool::Bulldoze, &mut grid),
            ToolSwitch::Discarded {
                category: BuildingCategory::Industrial
            }
        );
        assert_eq!(
            grid.building(0, 1).unwrap().category,
            BuildingCategory::Road
        );
    }

    #[test]
    fn tools_deserialize_from_ids() {
        let tool: Tool = serde_json::from_str("\"industrial\"").unwrap();
        assert_eq!(tool, Tool::Place(BuildingCategory::Industrial));
        assert!(serde_json::from_str::<Tool>("\"lighthouse\"").is_err());
    }
}
