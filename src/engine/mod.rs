mod clock;

pub use clock::{drive, Clock};

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    buildings::{self, Building, BuildingCategory},
    error::{CityError, Result},
    grid::Grid,
    reconcile::{ReconcileReport, Reconciler},
    render::{PointerEvent, Renderer},
    rng::{RngManager, StreamRng, REGISTRY_STREAM},
    tools::{Tool, ToolController, ToolOutcome, ToolSwitch},
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub grid_size: usize,
    pub tick_interval: Duration,
}

pub struct EngineBuilder<R> {
    settings: EngineSettings,
    systems: Vec<Box<dyn System + Send>>,
    renderer: R,
}

impl<R: Renderer> EngineBuilder<R> {
    pub fn new(settings: EngineSettings, renderer: R) -> Self {
        Self {
            settings,
            systems: Vec::new(),
            renderer,
        }
    }

    pub fn with_system(mut self, system: impl System + Send + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn build(self) -> Result<Engine<R>> {
        let grid = Grid::new(self.settings.grid_size)?;
        if self.settings.tick_interval.is_zero() {
            return Err(CityError::InvalidConfig(
                "tick interval must be greater than zero".into(),
            ));
        }
        info!(
            scenario = %self.settings.scenario_name,
            size = self.settings.grid_size,
            seed = self.settings.seed,
            "engine built"
        );
        Ok(Engine {
            reconciler: Reconciler::new(&grid),
            grid,
            tools: ToolController::new(),
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            renderer: self.renderer,
            tick: 0,
            settings: self.settings,
        })
    }
}

/// Owns the grid, the rendered set and the tool state. Every mutating entry
/// point finishes with a reconciliation pass, so callers never observe the two
/// out of step.
pub struct Engine<R: Renderer> {
    grid: Grid,
    reconciler: Reconciler<R::Handle>,
    tools: ToolController,
    rng: RngManager,
    systems: Vec<Box<dyn System + Send>>,
    renderer: R,
    tick: u64,
    settings: EngineSettings,
}

impl<R: Renderer> Engine<R> {
    /// One clock tick: every system, then reconciliation.
    pub fn step(&mut self) -> TickSummary {
        self.tick += 1;
        let ctx = SystemContext {
            tick: self.tick,
            scenario_name: &self.settings.scenario_name,
        };
        let mut systems = Vec::with_capacity(self.systems.len());
        for system in &mut self.systems {
            let mut stream = self.rng.stream(system.name());
            let changed = system.run(&ctx, &mut self.grid, &mut stream);
            systems.push(SystemRunReport {
                name: system.name().to_string(),
                changed,
            });
        }
        let report = self.reconciler.run(&mut self.grid, &mut self.renderer);
        debug!(
            tick = self.tick,
            creates = report.creates(),
            removes = report.removes(),
            "tick complete"
        );
        TickSummary {
            tick: self.tick,
            systems,
            report,
        }
    }

    pub fn run(&mut self, ticks: u64) -> ReconcileReport {
        self.run_with_hook(ticks, |_| {})
    }

    /// Runs `ticks` steps, handing each summary to `hook`. Returns every
    /// visual op emitted along the way.
    pub fn run_with_hook<F>(&mut self, ticks: u64, mut hook: F) -> ReconcileReport
    where
        F: FnMut(&TickSummary),
    {
        let mut total = ReconcileReport::default();
        for _ in 0..ticks {
            let summary = self.step();
            hook(&summary);
            total.merge(summary.report);
        }
        total
    }

    /// Resolves a pointer event through the renderer and applies the active
    /// tool there.
    pub fn interact(&mut self, event: &PointerEvent) -> Interaction {
        match self.renderer.resolve_selection(event) {
            Some((x, y)) => self.apply_tool_at(x, y),
            None => Interaction {
                tile: None,
                outcome: ToolOutcome::OutOfBounds,
                report: ReconcileReport::default(),
            },
        }
    }

    /// Applies the active tool to an already resolved tile.
    pub fn apply_tool_at(&mut self, x: usize, y: usize) -> Interaction {
        let mut stream = self.rng.stream(REGISTRY_STREAM);
        let outcome = self.tools.apply(&mut self.grid, x, y, &mut stream);
        let report = self.reconciler.run(&mut self.grid, &mut self.renderer);
        if outcome.mutated() {
            debug!(x, y, ops = report.ops.len(), "interaction reconciled");
        }
        Interaction {
            tile: Some((x, y)),
            outcome,
            report,
        }
    }

    pub fn set_active_tool(&mut self, tool: Tool) -> (ToolSwitch, ReconcileReport) {
        let switch = self.tools.set_active_tool(tool, &mut self.grid);
        let report = self.reconciler.run(&mut self.grid, &mut self.renderer);
        (switch, report)
    }

    pub fn set_active_tool_id(&mut self, id: &str) -> Result<(ToolSwitch, ReconcileReport)> {
        let switch = self.tools.set_active_tool_id(id, &mut self.grid)?;
        let report = self.reconciler.run(&mut self.grid, &mut self.renderer);
        Ok((switch, report))
    }

    /// Places a building directly, bypassing the active tool. Used to seed a
    /// scenario before the first tick; the visual appears on the next pass.
    pub fn place(&mut self, x: usize, y: usize, category: BuildingCategory) -> ToolOutcome {
        if !self.grid.contains(x, y) {
            return ToolOutcome::OutOfBounds;
        }
        let building = buildings::create(category, &mut self.rng.stream(REGISTRY_STREAM));
        match self.grid.install(x, y, building) {
            Ok(()) => ToolOutcome::Placed { category },
            Err(_) => ToolOutcome::Occupied,
        }
    }

    pub fn reconcile(&mut self) -> ReconcileReport {
        self.reconciler.run(&mut self.grid, &mut self.renderer)
    }

    /// Removes every visual from the renderer.
    pub fn shutdown(&mut self) -> usize {
        self.reconciler.clear(&mut self.renderer)
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tools(&self) -> &ToolController {
        &self.tools
    }

    pub fn reconciler(&self) -> &Reconciler<R::Handle> {
        &self.reconciler
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn view(&self) -> CityView {
        CityView {
            scenario: self.settings.scenario_name.clone(),
            tick: self.tick,
            size: self.grid.size(),
            active_tool: self.tools.active_tool(),
            held: self.tools.held().cloned(),
            selected: self.tools.selected(),
            buildings: self
                .grid
                .tiles()
                .filter_map(|tile| {
                    tile.building.as_ref().map(|building| PlacedBuilding {
                        x: tile.x(),
                        y: tile.y(),
                        building: building.clone(),
                    })
                })
                .collect(),
        }
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub scenario_name: &'a str,
}

/// A per-tick update over the grid. Returns how many buildings it changed.
pub trait System {
    fn name(&self) -> &str;
    fn run(&mut self, ctx: &SystemContext, grid: &mut Grid, rng: &mut StreamRng<'_>) -> usize;
}

#[derive(Clone, Debug, Serialize)]
pub struct SystemRunReport {
    pub name: String,
    pub changed: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct TickSummary {
    pub tick: u64,
    pub systems: Vec<SystemRunReport>,
    pub report: ReconcileReport,
}

#[derive(Clone, Debug, Serialize)]
pub struct Interaction {
    pub tile: Option<(usize, usize)>,
    pub outcome: ToolOutcome,
    pub report: ReconcileReport,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlacedBuilding {
    pub x: usize,
    pub y: usize,
    pub building: Building,
}

#[derive(Clone, Debug, Serialize)]
pub struct CityView {
    pub scenario: String,
    pub tick: u64,
    pub size: usize,
    pub active_tool: Tool,
    pub held: Option<Building>,
    pub selected: Option<(usize, usize)>,
    pub buildings: Vec<PlacedBuilding>,
}
