use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    buildings::BuildingCategory,
    engine::{Engine, EngineBuilder, EngineSettings},
    error::CityError,
    grid::MAX_GRID_SIZE,
    render::Renderer,
    systems::GrowthSystem,
    tools::ToolOutcome,
};

fn default_grid_size() -> usize {
    8
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub placements: Vec<Placement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub x: usize,
    pub y: usize,
    pub category: BuildingCategory,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario
            .validate()
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn validate(&self) -> std::result::Result<(), CityError> {
        if self.grid_size == 0 {
            return Err(CityError::InvalidConfig(
                "grid_size must be a positive integer".into(),
            ));
        }
        if self.grid_size > MAX_GRID_SIZE {
            return Err(CityError::InvalidConfig(format!(
                "grid_size {} exceeds the maximum of {MAX_GRID_SIZE}",
                self.grid_size
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(CityError::InvalidConfig(
                "tick_interval_ms must be greater than zero".into(),
            ));
        }
        for placement in &self.placements {
            if placement.x >= self.grid_size || placement.y >= self.grid_size {
                return Err(CityError::InvalidConfig(format!(
                    "placement ({}, {}) lies outside a {}x{} grid",
                    placement.x, placement.y, self.grid_size, self.grid_size
                )));
            }
        }
        Ok(())
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(120)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            scenario_name: self.name.clone(),
            seed: self.seed,
            grid_size: self.grid_size,
            tick_interval: self.tick_interval(),
        }
    }

    /// Builds an engine with the growth system, installs the scenario's
    /// placements and renders them once.
    pub fn build_engine<R: Renderer>(
        &self,
        renderer: R,
    ) -> std::result::Result<Engine<R>, CityError> {
        self.validate()?;
        let mut engine = EngineBuilder::new(self.engine_settings(), renderer)
            .with_system(GrowthSystem::new())
            .build()?;
        for placement in &self.placements {
            let outcome = engine.place(placement.x, placement.y, placement.category);
            if outcome == ToolOutcome::Occupied {
                warn!(
                    x = placement.x,
                    y = placement.y,
                    category = %placement.category,
                    "duplicate placement skipped"
                );
            }
        }
        engine.reconcile();
        Ok(engine)
    }
}
