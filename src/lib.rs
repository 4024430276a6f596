pub mod buildings;
pub mod engine;
pub mod error;
pub mod grid;
pub mod logging;
pub mod reconcile;
pub mod render;
pub mod rng;
pub mod scenario;
pub mod systems;
pub mod tools;
pub mod web;

pub use engine::{Engine, EngineBuilder, EngineSettings, TickSummary};
pub use error::CityError;
pub use scenario::{Scenario, ScenarioLoader};
