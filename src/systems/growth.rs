use crate::{
    engine::{System, SystemContext},
    grid::Grid,
    rng::{StreamRng, GROWTH_STREAM},
};

/// Gives every building its per-tick chance to grow.
pub struct GrowthSystem;

impl GrowthSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GrowthSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for GrowthSystem {
    fn name(&self) -> &str {
        GROWTH_STREAM
    }

    fn run(&mut self, _ctx: &SystemContext, grid: &mut Grid, rng: &mut StreamRng<'_>) -> usize {
        grid.tick(rng)
    }
}
