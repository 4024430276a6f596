//! Keeps the renderer's visuals in step with the grid.
//!
//! The reconciler owns one optional handle per coordinate and is the only
//! writer of rendered state. Each pass walks the grid row-major and issues the
//! fewest create/remove calls that make the handle table match the buildings.
//! A building whose height changed is re-created rather than patched in place.

use serde::Serialize;
use tracing::{debug, warn};

use crate::buildings::BuildingCategory;
use crate::error::CityError;
use crate::grid::Grid;
use crate::render::{Renderer, VisualAttributes};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum VisualOp {
    Create {
        x: usize,
        y: usize,
        category: BuildingCategory,
        variant: u8,
        height: u32,
        footprint: (u32, u32),
    },
    Remove {
        x: usize,
        y: usize,
    },
}

impl VisualOp {
    pub fn coords(&self) -> (usize, usize) {
        match *self {
            VisualOp::Create { x, y, .. } | VisualOp::Remove { x, y } => (x, y),
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, VisualOp::Create { .. })
    }

    pub fn is_remove(&self) -> bool {
        matches!(self, VisualOp::Remove { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub ops: Vec<VisualOp>,
    #[serde(serialize_with = "serialize_failures")]
    pub failures: Vec<CityError>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.failures.is_empty()
    }

    pub fn creates(&self) -> usize {
        self.ops.iter().filter(|op| op.is_create()).count()
    }

    pub fn removes(&self) -> usize {
        self.ops.iter().filter(|op| op.is_remove()).count()
    }

    /// Folds a later pass into this one, keeping op order.
    pub fn merge(&mut self, other: ReconcileReport) {
        self.ops.extend(other.ops);
        self.failures.extend(other.failures);
    }
}

fn serialize_failures<S: serde::Serializer>(
    failures: &[CityError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(failures.iter().map(ToString::to_string))
}

pub struct Reconciler<H> {
    size: usize,
    slots: Vec<Option<H>>,
}

impl<H> Reconciler<H> {
    pub fn new(grid: &Grid) -> Self {
        let size = grid.size();
        let mut slots = Vec::with_capacity(size * size);
        slots.resize_with(size * size, || None);
        Self { size, slots }
    }

    pub fn handle(&self, x: usize, y: usize) -> Option<&H> {
        if x >= self.size || y >= self.size {
            return None;
        }
        self.slots[y * self.size + x].as_ref()
    }

    pub fn rendered_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn run<R>(&mut self, grid: &mut Grid, renderer: &mut R) -> ReconcileReport
    where
        R: Renderer<Handle = H>,
    {
        debug_assert_eq!(grid.size(), self.size, "reconciler built for another grid");
        let mut report = ReconcileReport::default();

        for (tile, slot) in grid.tiles_mut().zip(self.slots.iter_mut()) {
            let (x, y) = tile.coords();
            match tile.building.as_mut() {
                None => {
                    if let Some(handle) = slot.take() {
                        renderer.remove_visual(handle);
                        report.ops.push(VisualOp::Remove { x, y });
                    }
                }
                Some(building) if building.dirty => {
                    if let Some(stale) = slot.take() {
                        renderer.remove_visual(stale);
                        report.ops.push(VisualOp::Remove { x, y });
                    }
                    let attributes = VisualAttributes::from(&*building);
                    match renderer.create_visual(building.category, x, y, &attributes) {
                        Ok(handle) => {
                            *slot = Some(handle);
                            report.ops.push(VisualOp::Create {
                                x,
                                y,
                                category: building.category,
                                variant: building.variant,
                                height: building.height,
                                footprint: building.footprint,
                            });
                        }
                        Err(err) => {
                            warn!(x, y, asset = %attributes.asset_key, error = %err, "visual creation failed");
                            report.failures.push(CityError::VisualCreationFailed {
                                x,
                                y,
                                reason: err.to_string(),
                            });
                        }
                    }
                    building.dirty = false;
                }
                Some(_) => {}
            }
        }

        if !report.is_empty() {
            debug!(
                creates = report.creates(),
                removes = report.removes(),
                failures = report.failures.len(),
                "reconciled"
            );
        }
        report
    }

    /// Removes every rendered visual, leaving the table empty.
    pub fn clear<R>(&mut self, renderer: &mut R) -> usize
    where
        R: Renderer<Handle = H>,
    {
        let mut removed = 0;
        for slot in &mut self.slots {
            if let Some(handle) = slot.take() {
                renderer.remove_visual(handle);
                removed += 1;
            }
        }
        removed
    }
}
