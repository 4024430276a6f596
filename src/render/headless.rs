use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::{PointerEvent, Renderer, VisualAttributes, VisualError};
use crate::buildings::BuildingCategory;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum RecordedCall {
    Create {
        handle: u64,
        category: BuildingCategory,
        x: usize,
        y: usize,
        attributes: VisualAttributes,
    },
    Remove {
        handle: u64,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveVisual {
    pub category: BuildingCategory,
    pub x: usize,
    pub y: usize,
    pub attributes: VisualAttributes,
}

/// Renderer without a screen. Keeps the live visuals and a log of every call,
/// and resolves pointer events assuming one world unit per tile with tile
/// centres on integer coordinates.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    grid_size: usize,
    next_handle: u64,
    live: BTreeMap<u64, LiveVisual>,
    calls: Vec<RecordedCall>,
    missing_assets: HashSet<String>,
}

impl RecordingRenderer {
    pub fn new(grid_size: usize) -> Self {
        Self {
            grid_size,
            ..Self::default()
        }
    }

    /// Makes creation fail for the given asset key, as a renderer with an
    /// incomplete asset catalogue would.
    pub fn without_asset(mut self, asset_key: impl Into<String>) -> Self {
        self.missing_assets.insert(asset_key.into());
        self
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn visual_at(&self, x: usize, y: usize) -> Option<&LiveVisual> {
        self.live.values().find(|visual| visual.x == x && visual.y == y)
    }

    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }

    pub fn drain_calls(&mut self) -> Vec<RecordedCall> {
        std::mem::take(&mut self.calls)
    }
}

impl Renderer for RecordingRenderer {
    type Handle = u64;

    fn create_visual(
        &mut self,
        category: BuildingCategory,
        x: usize,
        y: usize,
        attributes: &VisualAttributes,
    ) -> Result<u64, VisualError> {
        if self.missing_assets.contains(&attributes.asset_key) {
            return Err(VisualError::MissingAsset(attributes.asset_key.clone()));
        }
        self.next_handle += 1;
        let handle = self.next_handle;
        self.live.insert(
            handle,
            LiveVisual {
                category,
                x,
                y,
                attributes: attributes.clone(),
            },
        );
        self.calls.push(RecordedCall::Create {
            handle,
            category,
            x,
            y,
            attributes: attributes.clone(),
        });
        Ok(handle)
    }

    fn remove_visual(&mut self, handle: u64) {
        if self.live.remove(&handle).is_none() {
            tracing::warn!(handle, "remove requested for unknown visual");
        }
        self.calls.push(RecordedCall::Remove { handle });
    }

    fn resolve_selection(&self, event: &PointerEvent) -> Option<(usize, usize)> {
        if !event.x.is_finite() || !event.y.is_finite() {
            return None;
        }
        let x = (event.x + 0.5).floor();
        let y = (event.y + 0.5).floor();
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        (x < self.grid_size && y < self.grid_size).then_some((x, y))
    }
}
