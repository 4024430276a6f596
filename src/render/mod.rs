//! The narrow seam between the simulation core and whatever draws it.
//!
//! The core never builds geometry. It asks a [`Renderer`] to create or remove
//! one opaque visual per tile and to turn pointer events back into tile
//! coordinates.

mod headless;

pub use headless::{LiveVisual, RecordedCall, RecordingRenderer};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::buildings::{Building, BuildingCategory};

/// Everything a renderer needs to draw one building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualAttributes {
    pub variant: u8,
    pub height: u32,
    pub footprint: (u32, u32),
    pub asset_key: String,
}

impl From<&Building> for VisualAttributes {
    fn from(building: &Building) -> Self {
        Self {
            variant: building.variant,
            height: building.height,
            footprint: building.footprint,
            asset_key: building.asset_key(),
        }
    }
}

/// Pointer position in world units on the ground plane, as reported by the
/// presentation layer after its own camera/ray handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub x: f32,
    pub y: f32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VisualError {
    #[error("no asset registered for {0}")]
    MissingAsset(String),
}

pub trait Renderer {
    type Handle;

    fn create_visual(
        &mut self,
        category: BuildingCategory,
        x: usize,
        y: usize,
        attributes: &VisualAttributes,
    ) -> Result<Self::Handle, VisualError>;

    fn remove_visual(&mut self, handle: Self::Handle);

    fn resolve_selection(&self, event: &PointerEvent) -> Option<(usize, usize)>;
}
