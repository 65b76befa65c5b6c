//! Serializable projections of a scene.
//!
//! [`SceneSnapshot`] is the persisted shape. [`PlayerSnapshot`] is what the
//! player view receives: the persisted fields plus the background image, the
//! live ruler and the active-turn marker. Missing fields deserialize to the
//! same defaults a fresh scene uses.

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod snapshot_test;

use serde::{Deserialize, Serialize};

use crate::camera::GridCell;
use crate::consts::DEFAULT_GRID_SIZE;
use crate::doc::{AreaEffectShape, Token};

fn default_grid_size() -> f64 {
    DEFAULT_GRID_SIZE
}

fn default_true() -> bool {
    true
}

fn default_zoom() -> f64 {
    1.0
}

/// Live ruler state. Transient: synced to viewers, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub start: GridCell,
    pub end: GridCell,
    /// Feet, using the alternating 5/10 ft diagonal rule.
    pub distance: i64,
}

impl Measurement {
    #[must_use]
    pub fn new(start: GridCell, end: GridCell) -> Self {
        Self { start, end, distance: grid_distance_ft(start, end) }
    }
}

/// Walking distance in feet between two cells.
///
/// Every second diagonal step costs 10 ft instead of 5 ft.
#[must_use]
pub fn grid_distance_ft(from: GridCell, to: GridCell) -> i64 {
    let dx = (i64::from(to.col) - i64::from(from.col)).abs();
    let dy = (i64::from(to.row) - i64::from(from.row)).abs();
    let diagonal = dx.min(dy);
    let straight = dx.max(dy) - diagonal;
    straight * 5 + diagonal * 5 + (diagonal / 2) * 5
}

/// Persisted scene: `{ mapId, gridSize, showGrid, tokens, zoom, panX, panY,
/// aoeShapes, fogEnabled, fogData }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshot {
    #[serde(default)]
    pub map_id: Option<String>,
    #[serde(default = "default_grid_size")]
    pub grid_size: f64,
    #[serde(default = "default_true")]
    pub show_grid: bool,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    #[serde(default)]
    pub pan_x: f64,
    #[serde(default)]
    pub pan_y: f64,
    #[serde(default)]
    pub aoe_shapes: Vec<AreaEffectShape>,
    #[serde(default)]
    pub fog_enabled: bool,
    #[serde(default)]
    pub fog_data: Option<String>,
}

impl Default for SceneSnapshot {
    fn default() -> Self {
        Self {
            map_id: None,
            grid_size: DEFAULT_GRID_SIZE,
            show_grid: true,
            tokens: Vec::new(),
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            aoe_shapes: Vec::new(),
            fog_enabled: false,
            fog_data: None,
        }
    }
}

/// Snapshot pushed to player views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    /// Background image as a data URL.
    #[serde(default)]
    pub background: Option<String>,
    /// Native pixel size of the background, when present.
    #[serde(default)]
    pub background_width: Option<u32>,
    #[serde(default)]
    pub background_height: Option<u32>,
    #[serde(flatten)]
    pub scene: SceneSnapshot,
    #[serde(default)]
    pub measurement: Option<Measurement>,
    #[serde(default)]
    pub active_turn_token_id: Option<String>,
}
