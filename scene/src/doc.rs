//! Scene document model: tokens and area-effect shapes.
//!
//! These are the persisted, synced records. Field names serialize in
//! camelCase to match the snapshot shape stored by the server and consumed by
//! player views. Values coming off the wire pass through `normalized` before
//! they enter a scene so the invariants below hold regardless of source.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};

use crate::camera::GridCell;
use crate::consts::FEET_PER_CELL;

/// Smallest token footprint multiplier (Tiny).
pub const MIN_TOKEN_SIZE: f64 = 0.5;

/// Smallest area-effect size in feet.
pub const MIN_SHAPE_SIZE_FT: f64 = 5.0;

/// Fresh string id for tokens and shapes.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A placed creature marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Stable within a scene.
    pub id: String,
    /// Identity across scene rebuilds; correlates with combat-turn entities.
    #[serde(default)]
    pub instance_id: String,
    pub name: String,
    pub color: String,
    /// Grid-cell multiplier: 0.5 Tiny up to 4 Gargantuan.
    #[serde(default = "default_token_size")]
    pub size: f64,
    /// Top-left anchor column.
    #[serde(default)]
    pub x: i32,
    /// Top-left anchor row.
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub hp: Option<i32>,
    #[serde(default)]
    pub max_hp: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combatant_id: Option<String>,
}

fn default_token_size() -> f64 {
    1.0
}

impl Token {
    /// A token at the origin with fresh ids and no HP.
    #[must_use]
    pub fn new(name: impl Into<String>, color: impl Into<String>, size: f64) -> Self {
        let id = new_id();
        Self {
            instance_id: id.clone(),
            id,
            name: name.into(),
            color: color.into(),
            size,
            x: 0,
            y: 0,
            slug: None,
            hp: None,
            max_hp: None,
            combatant_id: None,
        }
        .normalized()
    }

    /// Enforce the token invariants: non-negative cell, minimum size, a max
    /// HP whenever HP is present, and HP within `[0, max_hp]`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.x = self.x.max(0);
        self.y = self.y.max(0);
        self.size = if self.size.is_finite() { self.size.max(MIN_TOKEN_SIZE) } else { 1.0 };
        if self.instance_id.is_empty() {
            self.instance_id.clone_from(&self.id);
        }
        self.max_hp = match (self.hp, self.max_hp) {
            (_, Some(max)) => Some(max.max(0)),
            (Some(hp), None) => Some(hp.max(0)),
            (None, None) => None,
        };
        if let (Some(hp), Some(max)) = (self.hp, self.max_hp) {
            self.hp = Some(hp.clamp(0, max.max(0)));
        }
        self
    }

    /// Top-left anchor cell.
    #[must_use]
    pub fn cell(&self) -> GridCell {
        GridCell::new(self.x, self.y)
    }

    /// Number of cells the footprint spans per side; tiny tokens still own one cell.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn footprint_cells(&self) -> i32 {
        (self.size.ceil() as i32).max(1)
    }

    /// Whether `cell` falls inside this token's `size × size` footprint.
    #[must_use]
    pub fn occupies(&self, cell: GridCell) -> bool {
        let span = self.footprint_cells();
        (self.x..self.x + span).contains(&cell.col) && (self.y..self.y + span).contains(&cell.row)
    }

    /// Whether `id` names this token either by scene id or instance id.
    #[must_use]
    pub fn matches(&self, id: &str) -> bool {
        self.id == id || self.instance_id == id
    }

    /// HP as a fraction of max, if the token tracks HP.
    #[must_use]
    pub fn hp_fraction(&self) -> Option<f64> {
        match (self.hp, self.max_hp) {
            (Some(hp), Some(max)) if max > 0 => Some(f64::from(hp) / f64::from(max)),
            (Some(_), Some(_)) => Some(0.0),
            _ => None,
        }
    }
}

/// Area-effect geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Circle,
    Cube,
    Cone,
    Line,
}

impl ShapeKind {
    /// Cones and lines need a second click to fix their direction.
    #[must_use]
    pub fn is_aimed(self) -> bool {
        matches!(self, Self::Cone | Self::Line)
    }
}

/// A persistent area-of-effect annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaEffectShape {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    /// Origin column.
    pub x: i32,
    /// Origin row.
    pub y: i32,
    /// Extent in feet: circle diameter, cube side, cone or line length.
    pub size: f64,
    /// Degrees, raw `atan2` output. Only meaningful for cones and lines.
    #[serde(default)]
    pub rotation: f64,
    pub color: String,
    #[serde(default)]
    pub label: String,
}

impl AreaEffectShape {
    #[must_use]
    pub fn new(kind: ShapeKind, origin: GridCell, size_ft: f64, color: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            kind,
            x: origin.col,
            y: origin.row,
            size: size_ft,
            rotation: 0.0,
            color: color.into(),
            label: String::new(),
        }
        .normalized()
    }

    /// Enforce a positive size and a finite rotation.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.size = if self.size.is_finite() { self.size.max(MIN_SHAPE_SIZE_FT) } else { MIN_SHAPE_SIZE_FT };
        if !self.rotation.is_finite() {
            self.rotation = 0.0;
        }
        self
    }

    #[must_use]
    pub fn origin(&self) -> GridCell {
        GridCell::new(self.x, self.y)
    }

    /// Size expressed in grid cells.
    #[must_use]
    pub fn size_cells(&self) -> f64 {
        self.size / FEET_PER_CELL
    }
}

/// Creature size category as reported by monster records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreatureSize {
    Tiny,
    Small,
    Medium,
    Large,
    Huge,
    Gargantuan,
}

impl CreatureSize {
    /// Parse a category name; unknown names yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tiny" => Some(Self::Tiny),
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            "huge" => Some(Self::Huge),
            "gargantuan" => Some(Self::Gargantuan),
            _ => None,
        }
    }

    /// Token size multiplier.
    #[must_use]
    pub fn grid_multiplier(self) -> f64 {
        match self {
            Self::Tiny => 0.5,
            Self::Small | Self::Medium => 1.0,
            Self::Large => 2.0,
            Self::Huge => 3.0,
            Self::Gargantuan => 4.0,
        }
    }

    /// Multiplier for a category name, defaulting to one cell.
    #[must_use]
    pub fn multiplier_for(name: &str) -> f64 {
        Self::parse(name).map_or(1.0, Self::grid_multiplier)
    }
}
