//! Grid-cell hit-testing for tokens and area-effect shapes.
//!
//! Shapes are tested in grid units from their origin cell: circles, cones and
//! lines by radial distance, cubes by axis-aligned bounds. Tokens are tested
//! against their square footprint.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::GridCell;
use crate::doc::{AreaEffectShape, ShapeKind, Token};

/// Index of the first token whose footprint covers `cell`.
#[must_use]
pub fn token_at(tokens: &[Token], cell: GridCell) -> Option<usize> {
    tokens.iter().position(|t| t.occupies(cell))
}

/// Index of the first shape that covers `cell`.
#[must_use]
pub fn shape_at(shapes: &[AreaEffectShape], cell: GridCell) -> Option<usize> {
    shapes.iter().position(|s| shape_covers(s, cell))
}

/// Whether a single shape covers `cell`.
#[must_use]
pub fn shape_covers(shape: &AreaEffectShape, cell: GridCell) -> bool {
    let dx = f64::from(cell.col - shape.x);
    let dy = f64::from(cell.row - shape.y);
    let half = shape.size_cells() / 2.0;
    match shape.kind {
        ShapeKind::Cube => dx.abs() <= half && dy.abs() <= half,
        ShapeKind::Circle | ShapeKind::Cone | ShapeKind::Line => dx.hypot(dy) <= half,
    }
}
