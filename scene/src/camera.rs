//! Coordinate spaces: screen pixels, world pixels, and grid cells.
//!
//! Screen space is the canvas element as the pointer sees it. World space is
//! the unzoomed, unpanned canvas pixel space that the background, tokens and
//! the fog mask live in. Grid space is integer cells of the effective grid
//! size.
//!
//! Pan is stored normalized (a fraction of the canvas width/height) so it
//! stays meaningful when the canvas is resized. Zoom is clamped where it is
//! mutated ([`Camera::zoom_around`]), never inside the transforms.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{FEET_PER_CELL, ZOOM_MAX, ZOOM_MIN};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both components are finite numbers.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// An integer grid cell. Serialized as `{ "x": col, "y": row }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridCell {
    #[serde(rename = "x")]
    pub col: i32,
    #[serde(rename = "y")]
    pub row: i32,
}

impl GridCell {
    #[must_use]
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// The same cell with negative components clamped to zero.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self { col: self.col.max(0), row: self.row.max(0) }
    }
}

/// Canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions are positive and finite.
    #[must_use]
    pub fn is_drawable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Pan/zoom state.
///
/// `pan_x` / `pan_y` are fractions of the canvas width/height.
/// `zoom` is a scale factor (1.0 = no zoom), always within `[ZOOM_MIN, ZOOM_MAX]`
/// when set through the mutators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { zoom: 1.0, pan_x: 0.0, pan_y: 0.0 }
    }
}

impl Camera {
    /// Build a camera from untrusted values (e.g. a restored snapshot).
    /// Non-finite pan becomes zero and zoom is clamped.
    #[must_use]
    pub fn sanitized(zoom: f64, pan_x: f64, pan_y: f64) -> Self {
        Self {
            zoom: clamp_zoom(zoom),
            pan_x: if pan_x.is_finite() { pan_x } else { 0.0 },
            pan_y: if pan_y.is_finite() { pan_y } else { 0.0 },
        }
    }

    /// Pan offset in screen pixels for the given canvas.
    #[must_use]
    pub fn pan_px(&self, canvas: Size) -> Point {
        Point::new(self.pan_x * canvas.width, self.pan_y * canvas.height)
    }

    /// Convert a screen-space point to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point, canvas: Size) -> Point {
        let pan = self.pan_px(canvas);
        Point::new((screen.x - pan.x) / self.zoom, (screen.y - pan.y) / self.zoom)
    }

    /// Convert a world-space point to screen coordinates.
    #[must_use]
    pub fn world_to_screen(&self, world: Point, canvas: Size) -> Point {
        let pan = self.pan_px(canvas);
        Point::new(world.x * self.zoom + pan.x, world.y * self.zoom + pan.y)
    }

    /// Set zoom to `new_zoom` (clamped) while keeping the world point under
    /// `anchor` fixed on screen.
    pub fn zoom_around(&mut self, new_zoom: f64, anchor: Point, canvas: Size) {
        let new_zoom = clamp_zoom(new_zoom);
        if !canvas.is_drawable() || !anchor.is_finite() {
            self.zoom = new_zoom;
            return;
        }
        let world = self.screen_to_world(anchor, canvas);
        self.zoom = new_zoom;
        self.pan_x = (anchor.x - world.x * new_zoom) / canvas.width;
        self.pan_y = (anchor.y - world.y * new_zoom) / canvas.height;
    }

    /// Accumulate a pan given as a screen-pixel delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64, canvas: Size) {
        if !canvas.is_drawable() || !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.pan_x += dx / canvas.width;
        self.pan_y += dy / canvas.height;
    }

    /// Pan so that `world` lands in the middle of the canvas.
    pub fn center_on(&mut self, world: Point, canvas: Size) {
        if !canvas.is_drawable() || !world.is_finite() {
            return;
        }
        self.pan_x = (canvas.width / 2.0 - self.zoom * world.x) / canvas.width;
        self.pan_y = (canvas.height / 2.0 - self.zoom * world.y) / canvas.height;
    }

    /// Back to zoom 1, no pan.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Clamp a zoom value into the allowed range. NaN maps to 1.
#[must_use]
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        return 1.0;
    }
    zoom.clamp(ZOOM_MIN, ZOOM_MAX)
}

/// Everything needed to move between screen, world and grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateSpace {
    pub camera: Camera,
    pub canvas: Size,
    /// Native pixel width of the background image, if one is loaded.
    pub background_width: Option<f64>,
    /// Pixels per cell at 1:1 background scale.
    pub grid_size: f64,
}

impl CoordinateSpace {
    #[must_use]
    pub fn new(camera: Camera, canvas: Size, background_width: Option<f64>, grid_size: f64) -> Self {
        Self { camera, canvas, background_width, grid_size }
    }

    /// Ratio between canvas pixels and native background pixels (1 without a background).
    #[must_use]
    pub fn background_scale(&self) -> f64 {
        match self.background_width {
            Some(native) if native > 0.0 => {
                let scale = self.canvas.width / native;
                if scale.is_finite() && scale > 0.0 { scale } else { 1.0 }
            }
            _ => 1.0,
        }
    }

    /// World pixels per grid cell.
    #[must_use]
    pub fn effective_grid_size(&self) -> f64 {
        let size = self.grid_size * self.background_scale();
        if size.is_finite() && size > 0.0 { size } else { 1.0 }
    }

    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        self.camera.screen_to_world(screen, self.canvas)
    }

    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        self.camera.world_to_screen(world, self.canvas)
    }

    /// The cell containing a world point.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn world_to_cell(&self, world: Point) -> GridCell {
        let g = self.effective_grid_size();
        // `as` saturates, and NaN becomes 0.
        GridCell::new((world.x / g).floor() as i32, (world.y / g).floor() as i32)
    }

    /// The cell under a screen point.
    #[must_use]
    pub fn screen_to_cell(&self, screen: Point) -> GridCell {
        self.world_to_cell(self.screen_to_world(screen))
    }

    /// World-space center of a token of `size` cells anchored at `cell`.
    ///
    /// Tokens of one cell or less sit on the cell midpoint; larger tokens are
    /// offset by a whole cell so their footprint extends right and down.
    #[must_use]
    pub fn cell_to_world_center(&self, cell: GridCell, size: f64) -> Point {
        let g = self.effective_grid_size();
        let offset = if size <= 1.0 { g / 2.0 } else { g };
        Point::new(f64::from(cell.col) * g + offset, f64::from(cell.row) * g + offset)
    }

    /// World-space midpoint of a cell.
    #[must_use]
    pub fn cell_center(&self, cell: GridCell) -> Point {
        let g = self.effective_grid_size();
        Point::new((f64::from(cell.col) + 0.5) * g, (f64::from(cell.row) + 0.5) * g)
    }

    /// World pixels covered by a distance in feet.
    #[must_use]
    pub fn feet_to_world(&self, feet: f64) -> f64 {
        feet * self.effective_grid_size() / FEET_PER_CELL
    }
}

/// Fit a canvas inside `container`.
///
/// With a background of `(width, height)` native pixels the canvas keeps the
/// image aspect ratio and never upscales; without one it fills the container.
#[must_use]
pub fn fit_canvas(container: Size, background: Option<Size>) -> Size {
    let container = Size::new(container.width.max(0.0), container.height.max(0.0));
    match background {
        Some(image) if image.is_drawable() => {
            let scale = (container.width / image.width)
                .min(container.height / image.height)
                .min(1.0);
            Size::new(image.width * scale, image.height * scale)
        }
        _ => container,
    }
}
