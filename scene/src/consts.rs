//! Shared numeric constants for the scene crate.

// ── Camera ──────────────────────────────────────────────────────

/// Smallest zoom factor a mutation may set.
pub const ZOOM_MIN: f64 = 0.2;

/// Largest zoom factor a mutation may set.
pub const ZOOM_MAX: f64 = 5.0;

/// Zoom increment applied per wheel notch.
pub const ZOOM_STEP: f64 = 0.1;

// ── Grid ────────────────────────────────────────────────────────

/// Default pixels per grid cell at 1:1 background scale.
pub const DEFAULT_GRID_SIZE: f64 = 50.0;

/// Feet covered by one grid cell.
pub const FEET_PER_CELL: f64 = 5.0;

/// Side of the square, starting at the origin, scanned for a free cell when
/// placing a token without an explicit position.
pub const PLACEMENT_SEARCH_CELLS: i32 = 20;

// ── Area effects ────────────────────────────────────────────────

/// Full opening angle of a cone, in radians (60°).
pub const CONE_SPREAD: f64 = std::f64::consts::PI / 3.0;

/// Default area-effect size in feet.
pub const DEFAULT_AOE_SIZE_FT: f64 = 20.0;

/// Default area-effect color (before the alpha suffix).
pub const DEFAULT_AOE_COLOR: &str = "#9b2c2c";

/// Alpha suffix appended to area-effect colors at placement.
pub const AOE_ALPHA_SUFFIX: &str = "66";

// ── Fog ─────────────────────────────────────────────────────────

/// Default fog brush diameter, in grid cells.
pub const DEFAULT_FOG_BRUSH_CELLS: f64 = 2.0;

/// Fog opacity used for the DM render.
pub const FOG_OPACITY_DM: f64 = 0.5;

/// Fog opacity used for the player render.
pub const FOG_OPACITY_PLAYER: f64 = 1.0;

// ── Transient overlays ──────────────────────────────────────────

/// Lifetime of a roll popup.
pub const ROLL_POPUP_MS: f64 = 2000.0;

/// Lifetime of a token glow.
pub const GLOW_MS: f64 = 500.0;

// ── Persistence ─────────────────────────────────────────────────

/// Quiet period after the last change before the scene is saved.
pub const AUTOSAVE_DEBOUNCE_MS: f64 = 2000.0;

/// Canvas size changes at or below this many pixels keep the camera.
pub const CANVAS_RESIZE_TOLERANCE_PX: f64 = 1.0;
