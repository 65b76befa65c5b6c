//! The scene aggregate and every mutation on it.
//!
//! `Scene` is the single owner of battlemap state. Mutations are synchronous
//! and return a [`Change`] describing what the caller must do next: redraw,
//! push a snapshot to player views immediately, and/or re-arm the debounced
//! save. Nothing here performs I/O.
//!
//! Invariants maintained by the mutators:
//! - token cells are non-negative, token size is at least 0.5, HP is within
//!   `[0, max_hp]`
//! - zoom stays within `[ZOOM_MIN, ZOOM_MAX]`
//! - the fog mask always matches the canvas dimensions
//! - a selected or active-turn id that no longer resolves reads as "none"

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::HashMap;
use std::io::Cursor;
use std::ops::{BitOr, BitOrAssign};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::camera::{Camera, CoordinateSpace, GridCell, Point, Size, fit_canvas};
use crate::consts::{
    CANVAS_RESIZE_TOLERANCE_PX, DEFAULT_GRID_SIZE, GLOW_MS, PLACEMENT_SEARCH_CELLS, ROLL_POPUP_MS, ZOOM_STEP,
};
use crate::doc::{AreaEffectShape, ShapeKind, Token};
use crate::fog::{FogMask, FogMode};
use crate::hit;
use crate::snapshot::{Measurement, PlayerSnapshot, SceneSnapshot};

// =============================================================
// Change
// =============================================================

/// Follow-up work a mutation requires from its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Change {
    /// Redraw the authoring view.
    pub render: bool,
    /// Push a snapshot to player views now.
    pub sync: bool,
    /// Re-arm the debounced save.
    pub persist: bool,
}

impl Change {
    pub const NONE: Self = Self { render: false, sync: false, persist: false };
    /// Local-only visual change (selection, previews, transients).
    pub const RENDER: Self = Self { render: true, sync: false, persist: false };
    /// Visible to players but not persisted (ruler).
    pub const VISIBLE: Self = Self { render: true, sync: true, persist: false };
    /// Structural edit: redraw, sync and save.
    pub const EDIT: Self = Self { render: true, sync: true, persist: true };

    #[must_use]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl BitOr for Change {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            render: self.render || rhs.render,
            sync: self.sync || rhs.sync,
            persist: self.persist || rhs.persist,
        }
    }
}

impl BitOrAssign for Change {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

// =============================================================
// Background
// =============================================================

/// Error decoding a background image.
#[derive(Debug, thiserror::Error)]
pub enum BackgroundError {
    #[error("background is not a base64 data URL")]
    NotDataUrl,
    #[error("background data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to read background image: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode background image: {0}")]
    Image(#[from] image::ImageError),
}

/// Background image: a portable data URL plus its native pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Background {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

impl Background {
    /// Sniff the format and dimensions of encoded image bytes.
    ///
    /// # Errors
    ///
    /// Fails when the bytes are not a readable image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BackgroundError> {
        let reader = image::ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let mime = reader.format().map_or("image/png", |f| f.to_mime_type());
        let (width, height) = reader.into_dimensions()?;
        Ok(Self { data_url: format!("data:{mime};base64,{}", STANDARD.encode(bytes)), width, height })
    }

    /// Parse a `data:<mime>;base64,<payload>` URL.
    ///
    /// # Errors
    ///
    /// Fails for non-data URLs and undecodable payloads.
    pub fn from_data_url(data_url: &str) -> Result<Self, BackgroundError> {
        let Some((header, body)) = data_url.split_once(',') else {
            return Err(BackgroundError::NotDataUrl);
        };
        if !header.starts_with("data:") {
            return Err(BackgroundError::NotDataUrl);
        }
        let bytes = STANDARD.decode(body.trim())?;
        let reader = image::ImageReader::new(Cursor::new(&bytes)).with_guessed_format()?;
        let (width, height) = reader.into_dimensions()?;
        Ok(Self { data_url: data_url.to_owned(), width, height })
    }

    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

// =============================================================
// Transient overlays
// =============================================================

/// Category of a roll popup; drives its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollKind {
    Attack,
    Damage,
    Save,
    Heal,
    #[serde(other)]
    Other,
}

impl RollKind {
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "attack" => Self::Attack,
            "damage" => Self::Damage,
            "save" => Self::Save,
            "heal" => Self::Heal,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Attack => "#4a9eff",
            Self::Damage => "#ff4a4a",
            Self::Save => "#9b59b6",
            Self::Heal => "#2ecc71",
            Self::Other => "#f1c40f",
        }
    }
}

/// Floating roll result anchored where the token stood when it was rolled.
#[derive(Debug, Clone, PartialEq)]
pub struct RollPopup {
    pub token_id: String,
    pub text: String,
    pub kind: RollKind,
    pub cell: GridCell,
    pub started_ms: f64,
}

/// Short-lived halo around a token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGlow {
    pub color: String,
    pub started_ms: f64,
}

/// Token data offered to the combat tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatReadyToken {
    pub instance_id: String,
    pub slug: String,
    pub name: String,
}

// =============================================================
// Scene
// =============================================================

/// Authoritative battlemap state.
#[derive(Debug, Clone)]
pub struct Scene {
    pub background: Option<Background>,
    pub current_map_id: Option<String>,
    /// Pixels per cell at 1:1 background scale.
    pub grid_size: f64,
    pub show_grid: bool,
    pub tokens: Vec<Token>,
    pub selected_token_id: Option<String>,
    pub camera: Camera,
    /// Current canvas size in pixels; also the fog mask size.
    pub canvas: Size,
    /// Space available to the canvas, remembered for re-fitting.
    pub container: Size,
    pub aoe_shapes: Vec<AreaEffectShape>,
    /// Cone or line waiting for its aiming click.
    pub pending_shape: Option<AreaEffectShape>,
    pub fog_enabled: bool,
    pub fog: FogMask,
    pub active_turn_token_id: Option<String>,
    pub measurement: Option<Measurement>,
    pub roll_popups: Vec<RollPopup>,
    pub token_glows: HashMap<String, TokenGlow>,
    pub drop_preview: Option<GridCell>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            background: None,
            current_map_id: None,
            grid_size: DEFAULT_GRID_SIZE,
            show_grid: true,
            tokens: Vec::new(),
            selected_token_id: None,
            camera: Camera::default(),
            canvas: Size::default(),
            container: Size::default(),
            aoe_shapes: Vec::new(),
            pending_shape: None,
            fog_enabled: false,
            fog: FogMask::default(),
            active_turn_token_id: None,
            measurement: None,
            roll_popups: Vec::new(),
            token_glows: HashMap::new(),
            drop_preview: None,
        }
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Coordinate transforms for the current camera, canvas and background.
    #[must_use]
    pub fn space(&self) -> CoordinateSpace {
        CoordinateSpace::new(
            self.camera,
            self.canvas,
            self.background.as_ref().map(|b| f64::from(b.width)),
            self.grid_size,
        )
    }

    // --- Layout ---

    /// Fit the canvas into `container` and remember the container.
    pub fn layout(&mut self, container: Size) -> Change {
        self.container = container;
        self.refit()
    }

    fn refit(&mut self) -> Change {
        let target = fit_canvas(self.container, self.background.as_ref().map(Background::size));
        self.resize_canvas(target)
    }

    /// Set the canvas size. A change of more than a pixel resets the camera;
    /// the fog mask is stretched to the new size.
    pub fn resize_canvas(&mut self, size: Size) -> Change {
        let old = self.canvas;
        self.canvas = size;
        let mut change = Change::NONE;
        if (old.width - size.width).abs() > CANVAS_RESIZE_TOLERANCE_PX
            || (old.height - size.height).abs() > CANVAS_RESIZE_TOLERANCE_PX
        {
            info!(old_w = old.width, old_h = old.height, new_w = size.width, new_h = size.height, "scene: canvas resized");
            self.camera.reset();
            change |= Change::EDIT;
        } else if old != size {
            change |= Change::VISIBLE;
        }
        self.fit_fog();
        change
    }

    fn fit_fog(&mut self) {
        let (w, h) = mask_dims(self.canvas);
        self.fog.resize(w, h);
    }

    // --- Background ---

    /// Replace the background. Pan and zoom reset so a new map never inherits
    /// the previous framing.
    pub fn set_background(&mut self, background: Option<Background>, map_id: Option<String>) -> Change {
        self.background = background;
        self.current_map_id = map_id;
        self.camera.reset();
        self.refit() | Change::EDIT
    }

    pub fn clear_background(&mut self) -> Change {
        self.set_background(None, None)
    }

    // --- Grid ---

    pub fn set_grid_size(&mut self, grid_size: f64) -> Change {
        if !grid_size.is_finite() || grid_size <= 0.0 {
            return Change::NONE;
        }
        self.grid_size = grid_size;
        Change::EDIT
    }

    pub fn set_show_grid(&mut self, show: bool) -> Change {
        self.show_grid = show;
        Change::EDIT
    }

    // --- Tokens ---

    /// Index of the token whose footprint covers `cell`.
    #[must_use]
    pub fn token_at(&self, cell: GridCell) -> Option<&Token> {
        hit::token_at(&self.tokens, cell).map(|i| &self.tokens[i])
    }

    /// Token by scene id or instance id.
    #[must_use]
    pub fn token(&self, id: &str) -> Option<&Token> {
        self.tokens.iter().find(|t| t.matches(id))
    }

    #[must_use]
    pub fn selected_token(&self) -> Option<&Token> {
        self.selected_token_id.as_deref().and_then(|id| self.tokens.iter().find(|t| t.id == id))
    }

    /// Place a new token on the first free cell of the search square, scanning
    /// row-major from the origin. A full square falls back to the origin and
    /// accepts the overlap.
    pub fn add_token(
        &mut self,
        name: &str,
        color: &str,
        size: f64,
        slug: Option<String>,
        related_id: Option<String>,
    ) -> (Token, Change) {
        let mut token = Token::new(name, color, size);
        if let Some(related) = &related_id {
            token.id.clone_from(related);
            token.instance_id.clone_from(related);
        }
        token.slug = slug;
        token.combatant_id = related_id;

        let cell = self.first_free_cell().unwrap_or_else(|| {
            warn!(name, "scene: no free cell in search area, placing at origin");
            GridCell::default()
        });
        token.x = cell.col;
        token.y = cell.row;

        self.tokens.push(token.clone());
        (token, Change::EDIT)
    }

    fn first_free_cell(&self) -> Option<GridCell> {
        (0..PLACEMENT_SEARCH_CELLS)
            .flat_map(|row| (0..PLACEMENT_SEARCH_CELLS).map(move |col| GridCell::new(col, row)))
            .find(|&cell| self.token_at(cell).is_none())
    }

    /// Insert a fully-formed token (drop spawn, roster hydration).
    pub fn insert_token(&mut self, token: Token) -> Change {
        self.tokens.push(token.normalized());
        Change::EDIT
    }

    pub fn remove_token(&mut self, id: &str) -> Change {
        let before = self.tokens.len();
        self.tokens.retain(|t| t.id != id);
        if self.tokens.len() == before {
            return Change::NONE;
        }
        if self.selected_token_id.as_deref() == Some(id) {
            self.selected_token_id = None;
        }
        self.token_glows.remove(id);
        Change::EDIT
    }

    pub fn move_token(&mut self, id: &str, cell: GridCell) -> Change {
        let Some(token) = self.tokens.iter_mut().find(|t| t.id == id) else {
            return Change::NONE;
        };
        let cell = cell.clamped();
        token.x = cell.col;
        token.y = cell.row;
        Change::EDIT
    }

    /// Set HP, clamped to `[0, max_hp]`. A token without a max adopts the new
    /// value as its max.
    pub fn update_token_hp(&mut self, id: &str, hp: i32) -> Change {
        let Some(token) = self.tokens.iter_mut().find(|t| t.matches(id)) else {
            return Change::NONE;
        };
        match token.max_hp {
            Some(max) => {
                token.max_hp = Some(max.max(0));
                token.hp = Some(hp.clamp(0, max.max(0)));
            }
            None => {
                let hp = hp.max(0);
                token.hp = Some(hp);
                token.max_hp = Some(hp);
            }
        }
        Change::EDIT
    }

    /// HP write-back from the combat tracker, matched on instance id only.
    pub fn update_hp_by_instance(&mut self, instance_id: &str, hp: i32) -> Change {
        let Some(id) = self.tokens.iter().find(|t| t.instance_id == instance_id).map(|t| t.id.clone()) else {
            return Change::NONE;
        };
        self.update_token_hp(&id, hp)
    }

    pub fn clear_tokens(&mut self) -> Change {
        self.tokens.clear();
        self.selected_token_id = None;
        self.token_glows.clear();
        self.roll_popups.clear();
        Change::EDIT
    }

    // --- Selection ---

    pub fn select_token(&mut self, id: Option<&str>) -> Change {
        self.selected_token_id = id.and_then(|id| self.tokens.iter().find(|t| t.id == id)).map(|t| t.id.clone());
        Change::RENDER
    }

    /// Select by combat instance id; unknown or `None` deselects.
    pub fn select_by_instance(&mut self, instance_id: Option<&str>) -> Change {
        self.selected_token_id = instance_id
            .and_then(|iid| self.tokens.iter().find(|t| t.instance_id == iid))
            .map(|t| t.id.clone());
        Change::RENDER
    }

    // --- Area effects ---

    /// Place a shape. Circles and cubes commit at once; cones and lines
    /// become the pending preview until [`Scene::commit_pending`].
    pub fn place_area_effect(&mut self, kind: ShapeKind, origin: GridCell, size_ft: f64, color: &str) -> Change {
        let shape = AreaEffectShape::new(kind, origin, size_ft, color);
        if kind.is_aimed() {
            self.pending_shape = Some(shape);
            return Change::RENDER;
        }
        self.aoe_shapes.push(shape);
        Change::EDIT
    }

    /// Point the pending cone or line at `cell`.
    pub fn aim_pending(&mut self, cell: GridCell) -> Change {
        let Some(pending) = self.pending_shape.as_mut() else {
            return Change::NONE;
        };
        let dx = f64::from(cell.col - pending.x);
        let dy = f64::from(cell.row - pending.y);
        pending.rotation = dy.atan2(dx).to_degrees();
        Change::RENDER
    }

    pub fn commit_pending(&mut self) -> Change {
        let Some(shape) = self.pending_shape.take() else {
            return Change::NONE;
        };
        self.aoe_shapes.push(shape);
        Change::EDIT
    }

    pub fn discard_pending(&mut self) -> Change {
        if self.pending_shape.take().is_some() { Change::RENDER } else { Change::NONE }
    }

    pub fn remove_area_effect_at(&mut self, cell: GridCell) -> Change {
        let Some(index) = hit::shape_at(&self.aoe_shapes, cell) else {
            return Change::NONE;
        };
        self.aoe_shapes.remove(index);
        Change::EDIT
    }

    /// Delete whatever sits at `cell`; shapes take priority over tokens.
    pub fn remove_at(&mut self, cell: GridCell) -> Change {
        let change = self.remove_area_effect_at(cell);
        if !change.is_none() {
            return change;
        }
        match self.token_at(cell).map(|t| t.id.clone()) {
            Some(id) => self.remove_token(&id),
            None => Change::NONE,
        }
    }

    pub fn clear_area_effects(&mut self) -> Change {
        self.aoe_shapes.clear();
        self.pending_shape = None;
        Change::EDIT
    }

    // --- Camera ---

    /// Zoom to `zoom` (clamped) keeping the world point under `anchor` fixed.
    pub fn set_zoom_around(&mut self, zoom: f64, anchor: Point) -> Change {
        self.camera.zoom_around(zoom, anchor, self.canvas);
        Change::EDIT
    }

    /// One wheel notch: scrolling down zooms out.
    pub fn zoom_step(&mut self, delta_y: f64, anchor: Point) -> Change {
        if !delta_y.is_finite() || delta_y == 0.0 {
            return Change::NONE;
        }
        let step = if delta_y > 0.0 { -ZOOM_STEP } else { ZOOM_STEP };
        self.set_zoom_around(self.camera.zoom + step, anchor)
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Change {
        self.camera.pan_by(dx, dy, self.canvas);
        Change::EDIT
    }

    /// Center the view on a token found by instance id.
    pub fn pan_to_token(&mut self, instance_id: &str) -> Change {
        let Some(token) = self.tokens.iter().find(|t| t.instance_id == instance_id) else {
            return Change::NONE;
        };
        let center = self.token_center(token);
        self.camera.center_on(center, self.canvas);
        Change::EDIT
    }

    // --- Fog ---

    pub fn set_fog_enabled(&mut self, enabled: bool) -> Change {
        self.fog_enabled = enabled;
        if enabled {
            self.fit_fog();
        }
        Change::EDIT
    }

    /// One brush dab at a world point. Mid-stroke dabs only redraw; the
    /// stroke end syncs and saves.
    pub fn fog_dab(&mut self, world: Point, mode: FogMode, brush_cells: f64) -> Change {
        if !self.fog_enabled {
            return Change::NONE;
        }
        let radius = brush_cells * self.space().effective_grid_size() / 2.0;
        self.fog.paint(world, radius, mode);
        Change::RENDER
    }

    pub fn end_fog_stroke(&mut self) -> Change {
        if self.fog_enabled { Change::EDIT } else { Change::NONE }
    }

    pub fn reveal_all_fog(&mut self) -> Change {
        self.fog.reveal_all();
        Change::EDIT
    }

    pub fn hide_all_fog(&mut self) -> Change {
        self.fog.hide_all();
        Change::EDIT
    }

    /// Portable fog data, or `None` when fog is off or cannot be encoded.
    #[must_use]
    pub fn fog_portable(&self) -> Option<String> {
        if !self.fog_enabled {
            return None;
        }
        match self.fog.to_portable() {
            Ok(data) => Some(data),
            Err(err) => {
                warn!(error = %err, "scene: fog encode failed");
                None
            }
        }
    }

    /// Load portable fog data; failures are logged and leave the mask as is.
    pub fn load_fog(&mut self, data: &str) -> bool {
        self.fit_fog();
        match self.fog.from_portable(data) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "scene: fog decode failed");
                false
            }
        }
    }

    // --- Ruler ---

    pub fn begin_measurement(&mut self, cell: GridCell) -> Change {
        self.measurement = Some(Measurement::new(cell, cell));
        Change::RENDER
    }

    pub fn update_measurement(&mut self, cell: GridCell) -> Change {
        let Some(m) = self.measurement.as_mut() else {
            return Change::NONE;
        };
        *m = Measurement::new(m.start, cell);
        Change::VISIBLE
    }

    pub fn end_measurement(&mut self) -> Change {
        if self.measurement.take().is_some() { Change::VISIBLE } else { Change::NONE }
    }

    // --- Drop preview ---

    pub fn set_drop_preview(&mut self, cell: Option<GridCell>) -> Change {
        if self.drop_preview == cell {
            return Change::NONE;
        }
        self.drop_preview = cell;
        Change::RENDER
    }

    // --- Transients ---

    pub fn show_roll_popup(&mut self, token_id: &str, text: &str, kind: RollKind, now_ms: f64) -> Change {
        let Some(token) = self.token(token_id) else {
            return Change::NONE;
        };
        let popup = RollPopup {
            token_id: token.id.clone(),
            text: text.to_owned(),
            kind,
            cell: token.cell(),
            started_ms: now_ms,
        };
        self.roll_popups.push(popup);
        Change::RENDER
    }

    pub fn glow_token(&mut self, token_id: &str, color: &str, now_ms: f64) -> Change {
        let Some(id) = self.token(token_id).map(|t| t.id.clone()) else {
            return Change::NONE;
        };
        self.token_glows.insert(id, TokenGlow { color: color.to_owned(), started_ms: now_ms });
        Change::RENDER
    }

    /// Drop expired popups and glows.
    pub fn prune_transients(&mut self, now_ms: f64) -> Change {
        let before = self.roll_popups.len() + self.token_glows.len();
        self.roll_popups.retain(|p| now_ms - p.started_ms < ROLL_POPUP_MS);
        self.token_glows.retain(|_, g| now_ms - g.started_ms < GLOW_MS);
        if self.roll_popups.len() + self.token_glows.len() == before { Change::NONE } else { Change::RENDER }
    }

    /// Whether an animation is still running.
    #[must_use]
    pub fn has_transients(&self) -> bool {
        !self.roll_popups.is_empty() || !self.token_glows.is_empty()
    }

    // --- Combat integration ---

    /// Highlight the token linked to a combat-turn entity. No match clears
    /// the highlight.
    pub fn set_active_turn(&mut self, combatant_id: Option<&str>) -> Change {
        self.active_turn_token_id = combatant_id
            .and_then(|cid| {
                self.tokens
                    .iter()
                    .find(|t| t.instance_id == cid || t.combatant_id.as_deref() == Some(cid) || t.id == cid)
            })
            .map(|t| t.id.clone());
        Change::VISIBLE
    }

    /// The active-turn token, if it still exists.
    #[must_use]
    pub fn active_turn_token(&self) -> Option<&Token> {
        self.active_turn_token_id.as_deref().and_then(|id| self.tokens.iter().find(|t| t.id == id))
    }

    /// Tokens that can become combat entities (those linked to a monster).
    #[must_use]
    pub fn combat_ready_tokens(&self) -> Vec<CombatReadyToken> {
        self.tokens
            .iter()
            .filter_map(|t| {
                let slug = t.slug.as_ref().filter(|s| !s.is_empty())?;
                Some(CombatReadyToken { instance_id: t.instance_id.clone(), slug: slug.clone(), name: t.name.clone() })
            })
            .collect()
    }

    // --- Geometry helpers ---

    #[must_use]
    pub fn token_center(&self, token: &Token) -> Point {
        self.space().cell_to_world_center(token.cell(), token.size)
    }

    #[must_use]
    pub fn token_radius(&self, token: &Token) -> f64 {
        (self.space().effective_grid_size() * token.size / 2.0 - 4.0).max(8.0)
    }

    // --- Whole-scene operations ---

    /// Reset to an empty scene, keeping grid settings and layout.
    pub fn end_encounter(&mut self) -> Change {
        let grid_size = self.grid_size;
        let show_grid = self.show_grid;
        let container = self.container;
        *self = Self { grid_size, show_grid, ..Self::default() };
        self.layout(container) | Change::EDIT
    }

    #[must_use]
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            map_id: self.current_map_id.clone(),
            grid_size: self.grid_size,
            show_grid: self.show_grid,
            tokens: self.tokens.clone(),
            zoom: self.camera.zoom,
            pan_x: self.camera.pan_x,
            pan_y: self.camera.pan_y,
            aoe_shapes: self.aoe_shapes.clone(),
            fog_enabled: self.fog_enabled,
            fog_data: self.fog_portable(),
        }
    }

    #[must_use]
    pub fn player_snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            background: self.background.as_ref().map(|b| b.data_url.clone()),
            background_width: self.background.as_ref().map(|b| b.width),
            background_height: self.background.as_ref().map(|b| b.height),
            scene: self.snapshot(),
            measurement: self.measurement,
            active_turn_token_id: self.active_turn_token_id.clone(),
        }
    }

    /// Apply persisted fields. The background and map id are left to the
    /// caller, which resolves them first.
    pub fn apply_snapshot(&mut self, snapshot: &SceneSnapshot) -> Change {
        if snapshot.grid_size.is_finite() && snapshot.grid_size > 0.0 {
            self.grid_size = snapshot.grid_size;
        } else {
            self.grid_size = DEFAULT_GRID_SIZE;
        }
        self.show_grid = snapshot.show_grid;
        self.tokens = snapshot.tokens.iter().cloned().map(Token::normalized).collect();
        self.aoe_shapes = snapshot.aoe_shapes.iter().cloned().map(AreaEffectShape::normalized).collect();
        self.camera = Camera::sanitized(snapshot.zoom, snapshot.pan_x, snapshot.pan_y);
        self.fog_enabled = snapshot.fog_enabled;
        self.selected_token_id = None;
        self.pending_shape = None;
        self.measurement = None;
        self.drop_preview = None;
        self.roll_popups.clear();
        self.token_glows.clear();

        match &snapshot.fog_data {
            Some(data) => {
                self.load_fog(data);
            }
            None => {
                self.fit_fog();
                self.fog.hide_all();
            }
        }
        Change::EDIT
    }

    /// Apply a snapshot received from the authoring view.
    pub fn apply_player_snapshot(&mut self, snapshot: &PlayerSnapshot) -> Change {
        let background = snapshot.background.as_deref().and_then(|url| {
            match (snapshot.background_width, snapshot.background_height) {
                (Some(width), Some(height)) if width > 0 && height > 0 => {
                    Some(Background { data_url: url.to_owned(), width, height })
                }
                _ => match Background::from_data_url(url) {
                    Ok(bg) => Some(bg),
                    Err(err) => {
                        warn!(error = %err, "scene: player background decode failed");
                        None
                    }
                },
            }
        });
        if background != self.background {
            self.background = background;
            self.refit();
        }
        self.current_map_id.clone_from(&snapshot.scene.map_id);
        let change = self.apply_snapshot(&snapshot.scene);
        self.measurement = snapshot.measurement;
        self.active_turn_token_id.clone_from(&snapshot.active_turn_token_id);
        change
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn mask_dims(size: Size) -> (u32, u32) {
    let dim = |v: f64| if v.is_finite() && v > 0.0 { v.round().min(f64::from(u32::MAX)) as u32 } else { 0 };
    (dim(size.width), dim(size.height))
}
