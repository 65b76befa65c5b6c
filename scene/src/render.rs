//! Rendering: turns a scene into an ordered display list.
//!
//! [`render`] is pure. It reads the scene and the clock and returns the
//! [`DrawOp`]s for one frame, back to front, in world coordinates under the
//! camera transform set by the leading [`DrawOp::Begin`]. The browser replay
//! lives in [`crate::paint`]; tests inspect the list directly.
//!
//! Layer order: background, grid, area effects (with the pending preview),
//! drop preview, tokens, roll popups, ruler, fog. Stroke widths, fonts and
//! padding are divided by zoom so they stay constant on screen.
//!
//! The `for_player` flag changes exactly one thing: the opacity of the final
//! fog op.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use crate::camera::{Point, Size};
use crate::consts::{CONE_SPREAD, FOG_OPACITY_DM, FOG_OPACITY_PLAYER, GLOW_MS, ROLL_POPUP_MS};
use crate::doc::{AreaEffectShape, ShapeKind, Token};
use crate::scene::{RollPopup, Scene};

// ── Palette ──────────────────────────────────────────────────

const EMPTY_BACKGROUND: &str = "#3a3a3a";
const GRID_STROKE: &str = "rgba(255,255,255,0.3)";
const DROP_FILL: &str = "rgba(0, 200, 100, 0.3)";
const DROP_STROKE: &str = "rgba(0, 200, 100, 0.8)";
const TOKEN_BORDER: &str = "rgba(255,255,255,0.8)";
const SELECTION_RING: &str = "#fff";
const ACTIVE_TURN_RING: &str = "#f1c40f";
const HP_TRACK: &str = "#333";
const PILL_FILL: &str = "rgba(0,0,0,0.8)";
const RULER: &str = "#9B2C2C";

/// Grid lines beyond this count per axis are skipped; the grid would be a
/// solid wash anyway.
const MAX_GRID_LINES: f64 = 4096.0;

/// Fill, stroke and compositing for one op.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub line_width: f64,
    /// Dash pattern in world units; empty for solid.
    pub dash: Vec<f64>,
    /// Global alpha applied to the whole op.
    pub alpha: f64,
}

impl Style {
    #[must_use]
    pub fn filled(color: impl Into<String>) -> Self {
        Self { fill: Some(color.into()), stroke: None, line_width: 0.0, dash: Vec::new(), alpha: 1.0 }
    }

    #[must_use]
    pub fn stroked(color: impl Into<String>, width: f64) -> Self {
        Self { fill: None, stroke: Some(color.into()), line_width: width, dash: Vec::new(), alpha: 1.0 }
    }

    #[must_use]
    pub fn with_stroke(mut self, color: impl Into<String>, width: f64) -> Self {
        self.stroke = Some(color.into());
        self.line_width = width;
        self
    }

    #[must_use]
    pub fn with_dash(mut self, dash: Vec<f64>) -> Self {
        self.dash = dash;
        self
    }

    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Text centered on a rounded pill sized to fit it.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub center: Point,
    pub font_px: f64,
    /// Horizontal padding on each side of the measured text.
    pub padding: f64,
    pub height: f64,
    pub corner_radius: f64,
    pub background: String,
    pub border: String,
    pub border_width: f64,
    pub text_color: String,
    pub alpha: f64,
}

/// One drawing instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Clear the canvas, then translate by `pan` pixels and scale by `zoom`.
    Begin { canvas: Size, pan: Point, zoom: f64 },
    /// The background image stretched over `(0, 0, size)`.
    BackgroundImage { size: Size },
    Rect { x: f64, y: f64, width: f64, height: f64, style: Style },
    Line { from: Point, to: Point, style: Style },
    Circle { center: Point, radius: f64, style: Style },
    /// Pie slice from `start` to `end` radians, closed through the center.
    Wedge { center: Point, radius: f64, start: f64, end: f64, style: Style },
    /// Rectangle in a frame translated to `origin` and rotated by `angle` radians.
    RotatedRect { origin: Point, angle: f64, x: f64, y: f64, width: f64, height: f64, style: Style },
    /// Bold text centered on `at`.
    Text { text: String, at: Point, font_px: f64, color: String },
    Label(Label),
    /// Composite the fog mask over `(0, 0, canvas)`.
    Fog { opacity: f64 },
}

/// The ops for one frame, back to front.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayList {
    pub ops: Vec<DrawOp>,
}

impl DisplayList {
    fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }
}

/// Build the display list for the scene at time `now_ms`.
#[must_use]
pub fn render(scene: &Scene, now_ms: f64, for_player: bool) -> DisplayList {
    let space = scene.space();
    let zoom = scene.camera.zoom;
    let g = space.effective_grid_size();
    let mut list = DisplayList::default();

    list.push(DrawOp::Begin { canvas: scene.canvas, pan: scene.camera.pan_px(scene.canvas), zoom });

    // Layer 1: background.
    if scene.background.is_some() {
        list.push(DrawOp::BackgroundImage { size: scene.canvas });
    } else {
        list.push(DrawOp::Rect {
            x: 0.0,
            y: 0.0,
            width: scene.canvas.width,
            height: scene.canvas.height,
            style: Style::filled(EMPTY_BACKGROUND),
        });
    }

    // Layer 2: grid.
    if scene.show_grid {
        draw_grid(&mut list, scene.canvas, g, zoom);
    }

    // Layer 3: area effects, pending preview last.
    for shape in scene.aoe_shapes.iter().chain(scene.pending_shape.as_ref()) {
        draw_area_effect(&mut list, shape, g, zoom);
    }

    // Layer 4: drop preview.
    if let Some(cell) = scene.drop_preview {
        let center = space.cell_to_world_center(cell, 1.0);
        list.push(DrawOp::Circle {
            center,
            radius: (g / 2.0 - 4.0).max(1.0),
            style: Style::filled(DROP_FILL).with_stroke(DROP_STROKE, 2.0 / zoom),
        });
    }

    // Layer 5: tokens.
    let active_turn = scene.active_turn_token().map(|t| t.id.as_str());
    for token in &scene.tokens {
        let marks = TokenMarks {
            selected: scene.selected_token_id.as_deref() == Some(token.id.as_str()),
            active_turn: active_turn == Some(token.id.as_str()),
            glow: scene.token_glows.get(&token.id).map(|glow| (glow.color.as_str(), now_ms - glow.started_ms)),
        };
        draw_token(&mut list, scene, token, &marks, zoom);
    }

    // Layer 6: roll popups.
    for popup in &scene.roll_popups {
        draw_roll_popup(&mut list, popup, g, zoom, now_ms);
    }

    // Layer 7: ruler.
    if let Some(m) = scene.measurement {
        let from = space.cell_center(m.start);
        let to = space.cell_center(m.end);
        list.push(DrawOp::Line {
            from,
            to,
            style: Style::stroked(RULER, 3.0 / zoom).with_dash(vec![10.0 / zoom, 5.0 / zoom]),
        });
        if m.distance > 0 {
            list.push(DrawOp::Label(Label {
                text: format!("{} ft.", m.distance),
                center: Point::new(f64::midpoint(from.x, to.x), f64::midpoint(from.y, to.y)),
                font_px: 16.0 / zoom,
                padding: 6.0 / zoom,
                height: 22.0 / zoom,
                corner_radius: 4.0 / zoom,
                background: PILL_FILL.to_owned(),
                border: RULER.to_owned(),
                border_width: 2.0 / zoom,
                text_color: "#fff".to_owned(),
                alpha: 1.0,
            }));
        }
        for end in [from, to] {
            list.push(DrawOp::Circle { center: end, radius: 4.0 / zoom, style: Style::filled(RULER) });
        }
    }

    // Layer 8: fog.
    if scene.fog_enabled {
        let opacity = if for_player { FOG_OPACITY_PLAYER } else { FOG_OPACITY_DM };
        list.push(DrawOp::Fog { opacity });
    }

    list
}

fn draw_grid(list: &mut DisplayList, canvas: Size, g: f64, zoom: f64) {
    if canvas.width / g > MAX_GRID_LINES || canvas.height / g > MAX_GRID_LINES {
        return;
    }
    let style = Style::stroked(GRID_STROKE, 1.0 / zoom);
    let mut x = 0.0;
    while x <= canvas.width {
        list.push(DrawOp::Line { from: Point::new(x, 0.0), to: Point::new(x, canvas.height), style: style.clone() });
        x += g;
    }
    let mut y = 0.0;
    while y <= canvas.height {
        list.push(DrawOp::Line { from: Point::new(0.0, y), to: Point::new(canvas.width, y), style: style.clone() });
        y += g;
    }
}

fn draw_area_effect(list: &mut DisplayList, shape: &AreaEffectShape, g: f64, zoom: f64) {
    let center = Point::new((f64::from(shape.x) + 0.5) * g, (f64::from(shape.y) + 0.5) * g);
    let size_px = shape.size * g / 5.0;
    let style = Style::filled(shape.color.clone()).with_stroke(opaque_stroke(&shape.color), 2.0 / zoom);
    let angle = shape.rotation.to_radians();

    let op = match shape.kind {
        ShapeKind::Circle => DrawOp::Circle { center, radius: size_px / 2.0, style },
        ShapeKind::Cube => DrawOp::Rect {
            x: center.x - size_px / 2.0,
            y: center.y - size_px / 2.0,
            width: size_px,
            height: size_px,
            style,
        },
        ShapeKind::Cone => DrawOp::Wedge {
            center,
            radius: size_px,
            start: angle - CONE_SPREAD / 2.0,
            end: angle + CONE_SPREAD / 2.0,
            style,
        },
        ShapeKind::Line => DrawOp::RotatedRect {
            origin: center,
            angle,
            x: 0.0,
            y: -g / 2.0,
            width: size_px,
            height: g,
            style,
        },
    };
    list.push(op);
}

/// Stroke color for a shape: `rgba(...)` colors lose their transparency,
/// anything else strokes with the fill color.
fn opaque_stroke(color: &str) -> String {
    let trimmed = color.trim();
    if let Some(body) = trimmed.strip_prefix("rgba(").and_then(|rest| rest.strip_suffix(')')) {
        if let Some((rgb, _alpha)) = body.rsplit_once(',') {
            return format!("rgba({rgb}, 1)");
        }
    }
    color.to_owned()
}

struct TokenMarks<'a> {
    selected: bool,
    active_turn: bool,
    /// Glow color and age in milliseconds.
    glow: Option<(&'a str, f64)>,
}

fn draw_token(list: &mut DisplayList, scene: &Scene, token: &Token, marks: &TokenMarks<'_>, zoom: f64) {
    let center = scene.token_center(token);
    let radius = scene.token_radius(token);

    if let Some((color, age)) = marks.glow {
        let progress = (age / GLOW_MS).max(0.0);
        if progress < 1.0 {
            list.push(DrawOp::Circle {
                center,
                radius: radius + (20.0 / zoom) * (1.0 - progress),
                style: Style::filled(color).with_alpha(0.6 * (1.0 - progress)),
            });
        }
    }

    if marks.active_turn {
        list.push(DrawOp::Circle {
            center,
            radius: radius + (radius * 0.45).max(6.0),
            style: Style::stroked(ACTIVE_TURN_RING, 3.0 / zoom).with_dash(vec![6.0 / zoom, 4.0 / zoom]),
        });
    }

    if marks.selected {
        list.push(DrawOp::Circle {
            center,
            radius: radius + (radius * 0.3).max(4.0),
            style: Style::stroked(SELECTION_RING, 3.0 / zoom),
        });
    }

    list.push(DrawOp::Circle {
        center,
        radius,
        style: Style::filled(token.color.clone()).with_stroke(TOKEN_BORDER, 2.0 / zoom),
    });
    list.push(DrawOp::Text {
        text: abbreviation(&token.name),
        at: center,
        font_px: (radius * 0.8).max(8.0),
        color: "#fff".to_owned(),
    });

    if let Some(fraction) = token.hp_fraction() {
        draw_hp_bar(list, center, radius, fraction, zoom);
    }
}

fn draw_hp_bar(list: &mut DisplayList, center: Point, radius: f64, fraction: f64, zoom: f64) {
    let width = radius * 2.0;
    let height = 6.0 / zoom;
    let x = center.x - radius;
    let y = center.y + radius + 4.0 / zoom;
    let fraction = fraction.max(0.0);
    let color = if fraction > 0.5 {
        "#4a4"
    } else if fraction > 0.25 {
        "#aa4"
    } else {
        "#a44"
    };

    list.push(DrawOp::Rect { x, y, width, height, style: Style::filled(HP_TRACK) });
    list.push(DrawOp::Rect { x, y, width: width * fraction, height, style: Style::filled(color) });
    list.push(DrawOp::Rect { x, y, width, height, style: Style::stroked("#fff", 1.0 / zoom) });
}

fn draw_roll_popup(list: &mut DisplayList, popup: &RollPopup, g: f64, zoom: f64, now_ms: f64) {
    let progress = ((now_ms - popup.started_ms) / ROLL_POPUP_MS).max(0.0);
    if progress >= 1.0 {
        return;
    }
    let rise = -30.0 - progress * 40.0;
    let color = popup.kind.color();
    list.push(DrawOp::Label(Label {
        text: popup.text.clone(),
        center: Point::new((f64::from(popup.cell.col) + 0.5) * g, (f64::from(popup.cell.row) + 0.5) * g + rise),
        font_px: 18.0 / zoom,
        padding: 8.0 / zoom,
        height: 24.0 / zoom,
        corner_radius: 4.0 / zoom,
        background: PILL_FILL.to_owned(),
        border: color.to_owned(),
        border_width: 2.0 / zoom,
        text_color: color.to_owned(),
        alpha: 1.0 - progress,
    }));
}

/// First three characters of a name, uppercased.
#[must_use]
pub fn abbreviation(name: &str) -> String {
    name.chars().take(3).collect::<String>().to_uppercase()
}
