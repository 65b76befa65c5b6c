//! Tool controller: turns pointer intents into scene mutations according to
//! the active tool.
//!
//! Panning (middle drag, or ctrl + primary drag) works under every tool and
//! a secondary press always deletes whatever sits under the pointer. Any
//! other press is routed by the tool:
//!
//! | Tool | Primary drag | Primary click |
//! |------|--------------|---------------|
//! | `Select` | nothing | select / move / reselect tokens |
//! | `Ruler` | live measurement | nothing |
//! | `AreaEffect` | nothing | place, or commit the pending cone/line |
//! | `FogPaint` | brush stroke | nothing |
//!
//! A click is a primary release that was not preceded by a drag-pan.

#[cfg(test)]
#[path = "tools_test.rs"]
mod tools_test;

use crate::camera::{GridCell, Point};
use crate::consts::{AOE_ALPHA_SUFFIX, DEFAULT_AOE_COLOR, DEFAULT_AOE_SIZE_FT, DEFAULT_FOG_BRUSH_CELLS};
use crate::doc::ShapeKind;
use crate::input::{Button, Gesture, Intent, Modifiers, Tool};
use crate::scene::{Change, Scene};

/// User-tunable parameters of the placement and fog tools.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    /// Size of newly placed area effects, in feet.
    pub aoe_size_ft: f64,
    /// Base `#rrggbb` color of newly placed area effects.
    pub aoe_color: String,
    /// Fog brush diameter in grid cells.
    pub fog_brush_cells: f64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            aoe_size_ft: DEFAULT_AOE_SIZE_FT,
            aoe_color: DEFAULT_AOE_COLOR.to_owned(),
            fog_brush_cells: DEFAULT_FOG_BRUSH_CELLS,
        }
    }
}

impl ToolSettings {
    /// Translucent fill stored on placed shapes.
    #[must_use]
    pub fn aoe_fill(&self) -> String {
        format!("{}{AOE_ALPHA_SUFFIX}", self.aoe_color)
    }
}

/// Result of feeding one intent to the controller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outcome {
    pub change: Change,
    /// Token clicked without being moved: its combatant id, or its id.
    pub token_selected: Option<String>,
}

impl From<Change> for Outcome {
    fn from(change: Change) -> Self {
        Self { change, token_selected: None }
    }
}

/// Active tool, tool settings and the in-flight gesture.
#[derive(Debug, Clone, Default)]
pub struct ToolController {
    pub tool: Tool,
    pub gesture: Gesture,
    pub settings: ToolSettings,
}

impl ToolController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch tools. Choosing the active tool again returns to `Select`.
    /// Any measurement, pending cone/line or fog stroke is abandoned.
    pub fn set_tool(&mut self, scene: &mut Scene, tool: Tool) -> Change {
        let next = if tool == self.tool { Tool::Select } else { tool };
        let mut change = self.cancel_gesture(scene);
        change |= scene.end_measurement();
        change |= scene.discard_pending();
        self.tool = next;
        change | Change::RENDER
    }

    /// Feed one intent.
    pub fn handle(&mut self, scene: &mut Scene, intent: &Intent) -> Outcome {
        match *intent {
            Intent::PointerDown { screen, button, modifiers } => self.pointer_down(scene, screen, button, modifiers).into(),
            Intent::PointerMove { screen } => self.pointer_move(scene, screen).into(),
            Intent::PointerUp { screen, button } => self.pointer_up(scene, screen, button),
            Intent::PointerLeave => self.cancel_gesture(scene).into(),
            Intent::Wheel { screen, dy } => scene.zoom_step(dy, screen).into(),
            Intent::DragOver { screen } => {
                let cell = scene.space().screen_to_cell(screen);
                scene.set_drop_preview(Some(cell)).into()
            }
            Intent::DragLeave => scene.set_drop_preview(None).into(),
        }
    }

    fn pointer_down(&mut self, scene: &mut Scene, screen: Point, button: Button, modifiers: Modifiers) -> Change {
        match button {
            Button::Middle => self.begin_pan(screen),
            Button::Primary if modifiers.ctrl => self.begin_pan(screen),
            Button::Secondary => scene.remove_at(scene.space().screen_to_cell(screen)),
            Button::Primary => match self.tool {
                Tool::Ruler => {
                    self.gesture = Gesture::Measuring;
                    scene.begin_measurement(scene.space().screen_to_cell(screen))
                }
                Tool::FogPaint(mode) if scene.fog_enabled => {
                    self.gesture = Gesture::PaintingFog(mode);
                    let world = scene.space().screen_to_world(screen);
                    scene.fog_dab(world, mode, self.settings.fog_brush_cells)
                }
                _ => {
                    self.gesture = Gesture::Pressed;
                    Change::NONE
                }
            },
        }
    }

    fn begin_pan(&mut self, screen: Point) -> Change {
        self.gesture = Gesture::Panning { last: screen, moved: false };
        Change::NONE
    }

    fn pointer_move(&mut self, scene: &mut Scene, screen: Point) -> Change {
        match self.gesture {
            Gesture::Panning { last, moved } => {
                let (dx, dy) = (screen.x - last.x, screen.y - last.y);
                self.gesture = Gesture::Panning { last: screen, moved: moved || dx != 0.0 || dy != 0.0 };
                scene.pan_by(dx, dy)
            }
            Gesture::Measuring => scene.update_measurement(scene.space().screen_to_cell(screen)),
            Gesture::PaintingFog(mode) => {
                let world = scene.space().screen_to_world(screen);
                scene.fog_dab(world, mode, self.settings.fog_brush_cells)
            }
            Gesture::Idle | Gesture::Pressed => scene.aim_pending(scene.space().screen_to_cell(screen)),
        }
    }

    fn pointer_up(&mut self, scene: &mut Scene, screen: Point, button: Button) -> Outcome {
        let gesture = std::mem::take(&mut self.gesture);
        match gesture {
            Gesture::Panning { moved: false, .. } if button == Button::Primary => self.click(scene, screen),
            Gesture::Panning { .. } | Gesture::Idle => Outcome::default(),
            Gesture::Measuring => scene.end_measurement().into(),
            Gesture::PaintingFog(_) => scene.end_fog_stroke().into(),
            Gesture::Pressed if button == Button::Primary => self.click(scene, screen),
            Gesture::Pressed => Outcome::default(),
        }
    }

    /// End the current gesture without a click.
    fn cancel_gesture(&mut self, scene: &mut Scene) -> Change {
        match std::mem::take(&mut self.gesture) {
            Gesture::PaintingFog(_) => scene.end_fog_stroke(),
            Gesture::Measuring => scene.end_measurement(),
            Gesture::Idle | Gesture::Pressed | Gesture::Panning { .. } => Change::NONE,
        }
    }

    fn click(&mut self, scene: &mut Scene, screen: Point) -> Outcome {
        let cell = scene.space().screen_to_cell(screen);
        match self.tool {
            Tool::Ruler | Tool::FogPaint(_) => Outcome::default(),
            Tool::AreaEffect(kind) => self.place(scene, kind, cell).into(),
            Tool::Select => select_click(scene, cell),
        }
    }

    fn place(&self, scene: &mut Scene, kind: ShapeKind, cell: GridCell) -> Change {
        if scene.pending_shape.is_some() {
            return scene.aim_pending(cell) | scene.commit_pending();
        }
        scene.place_area_effect(kind, cell, self.settings.aoe_size_ft, &self.settings.aoe_fill())
    }
}

/// Select-tool click. With a token selected, clicking empty space or the
/// selected token moves it there and deselects; clicking another token
/// switches the selection. Without a selection, clicking a token selects it.
fn select_click(scene: &mut Scene, cell: GridCell) -> Outcome {
    let clicked = scene.token_at(cell).map(|t| (t.id.clone(), t.combatant_id.clone()));
    let selected = scene.selected_token().map(|t| t.id.clone());

    let mut change = Change::VISIBLE;
    let mut moved = false;
    match (&selected, &clicked) {
        (Some(sel), None) => {
            change |= scene.move_token(sel, cell);
            scene.select_token(None);
            moved = true;
        }
        (Some(sel), Some((hit, _))) if hit == sel => {
            change |= scene.move_token(sel, cell);
            scene.select_token(None);
            moved = true;
        }
        (_, Some((hit, _))) => {
            scene.select_token(Some(hit));
        }
        (None, None) => {}
    }

    let token_selected = match clicked {
        Some((id, combatant)) if !moved => Some(combatant.unwrap_or(id)),
        _ => None,
    };
    Outcome { change, token_selected }
}
