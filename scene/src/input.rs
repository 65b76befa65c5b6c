//! Input model: tools, modifier keys, mouse buttons, pointer intents and the
//! gesture state machine.
//!
//! `Tool` is the mutually exclusive interaction mode. `Intent` is a host
//! event translated into engine terms. `Gesture` is the press being tracked
//! between pointer-down and pointer-up.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::doc::ShapeKind;
use crate::fog::FogMode;

/// Which tool is currently active. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "tool", content = "mode", rename_all = "camelCase")]
pub enum Tool {
    /// Select and move tokens (default).
    #[default]
    Select,
    /// Measure walking distance.
    Ruler,
    /// Place an area-effect template of the given shape.
    AreaEffect(ShapeKind),
    /// Paint the fog mask.
    FogPaint(FogMode),
}

impl Tool {
    /// Whether clicks reach token selection and movement.
    #[must_use]
    pub fn selects_tokens(self) -> bool {
        matches!(self, Self::Select)
    }

    #[must_use]
    pub fn area_effect(self) -> Option<ShapeKind> {
        match self {
            Self::AreaEffect(kind) => Some(kind),
            _ => None,
        }
    }

    #[must_use]
    pub fn fog_mode(self) -> Option<FogMode> {
        match self {
            Self::FogPaint(mode) => Some(mode),
            _ => None,
        }
    }
}

/// Keyboard modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    #[must_use]
    pub fn ctrl() -> Self {
        Self { ctrl: true, ..Self::default() }
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A pointer or drag event in canvas pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    PointerDown { screen: Point, button: Button, modifiers: Modifiers },
    PointerMove { screen: Point },
    PointerUp { screen: Point, button: Button },
    /// Pointer left the canvas; ends any gesture without a click.
    PointerLeave,
    /// Wheel notch; positive `dy` scrolls down.
    Wheel { screen: Point, dy: f64 },
    /// A roster entry is being dragged over the canvas.
    DragOver { screen: Point },
    DragLeave,
}

/// The press currently being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    /// No button held.
    #[default]
    Idle,
    /// Dragging the view. `moved` suppresses the click on release.
    Panning { last: Point, moved: bool },
    /// Ruler drag in progress.
    Measuring,
    /// Fog brush stroke in progress.
    PaintingFog(FogMode),
    /// Primary button held with no drag behavior; a release here is a click.
    Pressed,
}

impl Gesture {
    #[must_use]
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}
