#![allow(clippy::float_cmp)]

use super::*;
use crate::camera::Size;
use crate::fog::FogMode;

// =============================================================
// Helpers
// =============================================================

/// 500×500 canvas, 50 px grid, identity camera: cell (c, r) is centered at
/// screen (50c + 25, 50r + 25).
fn setup() -> (Scene, ToolController) {
    let mut scene = Scene::new();
    scene.layout(Size::new(500.0, 500.0));
    (scene, ToolController::new())
}

fn at(col: i32, row: i32) -> Point {
    Point::new(f64::from(col) * 50.0 + 25.0, f64::from(row) * 50.0 + 25.0)
}

fn down(screen: Point) -> Intent {
    Intent::PointerDown { screen, button: Button::Primary, modifiers: Modifiers::default() }
}

fn up(screen: Point) -> Intent {
    Intent::PointerUp { screen, button: Button::Primary }
}

fn click(tools: &mut ToolController, scene: &mut Scene, screen: Point) -> Outcome {
    tools.handle(scene, &down(screen));
    tools.handle(scene, &up(screen))
}

// =============================================================
// Tool exclusivity
// =============================================================

#[test]
fn selecting_a_tool_replaces_the_previous_one() {
    let (mut scene, mut tools) = setup();
    tools.set_tool(&mut scene, Tool::Ruler);
    assert_eq!(tools.tool, Tool::Ruler);
    tools.set_tool(&mut scene, Tool::FogPaint(FogMode::Reveal));
    assert_eq!(tools.tool, Tool::FogPaint(FogMode::Reveal));
    tools.set_tool(&mut scene, Tool::AreaEffect(ShapeKind::Circle));
    assert_eq!(tools.tool, Tool::AreaEffect(ShapeKind::Circle));
}

#[test]
fn selecting_the_active_tool_toggles_back_to_select() {
    let (mut scene, mut tools) = setup();
    tools.set_tool(&mut scene, Tool::FogPaint(FogMode::Hide));
    tools.set_tool(&mut scene, Tool::FogPaint(FogMode::Hide));
    assert_eq!(tools.tool, Tool::Select);
    tools.set_tool(&mut scene, Tool::Select);
    assert_eq!(tools.tool, Tool::Select);
}

#[test]
fn switching_tools_clears_measurement_and_pending_shape() {
    let (mut scene, mut tools) = setup();
    tools.set_tool(&mut scene, Tool::AreaEffect(ShapeKind::Line));
    click(&mut tools, &mut scene, at(2, 2));
    assert!(scene.pending_shape.is_some());

    tools.set_tool(&mut scene, Tool::Ruler);
    assert!(scene.pending_shape.is_none());

    tools.handle(&mut scene, &down(at(0, 0)));
    assert!(scene.measurement.is_some());
    let change = tools.set_tool(&mut scene, Tool::Select);
    assert!(scene.measurement.is_none());
    assert!(change.sync);
    assert!(tools.gesture.is_idle());
}

// =============================================================
// Area effects
// =============================================================

#[test]
fn cone_is_placed_aimed_and_committed() {
    let (mut scene, mut tools) = setup();
    tools.settings.aoe_size_ft = 30.0;
    tools.set_tool(&mut scene, Tool::AreaEffect(ShapeKind::Cone));

    let first = click(&mut tools, &mut scene, at(5, 5));
    assert!(!first.change.persist);
    assert!(scene.aoe_shapes.is_empty());
    assert!(scene.pending_shape.is_some());

    tools.handle(&mut scene, &Intent::PointerMove { screen: at(8, 5) });
    let second = click(&mut tools, &mut scene, at(8, 5));
    assert!(second.change.persist);

    assert_eq!(scene.aoe_shapes.len(), 1);
    let cone = &scene.aoe_shapes[0];
    assert_eq!(cone.kind, ShapeKind::Cone);
    assert_eq!(cone.origin(), GridCell::new(5, 5));
    assert_eq!(cone.size, 30.0);
    assert_eq!(cone.rotation, 0.0);
    assert!(scene.pending_shape.is_none());
}

#[test]
fn hovering_rotates_the_pending_line() {
    let (mut scene, mut tools) = setup();
    tools.set_tool(&mut scene, Tool::AreaEffect(ShapeKind::Line));
    click(&mut tools, &mut scene, at(4, 4));
    tools.handle(&mut scene, &Intent::PointerMove { screen: at(4, 1) });
    let rotation = scene.pending_shape.as_ref().map_or(f64::NAN, |s| s.rotation);
    assert!((rotation + 90.0).abs() < 1e-9);
}

#[test]
fn circle_uses_translucent_fill() {
    let (mut scene, mut tools) = setup();
    tools.settings.aoe_color = "#112233".into();
    tools.set_tool(&mut scene, Tool::AreaEffect(ShapeKind::Circle));
    let outcome = click(&mut tools, &mut scene, at(1, 1));
    assert_eq!(outcome.change, Change::EDIT);
    assert_eq!(scene.aoe_shapes[0].color, "#11223366");
    assert_eq!(scene.aoe_shapes[0].size, DEFAULT_AOE_SIZE_FT);
}

#[test]
fn area_effect_click_does_not_touch_tokens() {
    let (mut scene, mut tools) = setup();
    scene.add_token("A", "#fff", 1.0, None, None);
    tools.set_tool(&mut scene, Tool::AreaEffect(ShapeKind::Cube));
    let outcome = click(&mut tools, &mut scene, at(0, 0));
    assert!(outcome.token_selected.is_none());
    assert!(scene.selected_token_id.is_none());
}

// =============================================================
// Ruler
// =============================================================

#[test]
fn ruler_drag_measures_and_release_clears() {
    let (mut scene, mut tools) = setup();
    tools.set_tool(&mut scene, Tool::Ruler);
    tools.handle(&mut scene, &down(at(1, 1)));
    let moved = tools.handle(&mut scene, &Intent::PointerMove { screen: at(5, 3) });
    assert_eq!(moved.change, Change::VISIBLE);
    assert_eq!(scene.measurement.map(|m| m.distance), Some(25));

    let released = tools.handle(&mut scene, &up(at(5, 3)));
    assert!(released.change.sync);
    assert!(scene.measurement.is_none());
}

#[test]
fn ruler_click_never_selects() {
    let (mut scene, mut tools) = setup();
    scene.add_token("A", "#fff", 1.0, None, None);
    tools.set_tool(&mut scene, Tool::Ruler);
    let outcome = click(&mut tools, &mut scene, at(0, 0));
    assert!(outcome.token_selected.is_none());
    assert!(scene.selected_token_id.is_none());
}

// =============================================================
// Select tool
// =============================================================

#[test]
fn click_selects_then_moves_token() {
    let (mut scene, mut tools) = setup();
    let (token, _) = scene.add_token("A", "#fff", 1.0, None, None);

    let first = click(&mut tools, &mut scene, at(0, 0));
    assert_eq!(first.token_selected.as_deref(), Some(token.id.as_str()));
    assert_eq!(scene.selected_token_id.as_deref(), Some(token.id.as_str()));
    assert!(!first.change.persist);

    let second = click(&mut tools, &mut scene, at(3, 4));
    assert!(second.token_selected.is_none());
    assert!(second.change.persist);
    assert_eq!(scene.tokens[0].cell(), GridCell::new(3, 4));
    assert!(scene.selected_token_id.is_none());
}

#[test]
fn clicking_another_token_switches_selection() {
    let (mut scene, mut tools) = setup();
    let (a, _) = scene.add_token("A", "#fff", 1.0, None, None);
    let (b, _) = scene.add_token("B", "#fff", 1.0, None, Some("combatant-b".into()));
    click(&mut tools, &mut scene, at(0, 0));
    assert_eq!(scene.selected_token_id.as_deref(), Some(a.id.as_str()));

    let outcome = click(&mut tools, &mut scene, at(1, 0));
    assert_eq!(scene.selected_token_id.as_deref(), Some(b.id.as_str()));
    assert_eq!(outcome.token_selected.as_deref(), Some("combatant-b"));
    assert_eq!(scene.tokens[0].cell(), GridCell::new(0, 0));
}

#[test]
fn clicking_empty_space_without_selection_is_harmless() {
    let (mut scene, mut tools) = setup();
    let outcome = click(&mut tools, &mut scene, at(6, 6));
    assert!(outcome.token_selected.is_none());
    assert!(!outcome.change.persist);
}

#[test]
fn secondary_press_deletes_under_pointer() {
    let (mut scene, mut tools) = setup();
    scene.add_token("A", "#fff", 1.0, None, None);
    let intent = Intent::PointerDown { screen: at(0, 0), button: Button::Secondary, modifiers: Modifiers::default() };
    let outcome = tools.handle(&mut scene, &intent);
    assert_eq!(outcome.change, Change::EDIT);
    assert!(scene.tokens.is_empty());
}

// =============================================================
// Pan and zoom
// =============================================================

#[test]
fn middle_drag_pans_without_clicking() {
    let (mut scene, mut tools) = setup();
    scene.add_token("A", "#fff", 1.0, None, None);
    let press = Intent::PointerDown { screen: at(0, 0), button: Button::Middle, modifiers: Modifiers::default() };
    tools.handle(&mut scene, &press);
    tools.handle(&mut scene, &Intent::PointerMove { screen: Point::new(75.0, 25.0) });
    assert_eq!(scene.camera.pan_x, 0.1);
    let outcome = tools.handle(&mut scene, &Intent::PointerUp { screen: Point::new(75.0, 25.0), button: Button::Middle });
    assert!(outcome.change.is_none());
    assert!(scene.selected_token_id.is_none());
}

#[test]
fn ctrl_drag_pans_and_suppresses_click() {
    let (mut scene, mut tools) = setup();
    scene.add_token("A", "#fff", 1.0, None, None);
    let press = Intent::PointerDown { screen: at(0, 0), button: Button::Primary, modifiers: Modifiers::ctrl() };
    tools.handle(&mut scene, &press);
    tools.handle(&mut scene, &Intent::PointerMove { screen: Point::new(25.0, 75.0) });
    assert_eq!(scene.camera.pan_y, 0.1);
    let outcome = tools.handle(&mut scene, &up(Point::new(25.0, 75.0)));
    assert!(outcome.token_selected.is_none());
}

#[test]
fn ctrl_click_without_drag_still_clicks() {
    let (mut scene, mut tools) = setup();
    scene.add_token("A", "#fff", 1.0, None, None);
    let press = Intent::PointerDown { screen: at(0, 0), button: Button::Primary, modifiers: Modifiers::ctrl() };
    tools.handle(&mut scene, &press);
    let outcome = tools.handle(&mut scene, &up(at(0, 0)));
    assert!(outcome.token_selected.is_some());
}

#[test]
fn wheel_zooms_toward_cursor() {
    let (mut scene, mut tools) = setup();
    let cursor = Point::new(100.0, 200.0);
    let world = scene.space().screen_to_world(cursor);
    tools.handle(&mut scene, &Intent::Wheel { screen: cursor, dy: -120.0 });
    assert!((scene.camera.zoom - 1.1).abs() < 1e-9);
    let back = scene.space().world_to_screen(world);
    assert!((back.x - cursor.x).abs() < 1e-9);
    assert!((back.y - cursor.y).abs() < 1e-9);
}

// =============================================================
// Fog
// =============================================================

#[test]
fn fog_brush_is_inert_while_fog_disabled() {
    let (mut scene, mut tools) = setup();
    tools.set_tool(&mut scene, Tool::FogPaint(FogMode::Reveal));
    tools.handle(&mut scene, &down(at(2, 2)));
    assert!(!scene.fog.has_reveals());
    assert!(tools.handle(&mut scene, &up(at(2, 2))).change.is_none());
}

#[test]
fn fog_stroke_paints_and_persists_on_release() {
    let (mut scene, mut tools) = setup();
    scene.set_fog_enabled(true);
    tools.set_tool(&mut scene, Tool::FogPaint(FogMode::Reveal));

    let pressed = tools.handle(&mut scene, &down(at(2, 2)));
    assert_eq!(pressed.change, Change::RENDER);
    tools.handle(&mut scene, &Intent::PointerMove { screen: at(4, 2) });
    assert_eq!(scene.fog.alpha_at(225, 125), 0);

    let released = tools.handle(&mut scene, &up(at(4, 2)));
    assert_eq!(released.change, Change::EDIT);
}

#[test]
fn leaving_the_canvas_ends_the_stroke() {
    let (mut scene, mut tools) = setup();
    scene.set_fog_enabled(true);
    tools.set_tool(&mut scene, Tool::FogPaint(FogMode::Hide));
    tools.handle(&mut scene, &down(at(2, 2)));
    let left = tools.handle(&mut scene, &Intent::PointerLeave);
    assert_eq!(left.change, Change::EDIT);
    assert!(tools.gesture.is_idle());
}

// =============================================================
// Drag and drop
// =============================================================

#[test]
fn drag_over_tracks_preview_cell() {
    let (mut scene, mut tools) = setup();
    tools.handle(&mut scene, &Intent::DragOver { screen: at(3, 7) });
    assert_eq!(scene.drop_preview, Some(GridCell::new(3, 7)));
    let same = tools.handle(&mut scene, &Intent::DragOver { screen: at(3, 7) });
    assert!(same.change.is_none());
    tools.handle(&mut scene, &Intent::DragLeave);
    assert!(scene.drop_preview.is_none());
}
