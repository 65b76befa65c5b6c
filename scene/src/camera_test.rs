#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

fn canvas() -> Size {
    Size::new(800.0, 600.0)
}

fn space(camera: Camera, background_width: Option<f64>) -> CoordinateSpace {
    CoordinateSpace::new(camera, canvas(), background_width, 50.0)
}

// =============================================================
// Camera transforms
// =============================================================

#[test]
fn camera_default_is_identity() {
    let cam = Camera::default();
    let p = Point::new(123.0, 45.0);
    assert!(point_approx_eq(cam.screen_to_world(p, canvas()), p));
    assert!(point_approx_eq(cam.world_to_screen(p, canvas()), p));
}

#[test]
fn pan_is_normalized_to_canvas_size() {
    let cam = Camera { zoom: 1.0, pan_x: 0.25, pan_y: 0.5 };
    let pan = cam.pan_px(canvas());
    assert_eq!(pan, Point::new(200.0, 300.0));
}

#[test]
fn screen_to_world_subtracts_pan_then_divides_zoom() {
    let cam = Camera { zoom: 2.0, pan_x: 0.125, pan_y: 0.0 };
    let world = cam.screen_to_world(Point::new(300.0, 100.0), canvas());
    assert!(point_approx_eq(world, Point::new(100.0, 50.0)));
}

#[test]
fn screen_world_round_trip() {
    let cam = Camera { zoom: 1.7, pan_x: -0.3, pan_y: 0.45 };
    let p = Point::new(317.0, -42.5);
    let back = cam.screen_to_world(cam.world_to_screen(p, canvas()), canvas());
    assert!(point_approx_eq(back, p));
}

// =============================================================
// Zoom toward cursor
// =============================================================

#[test]
fn zoom_around_keeps_anchor_world_point_fixed() {
    let anchors = [Point::new(0.0, 0.0), Point::new(400.0, 300.0), Point::new(731.0, 12.0)];
    let zooms = [0.2, 0.5, 1.3, 2.0, 5.0];
    for anchor in anchors {
        for zoom in zooms {
            let mut cam = Camera { zoom: 1.1, pan_x: 0.07, pan_y: -0.2 };
            let before = cam.screen_to_world(anchor, canvas());
            cam.zoom_around(zoom, anchor, canvas());
            let after = cam.screen_to_world(anchor, canvas());
            assert!(point_approx_eq(before, after), "anchor {anchor:?} zoom {zoom}");
            assert!(point_approx_eq(cam.world_to_screen(before, canvas()), anchor));
        }
    }
}

#[test]
fn zoom_around_clamps_low() {
    let mut cam = Camera::default();
    cam.zoom_around(0.01, Point::new(10.0, 10.0), canvas());
    assert_eq!(cam.zoom, 0.2);
}

#[test]
fn zoom_around_clamps_high() {
    let mut cam = Camera::default();
    cam.zoom_around(50.0, Point::new(10.0, 10.0), canvas());
    assert_eq!(cam.zoom, 5.0);
}

#[test]
fn zoom_around_clamped_still_keeps_anchor() {
    let mut cam = Camera::default();
    let anchor = Point::new(250.0, 175.0);
    let before = cam.screen_to_world(anchor, canvas());
    cam.zoom_around(100.0, anchor, canvas());
    assert!(point_approx_eq(cam.screen_to_world(anchor, canvas()), before));
}

#[test]
fn zoom_around_nan_falls_back_to_one() {
    let mut cam = Camera { zoom: 2.0, pan_x: 0.0, pan_y: 0.0 };
    cam.zoom_around(f64::NAN, Point::new(10.0, 10.0), canvas());
    assert_eq!(cam.zoom, 1.0);
}

#[test]
fn zoom_around_zero_canvas_only_sets_zoom() {
    let mut cam = Camera { zoom: 1.0, pan_x: 0.1, pan_y: 0.2 };
    cam.zoom_around(2.0, Point::new(10.0, 10.0), Size::default());
    assert_eq!(cam.zoom, 2.0);
    assert_eq!(cam.pan_x, 0.1);
    assert_eq!(cam.pan_y, 0.2);
}

// =============================================================
// Pan
// =============================================================

#[test]
fn pan_by_accumulates_normalized_delta() {
    let mut cam = Camera::default();
    cam.pan_by(80.0, 60.0, canvas());
    cam.pan_by(80.0, -120.0, canvas());
    assert!(approx_eq(cam.pan_x, 0.2));
    assert!(approx_eq(cam.pan_y, -0.1));
}

#[test]
fn pan_by_ignores_nan() {
    let mut cam = Camera::default();
    cam.pan_by(f64::NAN, 10.0, canvas());
    assert_eq!(cam, Camera::default());
}

#[test]
fn center_on_places_world_point_mid_canvas() {
    let mut cam = Camera { zoom: 2.0, pan_x: 0.0, pan_y: 0.0 };
    let target = Point::new(75.0, 125.0);
    cam.center_on(target, canvas());
    assert!(point_approx_eq(cam.world_to_screen(target, canvas()), Point::new(400.0, 300.0)));
}

#[test]
fn sanitized_repairs_bad_values() {
    let cam = Camera::sanitized(0.0, f64::INFINITY, f64::NAN);
    assert_eq!(cam.zoom, 0.2);
    assert_eq!(cam.pan_x, 0.0);
    assert_eq!(cam.pan_y, 0.0);
}

#[test]
fn reset_restores_defaults() {
    let mut cam = Camera { zoom: 3.0, pan_x: 0.4, pan_y: -0.4 };
    cam.reset();
    assert_eq!(cam, Camera::default());
}

// =============================================================
// Grid scale
// =============================================================

#[test]
fn effective_grid_without_background_is_raw() {
    assert_eq!(space(Camera::default(), None).effective_grid_size(), 50.0);
}

#[test]
fn effective_grid_scales_with_background() {
    // 1600 px image drawn into an 800 px canvas halves the cell size.
    assert_eq!(space(Camera::default(), Some(1600.0)).effective_grid_size(), 25.0);
}

#[test]
fn effective_grid_ignores_zero_background_width() {
    assert_eq!(space(Camera::default(), Some(0.0)).effective_grid_size(), 50.0);
}

#[test]
fn effective_grid_never_zero() {
    let s = CoordinateSpace::new(Camera::default(), Size::default(), Some(1000.0), 50.0);
    assert!(s.effective_grid_size() > 0.0);
}

// =============================================================
// Grid cells
// =============================================================

#[test]
fn world_to_cell_floors() {
    let s = space(Camera::default(), None);
    assert_eq!(s.world_to_cell(Point::new(49.9, 50.0)), GridCell::new(0, 1));
    assert_eq!(s.world_to_cell(Point::new(-0.1, 0.0)), GridCell::new(-1, 0));
}

#[test]
fn world_to_cell_nan_maps_to_origin() {
    let s = space(Camera::default(), None);
    assert_eq!(s.world_to_cell(Point::new(f64::NAN, f64::NAN)), GridCell::new(0, 0));
}

#[test]
fn cell_round_trip_for_any_camera() {
    let cameras = [
        Camera::default(),
        Camera { zoom: 0.2, pan_x: 3.5, pan_y: -2.0 },
        Camera { zoom: 5.0, pan_x: -0.75, pan_y: 0.33 },
        Camera { zoom: 1.37, pan_x: 0.01, pan_y: 12.0 },
    ];
    for cam in cameras {
        for bg in [None, Some(1234.0), Some(400.0)] {
            let s = space(cam, bg);
            for col in [0, 1, 7, 19, 250] {
                for row in [0, 3, 11, 99] {
                    let cell = GridCell::new(col, row);
                    let center = s.cell_to_world_center(cell, 1.0);
                    assert_eq!(s.world_to_cell(center), cell, "camera {cam:?} bg {bg:?}");
                    let screen = s.world_to_screen(center);
                    assert_eq!(s.screen_to_cell(screen), cell);
                }
            }
        }
    }
}

#[test]
fn large_token_center_is_offset_by_full_cell() {
    let s = space(Camera::default(), None);
    let center = s.cell_to_world_center(GridCell::new(2, 3), 2.0);
    assert_eq!(center, Point::new(150.0, 200.0));
}

#[test]
fn tiny_token_centers_on_cell() {
    let s = space(Camera::default(), None);
    let center = s.cell_to_world_center(GridCell::new(0, 0), 0.5);
    assert_eq!(center, Point::new(25.0, 25.0));
}

#[test]
fn feet_to_world_uses_five_foot_cells() {
    let s = space(Camera::default(), None);
    assert_eq!(s.feet_to_world(20.0), 200.0);
}

#[test]
fn grid_cell_clamped() {
    assert_eq!(GridCell::new(-3, 4).clamped(), GridCell::new(0, 4));
}

#[test]
fn grid_cell_serializes_as_xy() {
    let json = serde_json::to_value(GridCell::new(3, 9)).expect("serialize");
    assert_eq!(json, serde_json::json!({"x": 3, "y": 9}));
}

// =============================================================
// Canvas fitting
// =============================================================

#[test]
fn fit_canvas_without_background_fills_container() {
    assert_eq!(fit_canvas(Size::new(900.0, 700.0), None), Size::new(900.0, 700.0));
}

#[test]
fn fit_canvas_keeps_aspect_ratio() {
    let fitted = fit_canvas(Size::new(1000.0, 1000.0), Some(Size::new(2000.0, 1000.0)));
    assert_eq!(fitted, Size::new(1000.0, 500.0));
}

#[test]
fn fit_canvas_never_upscales() {
    let fitted = fit_canvas(Size::new(1000.0, 1000.0), Some(Size::new(300.0, 200.0)));
    assert_eq!(fitted, Size::new(300.0, 200.0));
}
