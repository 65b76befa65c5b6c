use super::*;

fn shape(kind: ShapeKind, col: i32, row: i32, size_ft: f64) -> AreaEffectShape {
    AreaEffectShape::new(kind, GridCell::new(col, row), size_ft, "#9b2c2c66")
}

fn token_at_cell(col: i32, row: i32, size: f64) -> Token {
    Token { x: col, y: row, ..Token::new("T", "#fff", size) }
}

// --- Shapes ---

#[test]
fn circle_hits_within_half_size() {
    // 20 ft -> 4 cells -> radius 2 cells.
    let s = shape(ShapeKind::Circle, 10, 10, 20.0);
    assert!(shape_covers(&s, GridCell::new(10, 10)));
    assert!(shape_covers(&s, GridCell::new(12, 10)));
    assert!(!shape_covers(&s, GridCell::new(12, 12)));
    assert!(!shape_covers(&s, GridCell::new(13, 10)));
}

#[test]
fn cube_hits_axis_aligned_bounds() {
    let s = shape(ShapeKind::Cube, 10, 10, 20.0);
    assert!(shape_covers(&s, GridCell::new(12, 12)));
    assert!(shape_covers(&s, GridCell::new(8, 8)));
    assert!(!shape_covers(&s, GridCell::new(13, 10)));
}

#[test]
fn cone_and_line_use_radial_distance() {
    for kind in [ShapeKind::Cone, ShapeKind::Line] {
        let s = shape(kind, 0, 0, 10.0);
        assert!(shape_covers(&s, GridCell::new(1, 0)));
        assert!(!shape_covers(&s, GridCell::new(1, 1)));
    }
}

#[test]
fn shape_at_returns_first_match() {
    let shapes = vec![shape(ShapeKind::Circle, 0, 0, 10.0), shape(ShapeKind::Cube, 0, 0, 30.0)];
    assert_eq!(shape_at(&shapes, GridCell::new(0, 0)), Some(0));
    assert_eq!(shape_at(&shapes, GridCell::new(3, 3)), Some(1));
    assert_eq!(shape_at(&shapes, GridCell::new(9, 9)), None);
}

#[test]
fn shape_at_empty_list() {
    assert_eq!(shape_at(&[], GridCell::new(0, 0)), None);
}

// --- Tokens ---

#[test]
fn token_at_single_cell() {
    let tokens = vec![token_at_cell(3, 4, 1.0)];
    assert_eq!(token_at(&tokens, GridCell::new(3, 4)), Some(0));
    assert_eq!(token_at(&tokens, GridCell::new(4, 4)), None);
}

#[test]
fn token_at_large_footprint() {
    let tokens = vec![token_at_cell(0, 0, 1.0), token_at_cell(5, 5, 3.0)];
    assert_eq!(token_at(&tokens, GridCell::new(7, 7)), Some(1));
    assert_eq!(token_at(&tokens, GridCell::new(8, 7)), None);
}

#[test]
fn token_at_prefers_earlier_token_on_overlap() {
    let tokens = vec![token_at_cell(0, 0, 2.0), token_at_cell(1, 1, 1.0)];
    assert_eq!(token_at(&tokens, GridCell::new(1, 1)), Some(0));
}
