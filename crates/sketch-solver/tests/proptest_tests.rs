//! Property-based tests for rectangle construction and solving.

use proptest::prelude::*;

use sketch_solver::builder;
use sketch_solver::{Rect, SketchSolver, SolveConfig, Sketch};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// Arbitrary corner coordinates, including negative and swapped corners.
fn arb_corner() -> impl Strategy<Value = (f64, f64)> {
    (-1000.0f64..1000.0, -1000.0f64..1000.0)
}

/// Small drag offset applied to one endpoint.
fn arb_drag() -> impl Strategy<Value = (f64, f64)> {
    (-20.0f64..20.0, -20.0f64..20.0)
}

const TOL: f64 = 1e-4;

fn closed_and_aligned(sketch: &Sketch, rect: &Rect) -> Result<(), TestCaseError> {
    let at = |id| sketch.point_position(id).ok_or_else(|| TestCaseError::fail("not a point"));
    for (end, start) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
        let (ex, ey) = at(rect.sides[end].b)?;
        let (sx, sy) = at(rect.sides[start].a)?;
        prop_assert!((ex - sx).abs() < TOL && (ey - sy).abs() < TOL, "corner {end} open");
    }
    for side in rect.horizontal_sides() {
        prop_assert!((at(side.a)?.1 - at(side.b)?.1).abs() < TOL);
    }
    for side in rect.vertical_sides() {
        prop_assert!((at(side.a)?.0 - at(side.b)?.0).abs() < TOL);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 1. A freshly built rectangle already satisfies its constraints
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn fresh_rect_needs_no_iterations((ax, ay) in arb_corner(), (bx, by) in arb_corner()) {
        let mut sketch = Sketch::new();
        let rect = builder::add_rect(&mut sketch, ax, ay, bx, by);
        let before = sketch.params().clone();

        let report = SketchSolver::new(&sketch).solve(&mut sketch, SolveConfig::default()).unwrap();

        prop_assert_eq!(report.iterations, 0);
        prop_assert_eq!(sketch.params(), &before);
        closed_and_aligned(&sketch, &rect)?;
    }
}

// ---------------------------------------------------------------------------
// 2. Dragging one endpoint and re-solving closes the loop again
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn dragged_rect_closes_again(
        (ax, ay) in arb_corner(),
        (bx, by) in arb_corner(),
        side in 0usize..4,
        use_end in any::<bool>(),
        (dx, dy) in arb_drag(),
    ) {
        let mut sketch = Sketch::new();
        let rect = builder::add_rect(&mut sketch, ax, ay, bx, by);
        let point = if use_end { rect.sides[side].b } else { rect.sides[side].a };
        let (x, y) = sketch.point_position(point).unwrap();
        sketch.move_point(point, x + dx, y + dy);

        let config = SolveConfig { tolerance: 1e-10, ..Default::default() };
        SketchSolver::new(&sketch).solve(&mut sketch, config).unwrap();

        closed_and_aligned(&sketch, &rect)?;
    }
}
