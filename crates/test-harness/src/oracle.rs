//! Verification oracles: pure functions returning pass/fail verdicts.
//!
//! Each oracle returns an `OracleVerdict` with diagnostic detail, not panics.
//! This lets a test collect all failures in one pass.

use sketch_solver::evaluate::bind;
use sketch_solver::{Geo, GeoId, GeoIndex, GeoKind, Rect, Sketch};

/// The result of a single oracle check.
#[derive(Debug, Clone)]
pub struct OracleVerdict {
    pub oracle_name: String,
    pub passed: bool,
    pub detail: String,
    pub value: Option<f64>,
}

impl OracleVerdict {
    fn pass(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: None,
        }
    }

    fn pass_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: Some(value),
        }
    }

    fn fail(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: None,
        }
    }

    fn fail_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: Some(value),
        }
    }
}

// ── Structure Oracles ───────────────────────────────────────────────────────

/// Check that every geometry and constraint reference resolves to the right kind.
pub fn check_references(sketch: &Sketch) -> OracleVerdict {
    let index = GeoIndex::build(sketch);
    let mut broken = Vec::new();

    for geo in sketch.geos() {
        let refs: Vec<(GeoId, GeoKind)> = match geo {
            Geo::Point { .. } => Vec::new(),
            Geo::Segment { a_id, b_id, .. } => vec![(*a_id, GeoKind::Point), (*b_id, GeoKind::Point)],
            Geo::Circle { c_id, .. } => vec![(*c_id, GeoKind::Point)],
        };
        for (id, kind) in refs {
            if let Err(err) = index.resolve(sketch, id, kind) {
                broken.push(format!("{}: {err}", geo.id()));
            }
        }
    }
    for constraint in sketch.constraints() {
        if let Err(err) = bind(constraint, &index, sketch) {
            broken.push(format!("{}: {err}", constraint.id()));
        }
    }

    if broken.is_empty() {
        OracleVerdict::pass(
            "references",
            format!(
                "{} geos and {} constraints resolve",
                sketch.geos().len(),
                sketch.constraints().len()
            ),
        )
    } else {
        OracleVerdict::fail(
            "references",
            format!("{} broken references: {:?}", broken.len(), &broken[..broken.len().min(5)]),
        )
    }
}

/// Check that every parameter value is finite.
pub fn check_finite_params(sketch: &Sketch) -> OracleVerdict {
    let bad: Vec<usize> = sketch
        .params()
        .as_slice()
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_finite())
        .map(|(i, _)| i)
        .collect();

    if bad.is_empty() {
        OracleVerdict::pass("finite_params", format!("all {} params finite", sketch.params().len()))
    } else {
        OracleVerdict::fail("finite_params", format!("non-finite params at {:?}", bad))
    }
}

// ── Solution Oracles ────────────────────────────────────────────────────────

/// Check that every constraint's residual is below `tol`. Reports the worst one.
pub fn check_constraints_satisfied(sketch: &Sketch, tol: f64) -> OracleVerdict {
    let index = GeoIndex::build(sketch);
    let values = sketch.params().as_slice();
    let mut worst: Option<(String, f64)> = None;

    for constraint in sketch.constraints() {
        let residual = match bind(constraint, &index, sketch) {
            Ok(bound) => bound.error(values),
            Err(err) => {
                return OracleVerdict::fail("constraints_satisfied", format!("{}: {err}", constraint.id()));
            }
        };
        if worst.as_ref().map_or(true, |(_, w)| residual > *w) {
            worst = Some((format!("{} ({})", constraint.id(), constraint.kind()), residual));
        }
    }

    match worst {
        None => OracleVerdict::pass_val("constraints_satisfied", "no constraints".to_string(), 0.0),
        Some((label, residual)) if residual < tol => OracleVerdict::pass_val(
            "constraints_satisfied",
            format!("worst residual {residual:.3e} at {label} (tol={tol})"),
            residual,
        ),
        Some((label, residual)) => OracleVerdict::fail_val(
            "constraints_satisfied",
            format!("residual {residual:.3e} at {label} exceeds tol={tol}"),
            residual,
        ),
    }
}

/// Check that a point sits at `expected` within `tol` on each axis.
pub fn check_point_at(sketch: &Sketch, id: GeoId, expected: (f64, f64), tol: f64) -> OracleVerdict {
    let Some((x, y)) = sketch.point_position(id) else {
        return OracleVerdict::fail("point_at", format!("{id} is not a point"));
    };
    let off = (x - expected.0).abs().max((y - expected.1).abs());
    let detail = format!(
        "{id} at ({x:.6}, {y:.6}), expected ({:.6}, {:.6}), tol={tol}",
        expected.0, expected.1
    );
    if off < tol {
        OracleVerdict::pass_val("point_at", detail, off)
    } else {
        OracleVerdict::fail_val("point_at", detail, off)
    }
}

/// Check the distance between two points.
pub fn check_distance(sketch: &Sketch, a: GeoId, b: GeoId, expected: f64, tol: f64) -> OracleVerdict {
    let (Some((ax, ay)), Some((bx, by))) = (sketch.point_position(a), sketch.point_position(b)) else {
        return OracleVerdict::fail("distance", format!("{a} or {b} is not a point"));
    };
    let d = (bx - ax).hypot(by - ay);
    let detail = format!("|{a} {b}| = {d:.6}, expected {expected:.6} (tol={tol})");
    if (d - expected).abs() < tol {
        OracleVerdict::pass_val("distance", detail, d)
    } else {
        OracleVerdict::fail_val("distance", detail, d)
    }
}

/// Check that a rectangle's corners meet and its sides stay axis-aligned.
pub fn check_rect_closed(sketch: &Sketch, rect: &Rect, tol: f64) -> OracleVerdict {
    let mut gaps = Vec::new();
    let mut worst = 0.0f64;

    for (end, start) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
        let (Some(e), Some(s)) = (
            sketch.point_position(rect.sides[end].b),
            sketch.point_position(rect.sides[start].a),
        ) else {
            return OracleVerdict::fail("rect_closed", format!("side {end} or {start} lost its endpoints"));
        };
        let gap = (e.0 - s.0).abs().max((e.1 - s.1).abs());
        worst = worst.max(gap);
        if gap >= tol {
            gaps.push(format!("corner {end}->{start} open by {gap:.3e}"));
        }
    }

    for (axis, sides) in [(1, rect.horizontal_sides()), (0, rect.vertical_sides())] {
        for side in sides {
            let (Some(a), Some(b)) = (sketch.point_position(side.a), sketch.point_position(side.b)) else {
                return OracleVerdict::fail("rect_closed", format!("{} lost its endpoints", side.segment));
            };
            let skew = if axis == 0 { (a.0 - b.0).abs() } else { (a.1 - b.1).abs() };
            worst = worst.max(skew);
            if skew >= tol {
                gaps.push(format!("{} skewed by {skew:.3e}", side.segment));
            }
        }
    }

    if gaps.is_empty() {
        OracleVerdict::pass_val("rect_closed", format!("closed and aligned (tol={tol})"), worst)
    } else {
        OracleVerdict::fail_val("rect_closed", gaps.join("; "), worst)
    }
}

/// Check that parameter values match a snapshot exactly, as after a rollback.
pub fn check_params_restored(before: &[f64], sketch: &Sketch) -> OracleVerdict {
    let after = sketch.params().as_slice();
    if before.len() != after.len() {
        return OracleVerdict::fail(
            "params_restored",
            format!("param count changed from {} to {}", before.len(), after.len()),
        );
    }
    let shift = crate::helpers::max_param_shift(before, after);
    if shift == 0.0 {
        OracleVerdict::pass("params_restored", format!("{} params unchanged", after.len()))
    } else {
        OracleVerdict::fail_val("params_restored", format!("params moved by up to {shift:.3e}"), shift)
    }
}

// ── Convenience ─────────────────────────────────────────────────────────────

/// Run structure oracles plus constraint satisfaction.
pub fn check_solved_sketch(sketch: &Sketch, tol: f64) -> Vec<OracleVerdict> {
    vec![
        check_references(sketch),
        check_finite_params(sketch),
        check_constraints_satisfied(sketch, tol),
    ]
}
