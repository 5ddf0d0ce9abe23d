//! Residuals and gradients for each constraint kind.
//!
//! A [`BoundConstraint`] is a constraint whose geometry references have been
//! resolved down to parameter cells. Evaluation then reads straight from the
//! parameter slice, with no id lookups inside the solver loop.

use nalgebra::{Point2, Vector2};
use sketch_types::{Constraint, ConstraintId, ConstraintKind, ParamId, Sketch};

use crate::error::SolverError;
use crate::index::GeoIndex;
use crate::solver::ERROR_TOLERANCE;

/// Cells of a point: `[x, y]`.
type PointCells = [ParamId; 2];
/// Cells of a segment: `[ax, ay, bx, by]`.
type SegmentCells = [ParamId; 4];

/// Residual form of a constraint, holding parameter cells instead of ids.
#[derive(Debug, Clone, PartialEq)]
pub enum Residual {
    Fix { p: PointCells, x: f64, y: f64 },
    Distance { a: PointCells, b: PointCells, d: f64 },
    Coincident { a: PointCells, b: PointCells },
    PointOnLine { p: PointCells, line: SegmentCells },
    PointOnCircle { p: PointCells, center: PointCells, r: ParamId },
    Radius { r: ParamId, target: f64 },
    Perpendicular { a: SegmentCells, b: SegmentCells },
    Parallel { a: SegmentCells, b: SegmentCells },
    Vertical { a: PointCells, b: PointCells },
    Horizontal { a: PointCells, b: PointCells },
    Angle { a: SegmentCells, b: SegmentCells, degrees: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundConstraint {
    pub id: ConstraintId,
    pub residual: Residual,
}

/// Resolve every reference of `constraint` against `sketch`.
///
/// Fails with a reference error before any value is read.
pub fn bind(constraint: &Constraint, index: &GeoIndex, sketch: &Sketch) -> Result<BoundConstraint, SolverError> {
    let residual = match constraint {
        Constraint::Fix { p_id, x, y, .. } => Residual::Fix {
            p: index.point(sketch, *p_id)?,
            x: *x,
            y: *y,
        },
        Constraint::Distance { a_id, b_id, d, .. } => Residual::Distance {
            a: index.point(sketch, *a_id)?,
            b: index.point(sketch, *b_id)?,
            d: *d,
        },
        Constraint::Coincident { a_id, b_id, .. } => Residual::Coincident {
            a: index.point(sketch, *a_id)?,
            b: index.point(sketch, *b_id)?,
        },
        Constraint::PointOnLine { p_id, l_id, .. } => Residual::PointOnLine {
            p: index.point(sketch, *p_id)?,
            line: index.segment(sketch, *l_id)?,
        },
        Constraint::PointOnCircle { p_id, c_id, .. } => {
            let p = index.point(sketch, *p_id)?;
            let [cx, cy, r] = index.circle(sketch, *c_id)?;
            Residual::PointOnCircle { p, center: [cx, cy], r }
        }
        Constraint::Radius { c_id, r, .. } => {
            let [_, _, cell] = index.circle(sketch, *c_id)?;
            Residual::Radius { r: cell, target: *r }
        }
        Constraint::Perpendicular { a_id, b_id, .. } => Residual::Perpendicular {
            a: index.segment(sketch, *a_id)?,
            b: index.segment(sketch, *b_id)?,
        },
        Constraint::Parallel { a_id, b_id, .. } => Residual::Parallel {
            a: index.segment(sketch, *a_id)?,
            b: index.segment(sketch, *b_id)?,
        },
        Constraint::Vertical { a_id, b_id, .. } => Residual::Vertical {
            a: index.point(sketch, *a_id)?,
            b: index.point(sketch, *b_id)?,
        },
        Constraint::Horizontal { a_id, b_id, .. } => Residual::Horizontal {
            a: index.point(sketch, *a_id)?,
            b: index.point(sketch, *b_id)?,
        },
        Constraint::Angle { a_id, b_id, degrees, .. } => Residual::Angle {
            a: index.segment(sketch, *a_id)?,
            b: index.segment(sketch, *b_id)?,
            degrees: *degrees,
        },
    };

    Ok(BoundConstraint {
        id: constraint.id(),
        residual,
    })
}

fn point(values: &[f64], cells: PointCells) -> Point2<f64> {
    Point2::new(values[cells[0].index()], values[cells[1].index()])
}

fn endpoints(values: &[f64], cells: SegmentCells) -> (Point2<f64>, Point2<f64>) {
    (point(values, [cells[0], cells[1]]), point(values, [cells[2], cells[3]]))
}

fn direction(values: &[f64], cells: SegmentCells) -> Vector2<f64> {
    let (a, b) = endpoints(values, cells);
    b - a
}

fn push(grads: &mut [f64], cells: PointCells, g: Vector2<f64>) {
    grads[cells[0].index()] += g.x;
    grads[cells[1].index()] += g.y;
}

/// Push `g` onto the end point of a segment and `-g` onto its start point.
fn push_segment(grads: &mut [f64], cells: SegmentCells, g: Vector2<f64>) {
    push(grads, [cells[0], cells[1]], -g);
    push(grads, [cells[2], cells[3]], g);
}

fn angle_cos(v1: &Vector2<f64>, v2: &Vector2<f64>) -> f64 {
    v1.dot(v2) / (v1.norm() * v2.norm()).max(ERROR_TOLERANCE)
}

impl BoundConstraint {
    pub fn kind(&self) -> ConstraintKind {
        match self.residual {
            Residual::Fix { .. } => ConstraintKind::Fix,
            Residual::Distance { .. } => ConstraintKind::Distance,
            Residual::Coincident { .. } => ConstraintKind::Coincident,
            Residual::PointOnLine { .. } => ConstraintKind::PointOnLine,
            Residual::PointOnCircle { .. } => ConstraintKind::PointOnCircle,
            Residual::Radius { .. } => ConstraintKind::Radius,
            Residual::Perpendicular { .. } => ConstraintKind::Perpendicular,
            Residual::Parallel { .. } => ConstraintKind::Parallel,
            Residual::Vertical { .. } => ConstraintKind::Vertical,
            Residual::Horizontal { .. } => ConstraintKind::Horizontal,
            Residual::Angle { .. } => ConstraintKind::Angle,
        }
    }

    /// Every cell this constraint reads, in reference order.
    pub fn params(&self) -> Vec<ParamId> {
        match &self.residual {
            Residual::Fix { p, .. } => p.to_vec(),
            Residual::Radius { r, .. } => vec![*r],
            Residual::Distance { a, b, .. }
            | Residual::Coincident { a, b }
            | Residual::Vertical { a, b }
            | Residual::Horizontal { a, b } => [a.as_slice(), b.as_slice()].concat(),
            Residual::PointOnLine { p, line } => [p.as_slice(), line.as_slice()].concat(),
            Residual::PointOnCircle { p, center, r } => [p.as_slice(), center.as_slice(), std::slice::from_ref(r)].concat(),
            Residual::Perpendicular { a, b } | Residual::Parallel { a, b } | Residual::Angle { a, b, .. } => {
                [a.as_slice(), b.as_slice()].concat()
            }
        }
    }

    /// Non-negative residual, zero exactly when satisfied.
    pub fn error(&self, values: &[f64]) -> f64 {
        match &self.residual {
            Residual::Fix { p, x, y } => (point(values, *p) - Point2::new(*x, *y)).norm_squared(),
            Residual::Distance { a, b, d } => {
                let dist = nalgebra::distance(&point(values, *a), &point(values, *b));
                (dist - d).powi(2)
            }
            Residual::Coincident { a, b } => nalgebra::distance_squared(&point(values, *a), &point(values, *b)),
            Residual::PointOnLine { p, line } => {
                let (a, _) = endpoints(values, *line);
                let q = point(values, *p) - a;
                q.perp(&direction(values, *line)).powi(2)
            }
            Residual::PointOnCircle { p, center, r } => {
                let delta = point(values, *p) - point(values, *center);
                let r = values[r.index()];
                (delta.norm_squared() - r * r).powi(2)
            }
            Residual::Radius { r, target } => (values[r.index()] - target).powi(2),
            Residual::Perpendicular { a, b } => direction(values, *a).dot(&direction(values, *b)).powi(2),
            Residual::Parallel { a, b } => direction(values, *a).perp(&direction(values, *b)).powi(2),
            Residual::Vertical { a, b } => (values[a[0].index()] - values[b[0].index()]).powi(2),
            Residual::Horizontal { a, b } => (values[a[1].index()] - values[b[1].index()]).powi(2),
            Residual::Angle { a, b, degrees } => {
                let cos = angle_cos(&direction(values, *a), &direction(values, *b));
                (cos - degrees.to_radians().cos()).powi(2)
            }
        }
    }

    /// Add this constraint's partial derivatives into `grads`.
    ///
    /// `grads` is indexed like the parameter arena. Contributions are summed,
    /// so cells shared between constraints couple their pulls.
    pub fn accumulate_gradient(&self, values: &[f64], grads: &mut [f64]) {
        match &self.residual {
            Residual::Fix { p, x, y } => {
                let g = (point(values, *p) - Point2::new(*x, *y)) * 2.0;
                push(grads, *p, g);
            }
            Residual::Distance { a, b, d } => {
                let delta = point(values, *b) - point(values, *a);
                let dist = delta.norm();
                // Coincident points have no direction; separate them along +x.
                let unit = if dist > 0.0 {
                    delta / dist.max(ERROR_TOLERANCE)
                } else {
                    Vector2::x()
                };
                let g = unit * (2.0 * (dist - d));
                push(grads, *a, -g);
                push(grads, *b, g);
            }
            Residual::Coincident { a, b } => {
                let g = (point(values, *a) - point(values, *b)) * 2.0;
                push(grads, *a, g);
                push(grads, *b, -g);
            }
            Residual::PointOnLine { p, line } => {
                let (a, _) = endpoints(values, *line);
                let dir = direction(values, *line);
                let q = point(values, *p) - a;
                let e = 2.0 * q.perp(&dir);
                push(grads, *p, Vector2::new(dir.y, -dir.x) * e);
                push(grads, [line[0], line[1]], Vector2::new(q.y - dir.y, dir.x - q.x) * e);
                push(grads, [line[2], line[3]], Vector2::new(-q.y, q.x) * e);
            }
            Residual::PointOnCircle { p, center, r } => {
                let delta = point(values, *p) - point(values, *center);
                let radius = values[r.index()];
                let e = 2.0 * (delta.norm_squared() - radius * radius);
                push(grads, *p, delta * (2.0 * e));
                push(grads, *center, delta * (-2.0 * e));
                grads[r.index()] -= 2.0 * radius * e;
            }
            Residual::Radius { r, target } => {
                grads[r.index()] += 2.0 * (values[r.index()] - target);
            }
            Residual::Perpendicular { a, b } => {
                let v1 = direction(values, *a);
                let v2 = direction(values, *b);
                let e = 2.0 * v1.dot(&v2);
                push_segment(grads, *a, v2 * e);
                push_segment(grads, *b, v1 * e);
            }
            Residual::Parallel { a, b } => {
                let v1 = direction(values, *a);
                let v2 = direction(values, *b);
                let e = 2.0 * v1.perp(&v2);
                push_segment(grads, *a, Vector2::new(v2.y, -v2.x) * e);
                push_segment(grads, *b, Vector2::new(-v1.y, v1.x) * e);
            }
            Residual::Vertical { a, b } => {
                let g = 2.0 * (values[a[0].index()] - values[b[0].index()]);
                grads[a[0].index()] += g;
                grads[b[0].index()] -= g;
            }
            Residual::Horizontal { a, b } => {
                let g = 2.0 * (values[a[1].index()] - values[b[1].index()]);
                grads[a[1].index()] += g;
                grads[b[1].index()] -= g;
            }
            Residual::Angle { a, b, degrees } => {
                let v1 = direction(values, *a);
                let v2 = direction(values, *b);
                let l1 = v1.norm().max(ERROR_TOLERANCE);
                let l2 = v2.norm().max(ERROR_TOLERANCE);
                let s = 2.0 * (angle_cos(&v1, &v2) - degrees.to_radians().cos());
                let cross = v1.perp(&v2);
                let k1 = cross / (l1.powi(3) * l2);
                let k2 = cross / (l1 * l2.powi(3));
                push_segment(grads, *a, Vector2::new(-v1.y, v1.x) * (k1 * s));
                push_segment(grads, *b, Vector2::new(v2.y, -v2.x) * (k2 * s));
            }
        }
    }
}

/// Sum of all residuals.
pub fn total_error(constraints: &[BoundConstraint], values: &[f64]) -> f64 {
    constraints.iter().map(|c| c.error(values)).sum()
}
