//! Construction helpers for sketch geometry and constraints.
//!
//! Geometry builders cannot fail: they create the points they need. Builders
//! that take existing ids check every reference first and leave the sketch
//! untouched when one does not resolve.

use sketch_types::{Constraint, ConstraintId, GeoId, GeoKind, Sketch};
use tracing::{debug, instrument};

use crate::error::SolverError;
use crate::index::check_kind;

/// A segment together with its two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentParts {
    pub segment: GeoId,
    pub a: GeoId,
    pub b: GeoId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircleParts {
    pub circle: GeoId,
    pub center: GeoId,
}

/// Four segments forming a closed, axis-aligned loop.
///
/// Sides run first corner → (bx, ay) → opposite corner → (ax, by) → back.
/// Each side owns its endpoints; corners are tied by coincidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rect {
    pub sides: [SegmentParts; 4],
    pub constraints: Vec<ConstraintId>,
}

impl Rect {
    /// Start point of each side, in loop order.
    pub fn corners(&self) -> [GeoId; 4] {
        self.sides.map(|side| side.a)
    }

    pub fn horizontal_sides(&self) -> [SegmentParts; 2] {
        [self.sides[0], self.sides[2]]
    }

    pub fn vertical_sides(&self) -> [SegmentParts; 2] {
        [self.sides[1], self.sides[3]]
    }
}

fn require(sketch: &Sketch, id: GeoId, kind: GeoKind) -> Result<(), SolverError> {
    check_kind(sketch.find_geo(id), id, kind).map(|_| ())
}

fn push(sketch: &mut Sketch, build: impl FnOnce(ConstraintId) -> Constraint) -> ConstraintId {
    let id = sketch.insert_constraint(build);
    if let Some(constraint) = sketch.find_constraint(id) {
        debug!(%id, kind = %constraint.kind(), "constraint added");
    }
    id
}

pub fn add_point(sketch: &mut Sketch, x: f64, y: f64) -> GeoId {
    sketch.insert_point(x, y)
}

/// Segment with two new endpoints.
pub fn add_segment(sketch: &mut Sketch, ax: f64, ay: f64, bx: f64, by: f64) -> SegmentParts {
    let a = sketch.insert_point(ax, ay);
    let b = sketch.insert_point(bx, by);
    let segment = sketch.insert_segment(a, b);
    SegmentParts { segment, a, b }
}

/// Segment continuing from an existing point to a new one.
pub fn add_segment_from(sketch: &mut Sketch, a: GeoId, bx: f64, by: f64) -> Result<SegmentParts, SolverError> {
    require(sketch, a, GeoKind::Point)?;
    let b = sketch.insert_point(bx, by);
    let segment = sketch.insert_segment(a, b);
    Ok(SegmentParts { segment, a, b })
}

/// Segment joining two existing points.
pub fn add_segment_between(sketch: &mut Sketch, a: GeoId, b: GeoId) -> Result<SegmentParts, SolverError> {
    require(sketch, a, GeoKind::Point)?;
    require(sketch, b, GeoKind::Point)?;
    let segment = sketch.insert_segment(a, b);
    Ok(SegmentParts { segment, a, b })
}

pub fn add_circle(sketch: &mut Sketch, cx: f64, cy: f64, r: f64) -> CircleParts {
    let center = sketch.insert_point(cx, cy);
    let circle = sketch.insert_circle(center, r);
    CircleParts { circle, center }
}

/// Rectangle spanning two opposite corners, in any order.
#[instrument(skip(sketch))]
pub fn add_rect(sketch: &mut Sketch, ax: f64, ay: f64, bx: f64, by: f64) -> Rect {
    let h1 = add_segment(sketch, ax, ay, bx, ay);
    let v1 = add_segment(sketch, bx, ay, bx, by);
    let h2 = add_segment(sketch, bx, by, ax, by);
    let v2 = add_segment(sketch, ax, by, ax, ay);

    let mut constraints = Vec::with_capacity(8);
    for (a_id, b_id) in [(h1.a, v2.b), (h1.b, v1.a), (v1.b, h2.a), (h2.b, v2.a)] {
        constraints.push(push(sketch, |id| Constraint::Coincident { id, a_id, b_id }));
    }
    for side in [v1, v2] {
        constraints.push(push(sketch, |id| Constraint::Vertical { id, a_id: side.a, b_id: side.b }));
    }
    for side in [h1, h2] {
        constraints.push(push(sketch, |id| Constraint::Horizontal { id, a_id: side.a, b_id: side.b }));
    }

    Rect {
        sides: [h1, v1, h2, v2],
        constraints,
    }
}

/// Pin a point where it currently is.
pub fn fix(sketch: &mut Sketch, p_id: GeoId) -> Result<ConstraintId, SolverError> {
    require(sketch, p_id, GeoKind::Point)?;
    let (x, y) = sketch
        .point_position(p_id)
        .ok_or(SolverError::UnknownReference { id: p_id })?;
    Ok(push(sketch, |id| Constraint::Fix { id, p_id, x, y }))
}

pub fn fix_at(sketch: &mut Sketch, p_id: GeoId, x: f64, y: f64) -> Result<ConstraintId, SolverError> {
    require(sketch, p_id, GeoKind::Point)?;
    Ok(push(sketch, |id| Constraint::Fix { id, p_id, x, y }))
}

pub fn distance(sketch: &mut Sketch, a_id: GeoId, b_id: GeoId, d: f64) -> Result<ConstraintId, SolverError> {
    require(sketch, a_id, GeoKind::Point)?;
    require(sketch, b_id, GeoKind::Point)?;
    Ok(push(sketch, |id| Constraint::Distance { id, a_id, b_id, d }))
}

pub fn coincident(sketch: &mut Sketch, a_id: GeoId, b_id: GeoId) -> Result<ConstraintId, SolverError> {
    require(sketch, a_id, GeoKind::Point)?;
    require(sketch, b_id, GeoKind::Point)?;
    Ok(push(sketch, |id| Constraint::Coincident { id, a_id, b_id }))
}

pub fn point_on_line(sketch: &mut Sketch, p_id: GeoId, l_id: GeoId) -> Result<ConstraintId, SolverError> {
    require(sketch, p_id, GeoKind::Point)?;
    require(sketch, l_id, GeoKind::Segment)?;
    Ok(push(sketch, |id| Constraint::PointOnLine { id, p_id, l_id }))
}

pub fn point_on_circle(sketch: &mut Sketch, p_id: GeoId, c_id: GeoId) -> Result<ConstraintId, SolverError> {
    require(sketch, p_id, GeoKind::Point)?;
    require(sketch, c_id, GeoKind::Circle)?;
    Ok(push(sketch, |id| Constraint::PointOnCircle { id, p_id, c_id }))
}

pub fn radius(sketch: &mut Sketch, c_id: GeoId, r: f64) -> Result<ConstraintId, SolverError> {
    require(sketch, c_id, GeoKind::Circle)?;
    Ok(push(sketch, |id| Constraint::Radius { id, c_id, r }))
}

pub fn perpendicular(sketch: &mut Sketch, a_id: GeoId, b_id: GeoId) -> Result<ConstraintId, SolverError> {
    require(sketch, a_id, GeoKind::Segment)?;
    require(sketch, b_id, GeoKind::Segment)?;
    Ok(push(sketch, |id| Constraint::Perpendicular { id, a_id, b_id }))
}

pub fn parallel(sketch: &mut Sketch, a_id: GeoId, b_id: GeoId) -> Result<ConstraintId, SolverError> {
    require(sketch, a_id, GeoKind::Segment)?;
    require(sketch, b_id, GeoKind::Segment)?;
    Ok(push(sketch, |id| Constraint::Parallel { id, a_id, b_id }))
}

pub fn vertical(sketch: &mut Sketch, a_id: GeoId, b_id: GeoId) -> Result<ConstraintId, SolverError> {
    require(sketch, a_id, GeoKind::Point)?;
    require(sketch, b_id, GeoKind::Point)?;
    Ok(push(sketch, |id| Constraint::Vertical { id, a_id, b_id }))
}

pub fn horizontal(sketch: &mut Sketch, a_id: GeoId, b_id: GeoId) -> Result<ConstraintId, SolverError> {
    require(sketch, a_id, GeoKind::Point)?;
    require(sketch, b_id, GeoKind::Point)?;
    Ok(push(sketch, |id| Constraint::Horizontal { id, a_id, b_id }))
}

/// Angle between two segment directions, in degrees.
pub fn angle(sketch: &mut Sketch, a_id: GeoId, b_id: GeoId, degrees: f64) -> Result<ConstraintId, SolverError> {
    require(sketch, a_id, GeoKind::Segment)?;
    require(sketch, b_id, GeoKind::Segment)?;
    Ok(push(sketch, |id| Constraint::Angle { id, a_id, b_id, degrees }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_shares_no_points_between_sides() {
        let mut sketch = Sketch::new();
        let rect = add_rect(&mut sketch, 10.0, 10.0, 80.0, 120.0);

        // 8 points + 4 segments + 8 constraints
        assert_eq!(sketch.geos().len(), 12);
        assert_eq!(rect.constraints.len(), 8);
        assert_eq!(sketch.constraints().len(), 8);

        let corners: Vec<_> = rect.corners().iter().map(|c| sketch.point_position(*c).unwrap()).collect();
        assert_eq!(corners, vec![(10.0, 10.0), (80.0, 10.0), (80.0, 120.0), (10.0, 120.0)]);
    }

    #[test]
    fn rect_ties_each_corner_once() {
        let mut sketch = Sketch::new();
        let rect = add_rect(&mut sketch, 0.0, 0.0, 1.0, 1.0);
        let coincident = sketch
            .constraints()
            .iter()
            .filter(|c| matches!(c, Constraint::Coincident { .. }))
            .count();
        assert_eq!(coincident, 4);
        for side in rect.sides {
            assert_eq!(sketch.constraints_referencing(side.a).count(), 2);
            assert_eq!(sketch.constraints_referencing(side.b).count(), 2);
        }
    }

    #[test]
    fn fix_captures_current_position() {
        let mut sketch = Sketch::new();
        let p = add_point(&mut sketch, 3.0, -4.0);
        let id = fix(&mut sketch, p).unwrap();
        assert_eq!(
            sketch.find_constraint(id),
            Some(&Constraint::Fix { id, p_id: p, x: 3.0, y: -4.0 })
        );
    }

    #[test]
    fn bad_reference_leaves_sketch_untouched() {
        let mut sketch = Sketch::new();
        let p = add_point(&mut sketch, 0.0, 0.0);
        let circle = add_circle(&mut sketch, 5.0, 5.0, 2.0);
        let next = sketch.peek_next_id();

        let err = distance(&mut sketch, p, GeoId(999), 10.0).unwrap_err();
        assert!(matches!(err, SolverError::UnknownReference { id } if id == GeoId(999)));

        let err = point_on_line(&mut sketch, p, circle.circle).unwrap_err();
        assert!(matches!(err, SolverError::WrongGeometryKind { expected: GeoKind::Segment, .. }));

        assert!(add_segment_from(&mut sketch, circle.circle, 1.0, 1.0).is_err());
        assert!(sketch.constraints().is_empty());
        assert_eq!(sketch.peek_next_id(), next);
    }

    #[test]
    fn segment_from_reuses_the_start_point() {
        let mut sketch = Sketch::new();
        let first = add_segment(&mut sketch, 0.0, 0.0, 1.0, 0.0);
        let second = add_segment_from(&mut sketch, first.b, 1.0, 1.0).unwrap();
        assert_eq!(second.a, first.b);
        assert!(perpendicular(&mut sketch, first.segment, second.segment).is_ok());
        assert!(add_segment_between(&mut sketch, second.b, first.a).is_ok());
    }
}
