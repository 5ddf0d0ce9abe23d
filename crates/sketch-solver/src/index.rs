use std::collections::HashMap;

use sketch_types::{ConstraintId, Geo, GeoId, GeoKind, ParamId, Sketch};

use crate::error::SolverError;

/// Check that a looked-up geometry exists and has the expected kind.
///
/// Every typed access to geometry funnels through here; references in the
/// model are plain ids, so this is where their kinds get enforced.
pub fn check_kind(found: Option<&Geo>, id: GeoId, expected: GeoKind) -> Result<&Geo, SolverError> {
    let geo = found.ok_or(SolverError::UnknownReference { id })?;
    if geo.kind() != expected {
        return Err(SolverError::WrongGeometryKind {
            id,
            expected,
            found: geo.kind(),
        });
    }
    Ok(geo)
}

/// Id lookup tables for one revision of a sketch.
///
/// Built by the solver and rebuilt by [`crate::SketchSolver::reindex`] after
/// the sketch gains geometry. Positions into `Sketch::geos()` stay valid
/// across appends, so a stale index only misses newer ids.
#[derive(Debug, Clone, Default)]
pub struct GeoIndex {
    by_id: HashMap<GeoId, usize>,
    constraints_by_geo: HashMap<GeoId, Vec<ConstraintId>>,
    revision: u64,
}

impl GeoIndex {
    pub fn build(sketch: &Sketch) -> Self {
        let mut by_id = HashMap::with_capacity(sketch.geos().len());
        for (position, geo) in sketch.geos().iter().enumerate() {
            by_id.insert(geo.id(), position);
        }

        let mut constraints_by_geo: HashMap<GeoId, Vec<ConstraintId>> = HashMap::new();
        for constraint in sketch.constraints() {
            for geo in constraint.geo_refs() {
                let ids = constraints_by_geo.entry(geo).or_default();
                if !ids.contains(&constraint.id()) {
                    ids.push(constraint.id());
                }
            }
        }

        Self {
            by_id,
            constraints_by_geo,
            revision: sketch.revision(),
        }
    }

    /// True when the sketch has changed structurally since this index was built.
    pub fn is_stale(&self, sketch: &Sketch) -> bool {
        self.revision != sketch.revision()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn resolve<'s>(&self, sketch: &'s Sketch, id: GeoId, kind: GeoKind) -> Result<&'s Geo, SolverError> {
        let found = self.by_id.get(&id).and_then(|pos| sketch.geos().get(*pos));
        check_kind(found, id, kind)
    }

    /// Coordinate cells of a point.
    pub fn point(&self, sketch: &Sketch, id: GeoId) -> Result<[ParamId; 2], SolverError> {
        match self.resolve(sketch, id, GeoKind::Point)? {
            Geo::Point { x, y, .. } => Ok([*x, *y]),
            other => Err(kind_mismatch(other, GeoKind::Point)),
        }
    }

    /// Endpoint cells of a segment: `[ax, ay, bx, by]`.
    pub fn segment(&self, sketch: &Sketch, id: GeoId) -> Result<[ParamId; 4], SolverError> {
        match self.resolve(sketch, id, GeoKind::Segment)? {
            Geo::Segment { a_id, b_id, .. } => {
                let [ax, ay] = self.point(sketch, *a_id)?;
                let [bx, by] = self.point(sketch, *b_id)?;
                Ok([ax, ay, bx, by])
            }
            other => Err(kind_mismatch(other, GeoKind::Segment)),
        }
    }

    /// Center and radius cells of a circle: `[cx, cy, r]`.
    pub fn circle(&self, sketch: &Sketch, id: GeoId) -> Result<[ParamId; 3], SolverError> {
        match self.resolve(sketch, id, GeoKind::Circle)? {
            Geo::Circle { c_id, r, .. } => {
                let [cx, cy] = self.point(sketch, *c_id)?;
                Ok([cx, cy, *r])
            }
            other => Err(kind_mismatch(other, GeoKind::Circle)),
        }
    }

    /// Constraints that reference `id` directly, in declaration order.
    pub fn constraints_of(&self, id: GeoId) -> &[ConstraintId] {
        self.constraints_by_geo
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// Unreachable once `check_kind` has passed; kept so the match stays total.
fn kind_mismatch(geo: &Geo, expected: GeoKind) -> SolverError {
    SolverError::WrongGeometryKind {
        id: geo.id(),
        expected,
        found: geo.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketch_types::Constraint;

    fn sample() -> (Sketch, GeoId, GeoId, GeoId) {
        let mut sketch = Sketch::new();
        let a = sketch.insert_point(0.0, 0.0);
        let b = sketch.insert_point(3.0, 4.0);
        let seg = sketch.insert_segment(a, b);
        (sketch, a, b, seg)
    }

    #[test]
    fn resolves_segment_through_its_points() {
        let (sketch, _, _, seg) = sample();
        let index = GeoIndex::build(&sketch);
        let cells = index.segment(&sketch, seg).unwrap();
        let values: Vec<f64> = cells.iter().map(|p| sketch.value(*p)).collect();
        assert_eq!(values, vec![0.0, 0.0, 3.0, 4.0]);
    }

    #[test]
    fn unknown_id_is_reported() {
        let (sketch, ..) = sample();
        let index = GeoIndex::build(&sketch);
        let err = index.point(&sketch, GeoId(99)).unwrap_err();
        assert!(matches!(err, SolverError::UnknownReference { id } if id == GeoId(99)));
    }

    #[test]
    fn wrong_kind_is_reported() {
        let (sketch, a, _, seg) = sample();
        let index = GeoIndex::build(&sketch);
        let err = index.circle(&sketch, seg).unwrap_err();
        assert!(matches!(
            err,
            SolverError::WrongGeometryKind { expected: GeoKind::Circle, found: GeoKind::Segment, .. }
        ));
        assert!(index.segment(&sketch, a).is_err());
    }

    #[test]
    fn stale_index_misses_new_geometry() {
        let (mut sketch, ..) = sample();
        let index = GeoIndex::build(&sketch);
        let late = sketch.insert_point(1.0, 1.0);

        assert!(index.is_stale(&sketch));
        assert!(index.point(&sketch, late).is_err());
        assert!(GeoIndex::build(&sketch).point(&sketch, late).is_ok());
    }

    #[test]
    fn reverse_lookup_lists_each_constraint_once() {
        let (mut sketch, a, b, _) = sample();
        let c1 = sketch.insert_constraint(|id| Constraint::Coincident { id, a_id: a, b_id: a });
        let c2 = sketch.insert_constraint(|id| Constraint::Horizontal { id, a_id: a, b_id: b });
        let index = GeoIndex::build(&sketch);

        assert_eq!(index.constraints_of(a), &[c1, c2]);
        assert_eq!(index.constraints_of(b), &[c2]);
        assert!(index.constraints_of(GeoId(42)).is_empty());
    }
}
