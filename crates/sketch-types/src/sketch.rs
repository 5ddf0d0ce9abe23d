use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constraint::Constraint;
use crate::geo::Geo;
use crate::ids::{ConstraintId, GeoId, ParamId};
use crate::param::ParamArena;

/// A 2D sketch: parameter cells, geometry built on them, and constraints.
///
/// Append-only while editing. Ids come from one counter shared by geometry
/// and constraints and are never reused. The solver only writes parameter
/// values; structure is changed through the builder layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "SketchRecord", into = "SketchRecord")]
pub struct Sketch {
    /// Document identity.
    pub id: Uuid,
    params: ParamArena,
    geos: Vec<Geo>,
    constraints: Vec<Constraint>,
    next_id: u32,
    revision: u64,
}

/// Persisted form of a [`Sketch`]: everything but the id counter and the
/// structural revision, both of which are rebuilt on load.
#[derive(Serialize, Deserialize)]
struct SketchRecord {
    id: Uuid,
    params: ParamArena,
    geos: Vec<Geo>,
    constraints: Vec<Constraint>,
}

impl From<SketchRecord> for Sketch {
    fn from(record: SketchRecord) -> Self {
        let max_id = record
            .geos
            .iter()
            .map(|g| g.id().0)
            .chain(record.constraints.iter().map(|c| c.id().0))
            .max()
            .unwrap_or(0);
        Sketch {
            id: record.id,
            params: record.params,
            geos: record.geos,
            constraints: record.constraints,
            next_id: max_id + 1,
            revision: 0,
        }
    }
}

impl From<Sketch> for SketchRecord {
    fn from(sketch: Sketch) -> Self {
        SketchRecord {
            id: sketch.id,
            params: sketch.params,
            geos: sketch.geos,
            constraints: sketch.constraints,
        }
    }
}

impl Default for Sketch {
    fn default() -> Self {
        Self::new()
    }
}

impl Sketch {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            params: ParamArena::new(),
            geos: Vec::new(),
            constraints: Vec::new(),
            next_id: 1,
            revision: 0,
        }
    }

    fn take_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.revision += 1;
        id
    }

    /// Add a free point. Points reference nothing, so this cannot fail.
    pub fn insert_point(&mut self, x: f64, y: f64) -> GeoId {
        let x = self.params.alloc(x);
        let y = self.params.alloc(y);
        let id = GeoId(self.take_id());
        self.geos.push(Geo::Point { id, x, y });
        id
    }

    /// Add a segment between two existing points.
    ///
    /// Endpoints are not checked here; the builder layer resolves them first.
    pub fn insert_segment(&mut self, a_id: GeoId, b_id: GeoId) -> GeoId {
        let id = GeoId(self.take_id());
        self.geos.push(Geo::Segment { id, a_id, b_id });
        id
    }

    /// Add a circle around an existing center point. Unchecked, like
    /// [`Sketch::insert_segment`].
    pub fn insert_circle(&mut self, c_id: GeoId, r: f64) -> GeoId {
        let r = self.params.alloc(r);
        let id = GeoId(self.take_id());
        self.geos.push(Geo::Circle { id, c_id, r });
        id
    }

    /// Append a constraint built around a freshly allocated id.
    pub fn insert_constraint(&mut self, build: impl FnOnce(ConstraintId) -> Constraint) -> ConstraintId {
        let id = ConstraintId(self.take_id());
        self.constraints.push(build(id));
        id
    }

    pub fn geos(&self) -> &[Geo] {
        &self.geos
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn params(&self) -> &ParamArena {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParamArena {
        &mut self.params
    }

    /// Current value of a parameter cell.
    pub fn value(&self, param: ParamId) -> f64 {
        self.params.get(param)
    }

    pub fn set_value(&mut self, param: ParamId, value: f64) {
        self.params.set(param, value);
    }

    /// Linear lookup by id.
    pub fn find_geo(&self, id: GeoId) -> Option<&Geo> {
        self.geos.iter().find(|g| g.id() == id)
    }

    pub fn find_constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.id() == id)
    }

    /// Current position of a point, or `None` if `id` is not a point.
    pub fn point_position(&self, id: GeoId) -> Option<(f64, f64)> {
        match self.find_geo(id)? {
            Geo::Point { x, y, .. } => Some((self.value(*x), self.value(*y))),
            _ => None,
        }
    }

    /// Move a point by writing its cells directly, as a drag would.
    pub fn move_point(&mut self, id: GeoId, x: f64, y: f64) -> bool {
        let Some(Geo::Point { x: px, y: py, .. }) = self.find_geo(id).cloned() else {
            return false;
        };
        self.params.set(px, x);
        self.params.set(py, y);
        true
    }

    /// Constraints that reference `geo` directly, in declaration order.
    pub fn constraints_referencing(&self, geo: GeoId) -> impl Iterator<Item = &Constraint> + '_ {
        self.constraints.iter().filter(move |c| c.references(geo))
    }

    /// Bumped on every structural append; not persisted.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Id the next appended entity will receive.
    pub fn peek_next_id(&self) -> u32 {
        self.next_id
    }
}
