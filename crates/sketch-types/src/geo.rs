use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{GeoId, ParamId};

/// Discriminant of [`Geo`], used when resolving untyped references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoKind {
    Point,
    Segment,
    Circle,
}

impl fmt::Display for GeoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeoKind::Point => "point",
            GeoKind::Segment => "segment",
            GeoKind::Circle => "circle",
        };
        f.write_str(name)
    }
}

/// A geometric entity in a sketch.
///
/// Points own their coordinate cells. Segments and circles reference points
/// by id, so moving a point moves every segment or circle built on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "geo", rename_all = "snake_case")]
pub enum Geo {
    Point {
        id: GeoId,
        x: ParamId,
        y: ParamId,
    },
    Segment {
        id: GeoId,
        a_id: GeoId,
        b_id: GeoId,
    },
    Circle {
        id: GeoId,
        c_id: GeoId,
        r: ParamId,
    },
}

impl Geo {
    pub fn id(&self) -> GeoId {
        match self {
            Geo::Point { id, .. } | Geo::Segment { id, .. } | Geo::Circle { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> GeoKind {
        match self {
            Geo::Point { .. } => GeoKind::Point,
            Geo::Segment { .. } => GeoKind::Segment,
            Geo::Circle { .. } => GeoKind::Circle,
        }
    }

    /// Parameter cells owned directly by this entity (not through references).
    pub fn own_params(&self) -> Vec<ParamId> {
        match self {
            Geo::Point { x, y, .. } => vec![*x, *y],
            Geo::Segment { .. } => Vec::new(),
            Geo::Circle { r, .. } => vec![*r],
        }
    }

    /// Other geometry this entity is built on.
    pub fn geo_refs(&self) -> Vec<GeoId> {
        match self {
            Geo::Point { .. } => Vec::new(),
            Geo::Segment { a_id, b_id, .. } => vec![*a_id, *b_id],
            Geo::Circle { c_id, .. } => vec![*c_id],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_is_tagged_by_kind() {
        let geo = Geo::Circle {
            id: GeoId(4),
            c_id: GeoId(1),
            r: ParamId(2),
        };
        let json = serde_json::to_value(&geo).unwrap();
        assert_eq!(json["geo"], "circle");
        assert_eq!(json["c_id"], 1);

        let back: Geo = serde_json::from_value(json).unwrap();
        assert_eq!(back, geo);
        assert_eq!(back.kind(), GeoKind::Circle);
    }

    #[test]
    fn segment_owns_no_params() {
        let seg = Geo::Segment {
            id: GeoId(3),
            a_id: GeoId(1),
            b_id: GeoId(2),
        };
        assert!(seg.own_params().is_empty());
        assert_eq!(seg.geo_refs(), vec![GeoId(1), GeoId(2)]);
    }
}
