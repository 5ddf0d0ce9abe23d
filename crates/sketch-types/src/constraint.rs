use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{ConstraintId, GeoId};

/// A relation between sketch geometry, optionally with a literal target.
///
/// References are untyped [`GeoId`]s; the solver checks their kinds when it
/// binds a constraint to parameter cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "constraint", rename_all = "snake_case")]
pub enum Constraint {
    /// Point held at an absolute location.
    Fix {
        id: ConstraintId,
        p_id: GeoId,
        x: f64,
        y: f64,
    },
    /// Euclidean distance between two points.
    Distance {
        id: ConstraintId,
        a_id: GeoId,
        b_id: GeoId,
        d: f64,
    },
    Coincident {
        id: ConstraintId,
        a_id: GeoId,
        b_id: GeoId,
    },
    /// Point lies on the infinite line through a segment.
    PointOnLine {
        id: ConstraintId,
        p_id: GeoId,
        l_id: GeoId,
    },
    PointOnCircle {
        id: ConstraintId,
        p_id: GeoId,
        c_id: GeoId,
    },
    Radius {
        id: ConstraintId,
        c_id: GeoId,
        r: f64,
    },
    Perpendicular {
        id: ConstraintId,
        a_id: GeoId,
        b_id: GeoId,
    },
    Parallel {
        id: ConstraintId,
        a_id: GeoId,
        b_id: GeoId,
    },
    /// Two points share the same x.
    Vertical {
        id: ConstraintId,
        a_id: GeoId,
        b_id: GeoId,
    },
    /// Two points share the same y.
    Horizontal {
        id: ConstraintId,
        a_id: GeoId,
        b_id: GeoId,
    },
    /// Angle between two segment directions, in degrees.
    Angle {
        id: ConstraintId,
        a_id: GeoId,
        b_id: GeoId,
        degrees: f64,
    },
}

/// Discriminant of [`Constraint`]. `tag()` matches the serialized name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Fix,
    Distance,
    Coincident,
    PointOnLine,
    PointOnCircle,
    Radius,
    Perpendicular,
    Parallel,
    Vertical,
    Horizontal,
    Angle,
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 11] = [
        ConstraintKind::Fix,
        ConstraintKind::Distance,
        ConstraintKind::Coincident,
        ConstraintKind::PointOnLine,
        ConstraintKind::PointOnCircle,
        ConstraintKind::Radius,
        ConstraintKind::Perpendicular,
        ConstraintKind::Parallel,
        ConstraintKind::Vertical,
        ConstraintKind::Horizontal,
        ConstraintKind::Angle,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ConstraintKind::Fix => "fix",
            ConstraintKind::Distance => "distance",
            ConstraintKind::Coincident => "coincident",
            ConstraintKind::PointOnLine => "point_on_line",
            ConstraintKind::PointOnCircle => "point_on_circle",
            ConstraintKind::Radius => "radius",
            ConstraintKind::Perpendicular => "perpendicular",
            ConstraintKind::Parallel => "parallel",
            ConstraintKind::Vertical => "vertical",
            ConstraintKind::Horizontal => "horizontal",
            ConstraintKind::Angle => "angle",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Constraint {
    pub fn id(&self) -> ConstraintId {
        match self {
            Constraint::Fix { id, .. }
            | Constraint::Distance { id, .. }
            | Constraint::Coincident { id, .. }
            | Constraint::PointOnLine { id, .. }
            | Constraint::PointOnCircle { id, .. }
            | Constraint::Radius { id, .. }
            | Constraint::Perpendicular { id, .. }
            | Constraint::Parallel { id, .. }
            | Constraint::Vertical { id, .. }
            | Constraint::Horizontal { id, .. }
            | Constraint::Angle { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> ConstraintKind {
        match self {
            Constraint::Fix { .. } => ConstraintKind::Fix,
            Constraint::Distance { .. } => ConstraintKind::Distance,
            Constraint::Coincident { .. } => ConstraintKind::Coincident,
            Constraint::PointOnLine { .. } => ConstraintKind::PointOnLine,
            Constraint::PointOnCircle { .. } => ConstraintKind::PointOnCircle,
            Constraint::Radius { .. } => ConstraintKind::Radius,
            Constraint::Perpendicular { .. } => ConstraintKind::Perpendicular,
            Constraint::Parallel { .. } => ConstraintKind::Parallel,
            Constraint::Vertical { .. } => ConstraintKind::Vertical,
            Constraint::Horizontal { .. } => ConstraintKind::Horizontal,
            Constraint::Angle { .. } => ConstraintKind::Angle,
        }
    }

    /// Geometry ids referenced directly by this constraint, in field order.
    pub fn geo_refs(&self) -> Vec<GeoId> {
        match self {
            Constraint::Fix { p_id, .. } => vec![*p_id],
            Constraint::Radius { c_id, .. } => vec![*c_id],
            Constraint::PointOnLine { p_id, l_id, .. } => vec![*p_id, *l_id],
            Constraint::PointOnCircle { p_id, c_id, .. } => vec![*p_id, *c_id],
            Constraint::Distance { a_id, b_id, .. }
            | Constraint::Coincident { a_id, b_id, .. }
            | Constraint::Perpendicular { a_id, b_id, .. }
            | Constraint::Parallel { a_id, b_id, .. }
            | Constraint::Vertical { a_id, b_id, .. }
            | Constraint::Horizontal { a_id, b_id, .. }
            | Constraint::Angle { a_id, b_id, .. } => vec![*a_id, *b_id],
        }
    }

    pub fn references(&self, geo: GeoId) -> bool {
        self.geo_refs().contains(&geo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_match_serialized_names() {
        let constraint = Constraint::PointOnCircle {
            id: ConstraintId(9),
            p_id: GeoId(1),
            c_id: GeoId(2),
        };
        let json = serde_json::to_value(&constraint).unwrap();
        assert_eq!(json["constraint"], constraint.kind().tag());
    }

    #[test]
    fn from_tag_covers_every_kind() {
        for kind in ConstraintKind::ALL {
            assert_eq!(ConstraintKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ConstraintKind::from_tag("tangent"), None);
    }

    #[test]
    fn angle_keeps_its_literal_target() {
        let json = r#"{"constraint":"angle","id":5,"a_id":1,"b_id":2,"degrees":30.0}"#;
        let constraint: Constraint = serde_json::from_str(json).unwrap();
        match &constraint {
            Constraint::Angle { degrees, .. } => assert_eq!(*degrees, 30.0),
            other => panic!("expected angle, got {other:?}"),
        }
        assert!(constraint.references(GeoId(2)));
        assert!(!constraint.references(GeoId(3)));
    }
}
