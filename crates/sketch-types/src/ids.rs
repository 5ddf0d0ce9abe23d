use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a geometry entity. Unique within a sketch and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoId(pub u32);

/// Identifier of a constraint. Drawn from the same counter as [`GeoId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintId(pub u32);

/// Index of a scalar cell in a sketch's parameter arena.
///
/// The arena is append-only, so a `ParamId` handed out by a sketch stays
/// valid for the lifetime of that sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamId(pub usize);

impl ParamId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for GeoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "geo#{}", self.0)
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constraint#{}", self.0)
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "param#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_integers() {
        let json = serde_json::to_string(&(GeoId(3), ConstraintId(4), ParamId(5))).unwrap();
        assert_eq!(json, "[3,4,5]");
    }

    #[test]
    fn display_names_the_id_space() {
        assert_eq!(GeoId(7).to_string(), "geo#7");
        assert_eq!(ConstraintId(8).to_string(), "constraint#8");
        assert_eq!(ParamId(0).to_string(), "param#0");
    }
}
