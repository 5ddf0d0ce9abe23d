//! JSON form of a sketch for the persistence layer.
//!
//! Parameter values, geometry and constraints (with their literal targets)
//! are written as-is. The id counter and revision are rebuilt on load.

use std::collections::HashSet;

use serde_json::Value;
use sketch_types::{ConstraintKind, Sketch};

use crate::error::SolverError;

pub fn encode_sketch(sketch: &Sketch) -> Result<String, SolverError> {
    Ok(serde_json::to_string_pretty(sketch)?)
}

/// Decode a sketch, reporting unknown constraint kinds by name.
///
/// Geometry cells must lie inside the parameter array and ids must be
/// unique across geometry and constraints.
pub fn decode_sketch(json: &str) -> Result<Sketch, SolverError> {
    let value: Value = serde_json::from_str(json)?;

    if let Some(constraints) = value.get("constraints").and_then(Value::as_array) {
        for constraint in constraints {
            if let Some(tag) = constraint.get("constraint").and_then(Value::as_str) {
                if ConstraintKind::from_tag(tag).is_none() {
                    return Err(SolverError::UnsupportedConstraint { tag: tag.to_owned() });
                }
            }
        }
    }

    let sketch: Sketch = serde_json::from_value(value)?;
    check_consistency(&sketch)?;
    Ok(sketch)
}

fn check_consistency(sketch: &Sketch) -> Result<(), SolverError> {
    let malformed = |detail: String| SolverError::MalformedSketch { detail };
    let mut seen = HashSet::new();

    for geo in sketch.geos() {
        if !seen.insert(geo.id().0) {
            return Err(malformed(format!("duplicate id {}", geo.id())));
        }
        if let Some(cell) = geo.own_params().into_iter().find(|p| !sketch.params().contains(*p)) {
            return Err(malformed(format!(
                "{} uses {cell} but only {} params exist",
                geo.id(),
                sketch.params().len()
            )));
        }
    }
    for constraint in sketch.constraints() {
        if !seen.insert(constraint.id().0) {
            return Err(malformed(format!("duplicate id {}", constraint.id())));
        }
    }
    Ok(())
}
