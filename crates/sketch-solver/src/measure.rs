//! Read-only measurements of current geometry, for inspection panels.

use nalgebra::{Point2, Vector2};
use sketch_types::{GeoId, Sketch};

use crate::error::SolverError;
use crate::index::GeoIndex;

pub fn point(index: &GeoIndex, sketch: &Sketch, id: GeoId) -> Result<Point2<f64>, SolverError> {
    let [x, y] = index.point(sketch, id)?;
    Ok(Point2::new(sketch.value(x), sketch.value(y)))
}

fn segment_vector(index: &GeoIndex, sketch: &Sketch, id: GeoId) -> Result<Vector2<f64>, SolverError> {
    let [ax, ay, bx, by] = index.segment(sketch, id)?;
    Ok(Vector2::new(sketch.value(bx) - sketch.value(ax), sketch.value(by) - sketch.value(ay)))
}

pub fn segment_length(index: &GeoIndex, sketch: &Sketch, id: GeoId) -> Result<f64, SolverError> {
    Ok(segment_vector(index, sketch, id)?.norm())
}

pub fn circle_radius(index: &GeoIndex, sketch: &Sketch, id: GeoId) -> Result<f64, SolverError> {
    let [_, _, r] = index.circle(sketch, id)?;
    Ok(sketch.value(r))
}

pub fn point_distance(index: &GeoIndex, sketch: &Sketch, a: GeoId, b: GeoId) -> Result<f64, SolverError> {
    Ok(nalgebra::distance(&point(index, sketch, a)?, &point(index, sketch, b)?))
}

/// Unsigned angle between two segment directions, in `[0, 180]` degrees.
///
/// `None` when either segment has zero length.
pub fn segment_angle_degrees(index: &GeoIndex, sketch: &Sketch, a: GeoId, b: GeoId) -> Result<Option<f64>, SolverError> {
    let v1 = segment_vector(index, sketch, a)?;
    let v2 = segment_vector(index, sketch, b)?;
    if v1.norm() == 0.0 || v2.norm() == 0.0 {
        return Ok(None);
    }
    Ok(Some(v1.angle(&v2).to_degrees()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use approx::assert_relative_eq;

    #[test]
    fn reads_lengths_and_radii() {
        let mut sketch = Sketch::new();
        let seg = builder::add_segment(&mut sketch, 0.0, 0.0, 3.0, 4.0);
        let circle = builder::add_circle(&mut sketch, 1.0, 1.0, 2.5);
        let index = GeoIndex::build(&sketch);

        assert_relative_eq!(segment_length(&index, &sketch, seg.segment).unwrap(), 5.0);
        assert_relative_eq!(point_distance(&index, &sketch, seg.a, seg.b).unwrap(), 5.0);
        assert_relative_eq!(circle_radius(&index, &sketch, circle.circle).unwrap(), 2.5);
        assert!(circle_radius(&index, &sketch, seg.segment).is_err());
    }

    #[test]
    fn angle_between_segments() {
        let mut sketch = Sketch::new();
        let s1 = builder::add_segment(&mut sketch, 0.0, 0.0, 1.0, 0.0);
        let s2 = builder::add_segment(&mut sketch, 0.0, 0.0, -1.0, 1.0);
        let empty = builder::add_segment(&mut sketch, 2.0, 2.0, 2.0, 2.0);
        let index = GeoIndex::build(&sketch);

        let angle = segment_angle_degrees(&index, &sketch, s1.segment, s2.segment).unwrap();
        assert_relative_eq!(angle.unwrap(), 135.0, epsilon = 1e-9);
        assert_eq!(segment_angle_degrees(&index, &sketch, s1.segment, empty.segment).unwrap(), None);
    }
}
