//! Helper functions: error type, tracing setup, fixture sketches.

use std::collections::HashMap;

use sketch_solver::builder;
use sketch_solver::{CircleParts, GeoId, Geo, Rect, SegmentParts, Sketch, SolverError};
use tracing_subscriber::EnvFilter;

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("unknown name: {name}")]
    UnknownName { name: String },

    #[error("duplicate name: {name}")]
    DuplicateName { name: String },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("oracle failure ({oracle}): {detail}")]
    OracleFailure { oracle: String, detail: String },

    #[error("solver error: {0}")]
    Solver(#[from] SolverError),
}

// ── Tracing ─────────────────────────────────────────────────────────────────

/// Install a test-friendly `fmt` subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to warnings from the solver crates.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sketch_solver=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ── Fixtures ────────────────────────────────────────────────────────────────

/// Handles into the demo sketch built by [`sample_sketch`].
#[derive(Debug, Clone)]
pub struct SampleSketch {
    pub sketch: Sketch,
    /// Point pinned at the origin.
    pub origin: GeoId,
    pub rect: Rect,
    /// Circle whose center is tied to the rectangle's far corner.
    pub circle: CircleParts,
    /// Point on `circle`, also the start of `arm`.
    pub rim: GeoId,
    pub arm: SegmentParts,
    /// Second circle centered on the far end of `arm`.
    pub end_circle: CircleParts,
}

/// Demo sketch used by the editor on startup.
///
/// A rectangle anchored at the origin, a circle of radius 40 hanging off its
/// far corner, and a 150-long arm from that circle to a line through the
/// rectangle's second corner. Far from solved as built.
pub fn sample_sketch() -> Result<SampleSketch, SolverError> {
    let mut sketch = Sketch::new();

    let origin = builder::add_point(&mut sketch, 0.0, 0.0);
    builder::fix(&mut sketch, origin)?;

    let rect = builder::add_rect(&mut sketch, 10.0, 10.0, 80.0, 120.0);
    builder::coincident(&mut sketch, origin, rect.sides[0].a)?;

    let circle = builder::add_circle(&mut sketch, -200.0, -200.0, 10.0);
    builder::radius(&mut sketch, circle.circle, 40.0)?;
    builder::coincident(&mut sketch, circle.center, rect.sides[1].b)?;

    let rim = builder::add_point(&mut sketch, 100.0, -100.0);
    builder::point_on_circle(&mut sketch, rim, circle.circle)?;

    let arm = builder::add_segment(&mut sketch, 0.0, 100.0, 100.0, 100.0);
    builder::distance(&mut sketch, arm.a, arm.b, 150.0)?;
    builder::coincident(&mut sketch, rim, arm.a)?;
    builder::point_on_line(&mut sketch, rect.sides[0].b, arm.segment)?;

    // Without this the solve settles in a local minimum.
    let end_circle = builder::add_circle(&mut sketch, -200.0, -200.0, 10.0);
    builder::coincident(&mut sketch, end_circle.center, arm.b)?;

    Ok(SampleSketch {
        sketch,
        origin,
        rect,
        circle,
        rim,
        arm,
        end_circle,
    })
}

// ── Geometry Readers ────────────────────────────────────────────────────────

/// Current position of every point in the sketch.
pub fn point_positions(sketch: &Sketch) -> HashMap<GeoId, (f64, f64)> {
    sketch
        .geos()
        .iter()
        .filter_map(|geo| match geo {
            Geo::Point { id, x, y } => Some((*id, (sketch.value(*x), sketch.value(*y)))),
            _ => None,
        })
        .collect()
}

/// Largest absolute coordinate change between two snapshots of the same sketch.
pub fn max_param_shift(before: &[f64], after: &[f64]) -> f64 {
    before
        .iter()
        .zip(after)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}
