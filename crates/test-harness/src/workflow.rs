//! SketchWorkbench: fluent API for scripting sketch edits in tests.
//!
//! Geometry is addressed by string names instead of ids for readability.
//! Composite builders register their parts under dotted names: a segment
//! `s` also registers `s.a` and `s.b` (for a segment continuing from a named
//! point, `s.a` aliases that point), a circle `c` registers `c.center`, and
//! a rectangle `r` registers `r.0` through `r.3` with their endpoints.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use sketch_solver::builder;
use sketch_solver::codec;
use sketch_solver::{
    ConstraintId, DriverConfig, DriverState, FrameDriver, GeoId, Rect, SegmentParts, Sketch, SketchSolver,
    SolveConfig, SolveReport, SolverError,
};
use tracing::debug;

use crate::helpers::HarnessError;
use crate::oracle::{self, OracleVerdict};
use crate::report::SketchReport;

/// A named-geometry wrapper around a [`Sketch`] and its solver.
pub struct SketchWorkbench {
    sketch: Sketch,
    solver: SketchSolver,
    names: HashMap<String, GeoId>,
    rects: HashMap<String, Rect>,
    history: Vec<String>,
}

impl Default for SketchWorkbench {
    fn default() -> Self {
        Self::new()
    }
}

impl SketchWorkbench {
    pub fn new() -> Self {
        Self::from_sketch(Sketch::new())
    }

    /// Wrap an existing sketch. Its geometry has no names until [`Self::name`] is used.
    pub fn from_sketch(sketch: Sketch) -> Self {
        let solver = SketchSolver::new(&sketch);
        Self {
            sketch,
            solver,
            names: HashMap::new(),
            rects: HashMap::new(),
            history: Vec::new(),
        }
    }

    fn check_name_available(&self, name: &str) -> Result<(), HarnessError> {
        if self.names.contains_key(name) {
            return Err(HarnessError::DuplicateName { name: name.to_string() });
        }
        Ok(())
    }

    fn register(&mut self, name: &str, id: GeoId) {
        self.names.insert(name.to_string(), id);
    }

    fn register_segment(&mut self, name: &str, parts: SegmentParts) {
        self.register(name, parts.segment);
        self.register(&format!("{name}.a"), parts.a);
        self.register(&format!("{name}.b"), parts.b);
    }

    fn record(&mut self, action: String) {
        debug!(%action, "workbench");
        self.history.push(action);
    }

    // ── Geometry ────────────────────────────────────────────────────────

    /// Attach a name to existing geometry.
    pub fn name(&mut self, name: &str, id: GeoId) -> Result<&mut Self, HarnessError> {
        self.check_name_available(name)?;
        self.register(name, id);
        Ok(self)
    }

    pub fn point(&mut self, name: &str, x: f64, y: f64) -> Result<GeoId, HarnessError> {
        self.check_name_available(name)?;
        let id = builder::add_point(&mut self.sketch, x, y);
        self.register(name, id);
        self.record(format!("point {name} ({x}, {y})"));
        Ok(id)
    }

    pub fn segment(&mut self, name: &str, ax: f64, ay: f64, bx: f64, by: f64) -> Result<SegmentParts, HarnessError> {
        self.check_name_available(name)?;
        let parts = builder::add_segment(&mut self.sketch, ax, ay, bx, by);
        self.register_segment(name, parts);
        self.record(format!("segment {name} ({ax}, {ay}) -> ({bx}, {by})"));
        Ok(parts)
    }

    /// Segment continuing from a named point.
    pub fn segment_from(&mut self, name: &str, from: &str, bx: f64, by: f64) -> Result<SegmentParts, HarnessError> {
        self.check_name_available(name)?;
        let a = self.geo(from)?;
        let parts = builder::add_segment_from(&mut self.sketch, a, bx, by)?;
        self.register(name, parts.segment);
        self.register(&format!("{name}.b"), parts.b);
        let start = format!("{name}.a");
        if !self.names.contains_key(&start) {
            self.register(&start, a);
        }
        self.record(format!("segment {name} {from} -> ({bx}, {by})"));
        Ok(parts)
    }

    pub fn circle(&mut self, name: &str, cx: f64, cy: f64, r: f64) -> Result<GeoId, HarnessError> {
        self.check_name_available(name)?;
        let parts = builder::add_circle(&mut self.sketch, cx, cy, r);
        self.register(name, parts.circle);
        self.register(&format!("{name}.center"), parts.center);
        self.record(format!("circle {name} ({cx}, {cy}) r={r}"));
        Ok(parts.circle)
    }

    pub fn rect(&mut self, name: &str, ax: f64, ay: f64, bx: f64, by: f64) -> Result<Rect, HarnessError> {
        self.check_name_available(name)?;
        let rect = builder::add_rect(&mut self.sketch, ax, ay, bx, by);
        for (i, side) in rect.sides.iter().enumerate() {
            self.register_segment(&format!("{name}.{i}"), *side);
        }
        self.rects.insert(name.to_string(), rect.clone());
        self.record(format!("rect {name} ({ax}, {ay}) / ({bx}, {by})"));
        Ok(rect)
    }

    /// Move a named point, as a pointer drag would.
    pub fn drag(&mut self, name: &str, x: f64, y: f64) -> Result<&mut Self, HarnessError> {
        let id = self.geo(name)?;
        if !self.sketch.move_point(id, x, y) {
            return Err(HarnessError::AssertionFailed {
                detail: format!("cannot drag {name}: not a point"),
            });
        }
        self.record(format!("drag {name} -> ({x}, {y})"));
        Ok(self)
    }

    // ── Constraints ─────────────────────────────────────────────────────

    fn constrained(&mut self, label: String, result: Result<ConstraintId, SolverError>) -> Result<ConstraintId, HarnessError> {
        let id = result?;
        self.record(label);
        Ok(id)
    }

    pub fn fix(&mut self, p: &str) -> Result<ConstraintId, HarnessError> {
        let id = self.geo(p)?;
        let result = builder::fix(&mut self.sketch, id);
        self.constrained(format!("fix {p}"), result)
    }

    pub fn fix_at(&mut self, p: &str, x: f64, y: f64) -> Result<ConstraintId, HarnessError> {
        let id = self.geo(p)?;
        let result = builder::fix_at(&mut self.sketch, id, x, y);
        self.constrained(format!("fix {p} at ({x}, {y})"), result)
    }

    pub fn distance(&mut self, a: &str, b: &str, d: f64) -> Result<ConstraintId, HarnessError> {
        let (ia, ib) = (self.geo(a)?, self.geo(b)?);
        let result = builder::distance(&mut self.sketch, ia, ib, d);
        self.constrained(format!("distance {a} {b} = {d}"), result)
    }

    pub fn coincident(&mut self, a: &str, b: &str) -> Result<ConstraintId, HarnessError> {
        let (ia, ib) = (self.geo(a)?, self.geo(b)?);
        let result = builder::coincident(&mut self.sketch, ia, ib);
        self.constrained(format!("coincident {a} {b}"), result)
    }

    pub fn point_on_line(&mut self, p: &str, line: &str) -> Result<ConstraintId, HarnessError> {
        let (ip, il) = (self.geo(p)?, self.geo(line)?);
        let result = builder::point_on_line(&mut self.sketch, ip, il);
        self.constrained(format!("point_on_line {p} {line}"), result)
    }

    pub fn point_on_circle(&mut self, p: &str, circle: &str) -> Result<ConstraintId, HarnessError> {
        let (ip, ic) = (self.geo(p)?, self.geo(circle)?);
        let result = builder::point_on_circle(&mut self.sketch, ip, ic);
        self.constrained(format!("point_on_circle {p} {circle}"), result)
    }

    pub fn radius(&mut self, circle: &str, r: f64) -> Result<ConstraintId, HarnessError> {
        let id = self.geo(circle)?;
        let result = builder::radius(&mut self.sketch, id, r);
        self.constrained(format!("radius {circle} = {r}"), result)
    }

    pub fn perpendicular(&mut self, a: &str, b: &str) -> Result<ConstraintId, HarnessError> {
        let (ia, ib) = (self.geo(a)?, self.geo(b)?);
        let result = builder::perpendicular(&mut self.sketch, ia, ib);
        self.constrained(format!("perpendicular {a} {b}"), result)
    }

    pub fn parallel(&mut self, a: &str, b: &str) -> Result<ConstraintId, HarnessError> {
        let (ia, ib) = (self.geo(a)?, self.geo(b)?);
        let result = builder::parallel(&mut self.sketch, ia, ib);
        self.constrained(format!("parallel {a} {b}"), result)
    }

    pub fn horizontal(&mut self, a: &str, b: &str) -> Result<ConstraintId, HarnessError> {
        let (ia, ib) = (self.geo(a)?, self.geo(b)?);
        let result = builder::horizontal(&mut self.sketch, ia, ib);
        self.constrained(format!("horizontal {a} {b}"), result)
    }

    pub fn vertical(&mut self, a: &str, b: &str) -> Result<ConstraintId, HarnessError> {
        let (ia, ib) = (self.geo(a)?, self.geo(b)?);
        let result = builder::vertical(&mut self.sketch, ia, ib);
        self.constrained(format!("vertical {a} {b}"), result)
    }

    pub fn angle(&mut self, a: &str, b: &str, degrees: f64) -> Result<ConstraintId, HarnessError> {
        let (ia, ib) = (self.geo(a)?, self.geo(b)?);
        let result = builder::angle(&mut self.sketch, ia, ib, degrees);
        self.constrained(format!("angle {a} {b} = {degrees}"), result)
    }

    // ── Solving ─────────────────────────────────────────────────────────

    fn refresh_index(&mut self) {
        if self.solver.needs_reindex(&self.sketch) {
            self.solver.reindex(&self.sketch);
        }
    }

    pub fn solve(&mut self) -> Result<SolveReport, SolverError> {
        self.solve_with(SolveConfig::default())
    }

    pub fn solve_with(&mut self, config: SolveConfig) -> Result<SolveReport, SolverError> {
        self.refresh_index();
        let result = self.solver.solve(&mut self.sketch, config);
        self.record(match &result {
            Ok(report) => format!("solve: converged at {}", report.iterations),
            Err(err) => format!("solve: {err}"),
        });
        result
    }

    /// Drive a solve through a [`FrameDriver`] with a simulated clock, one
    /// frame per tick, until it finishes or `max_frames` elapse.
    ///
    /// Returns every state the driver reported, in order.
    pub fn solve_frames(&mut self, config: DriverConfig, max_frames: usize) -> Result<Vec<DriverState>, SolverError> {
        self.refresh_index();
        let frame = config.frame_time;
        let mut driver = FrameDriver::new(config);
        driver.start(&self.solver, &self.sketch)?;

        let mut now = Instant::now();
        let mut states = Vec::new();
        for _ in 0..max_frames {
            let state = driver.tick(&mut self.sketch, now)?;
            let done = matches!(state, DriverState::Converged(_) | DriverState::Failed(_));
            states.push(state);
            if done {
                break;
            }
            now += frame.max(Duration::from_millis(1));
        }
        driver.abort();
        self.record(format!("solve_frames: {} frames", states.len()));
        Ok(states)
    }

    // ── Query ───────────────────────────────────────────────────────────

    pub fn geo(&self, name: &str) -> Result<GeoId, HarnessError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::UnknownName { name: name.to_string() })
    }

    pub fn position(&self, name: &str) -> Result<(f64, f64), HarnessError> {
        let id = self.geo(name)?;
        self.sketch
            .point_position(id)
            .ok_or_else(|| HarnessError::AssertionFailed {
                detail: format!("{name} is not a point"),
            })
    }

    pub fn rect_parts(&self, name: &str) -> Result<&Rect, HarnessError> {
        self.rects
            .get(name)
            .ok_or_else(|| HarnessError::UnknownName { name: name.to_string() })
    }

    pub fn sketch(&self) -> &Sketch {
        &self.sketch
    }

    pub fn sketch_mut(&mut self) -> &mut Sketch {
        &mut self.sketch
    }

    pub fn solver(&self) -> &SketchSolver {
        &self.solver
    }

    /// Constraints attached to a named geometry.
    pub fn constraints_of(&mut self, name: &str) -> Result<Vec<ConstraintId>, HarnessError> {
        let id = self.geo(name)?;
        self.refresh_index();
        Ok(self.solver.constraints_of(id).to_vec())
    }

    /// Human-readable log of every operation applied.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    // ── Persistence ─────────────────────────────────────────────────────

    pub fn save(&self) -> Result<String, HarnessError> {
        Ok(codec::encode_sketch(&self.sketch)?)
    }

    /// Replace the sketch with a decoded one. Names are kept; they still
    /// resolve when the document came from [`Self::save`].
    pub fn load(&mut self, json: &str) -> Result<&mut Self, HarnessError> {
        self.sketch = codec::decode_sketch(json)?;
        self.solver = SketchSolver::new(&self.sketch);
        self.record("load".to_string());
        Ok(self)
    }

    // ── Verification ────────────────────────────────────────────────────

    pub fn check_solved(&self, tol: f64) -> Vec<OracleVerdict> {
        oracle::check_solved_sketch(&self.sketch, tol)
    }

    pub fn check_rect(&self, name: &str, tol: f64) -> Result<OracleVerdict, HarnessError> {
        Ok(oracle::check_rect_closed(&self.sketch, self.rect_parts(name)?, tol))
    }

    pub fn assert_solved(&self, tol: f64) -> Result<&Self, HarnessError> {
        for verdict in self.check_solved(tol) {
            if !verdict.passed {
                return Err(HarnessError::OracleFailure {
                    oracle: verdict.oracle_name,
                    detail: verdict.detail,
                });
            }
        }
        Ok(self)
    }

    pub fn report(&self) -> Result<SketchReport, HarnessError> {
        Ok(SketchReport::from_sketch(&self.sketch)?.with_oracles(vec![
            oracle::check_references(&self.sketch),
            oracle::check_finite_params(&self.sketch),
        ]))
    }
}
