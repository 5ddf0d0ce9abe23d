use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sketch_types::{ConstraintId, GeoId, ParamId, Sketch};
use tracing::{debug, info, instrument, warn};

use crate::error::{SolverError, StopReason};
use crate::evaluate::{bind, total_error, BoundConstraint};
use crate::index::GeoIndex;

/// Total error below which a sketch counts as solved. Also the clamp for
/// near-zero denominators in the evaluator.
pub const ERROR_TOLERANCE: f64 = 1e-5;

/// The wall-clock budget is only consulted on iterations divisible by this.
const TIME_CHECK_INTERVAL: usize = 100;

/// Configuration for the damped gradient descent solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveConfig {
    pub iterations_limit: usize,
    /// Yield a [`Snapshot`] on every iteration index divisible by this.
    pub log_divider: Option<usize>,
    pub time_limit: Option<Duration>,
    /// Restore the values held at start when the run fails.
    pub rollback_on_error: bool,
    pub tolerance: f64,
    pub lambda_initial: f64,
    pub lambda_factor: f64,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            iterations_limit: 1_000_000,
            log_divider: None,
            time_limit: None,
            rollback_on_error: true,
            tolerance: ERROR_TOLERANCE,
            lambda_initial: 1e-3,
            lambda_factor: 2.0,
        }
    }
}

/// Progress of a run at the top of an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub error: f64,
    pub lambda: f64,
    pub iteration: usize,
}

/// Result of a converged run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    /// Iteration index at which the error was below tolerance.
    pub iterations: usize,
    pub error: f64,
    pub lambda: f64,
    /// Number of distinct parameter cells the run was allowed to move.
    pub active_params: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    /// Log cadence reached; the run resumes at the same iteration.
    Progress(Snapshot),
    /// The step budget ran out before the next iteration.
    Paused(Snapshot),
    Converged(SolveReport),
}

/// Entry point for solving a sketch. Holds the id index, which must be
/// rebuilt with [`SketchSolver::reindex`] after structural edits.
#[derive(Debug, Clone)]
pub struct SketchSolver {
    index: GeoIndex,
}

impl SketchSolver {
    pub fn new(sketch: &Sketch) -> Self {
        Self {
            index: GeoIndex::build(sketch),
        }
    }

    pub fn reindex(&mut self, sketch: &Sketch) {
        self.index = GeoIndex::build(sketch);
    }

    pub fn needs_reindex(&self, sketch: &Sketch) -> bool {
        self.index.is_stale(sketch)
    }

    pub fn index(&self) -> &GeoIndex {
        &self.index
    }

    /// Constraints attached to a geometry, for presentation.
    pub fn constraints_of(&self, geo: GeoId) -> &[ConstraintId] {
        self.index.constraints_of(geo)
    }

    /// Bind every constraint and set up a resumable run.
    ///
    /// Reference errors surface here, before any parameter is written.
    #[instrument(skip_all, fields(sketch = %sketch.id, constraints = sketch.constraints().len()))]
    pub fn start(&self, sketch: &Sketch, config: SolveConfig) -> Result<SolveRun, SolverError> {
        let constraints = sketch
            .constraints()
            .iter()
            .map(|c| bind(c, &self.index, sketch))
            .collect::<Result<Vec<_>, _>>()?;

        let mut active: Vec<ParamId> = Vec::new();
        for constraint in &constraints {
            for param in constraint.params() {
                if !active.contains(&param) {
                    active.push(param);
                }
            }
        }

        let values = sketch.params().as_slice();
        let error = total_error(&constraints, values);
        let initial = sketch.params().capture(&active);
        debug!(active = active.len(), error, "solve run started");

        Ok(SolveRun {
            lambda: config.lambda_initial,
            backup: initial.clone(),
            grads: vec![0.0; values.len()],
            initial,
            active,
            constraints,
            error,
            iteration: 0,
            logged_at: None,
            started_at: None,
            outcome: None,
            config,
        })
    }

    /// Run to completion in one go.
    pub fn solve(&self, sketch: &mut Sketch, config: SolveConfig) -> Result<SolveReport, SolverError> {
        self.start(sketch, config)?.run_to_end(sketch)
    }
}

/// One resumable solve attempt.
///
/// The run keeps its own bookkeeping and borrows the sketch only inside
/// [`SolveRun::step`], so the sketch can be read between steps. Stepping a
/// run against a sketch other than the one it was started on is a logic
/// error and may panic.
#[derive(Debug)]
pub struct SolveRun {
    config: SolveConfig,
    constraints: Vec<BoundConstraint>,
    active: Vec<ParamId>,
    initial: Vec<f64>,
    backup: Vec<f64>,
    grads: Vec<f64>,
    lambda: f64,
    error: f64,
    iteration: usize,
    /// Iteration whose snapshot was already yielded.
    logged_at: Option<usize>,
    /// Set by the first `step`, so time spent before it is not charged.
    started_at: Option<Instant>,
    outcome: Option<Result<SolveReport, StopReason>>,
}

impl SolveRun {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            error: self.error,
            lambda: self.lambda,
            iteration: self.iteration,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn active_params(&self) -> &[ParamId] {
        &self.active
    }

    /// Advance the run by at most `budget` iterations (unbounded for `None`).
    ///
    /// Returns early at every log cadence point. A failed run rolls back
    /// (when configured) and returns `SolutionNotFound`; stepping a finished
    /// run repeats its outcome without touching the sketch.
    pub fn step(&mut self, sketch: &mut Sketch, budget: Option<usize>) -> Result<StepStatus, SolverError> {
        if let Some(outcome) = &self.outcome {
            return match outcome {
                Ok(report) => Ok(StepStatus::Converged(report.clone())),
                Err(reason) => Err(self.not_found(*reason)),
            };
        }

        let values = sketch.params_mut().as_mut_slice();
        let divider = self.config.log_divider.filter(|d| *d > 0);
        let time_limit = self.config.time_limit.filter(|t| !t.is_zero());
        let started_at = *self.started_at.get_or_insert_with(Instant::now);
        let mut spent = 0usize;

        while self.iteration <= self.config.iterations_limit {
            let i = self.iteration;

            if budget.is_some_and(|b| spent >= b) {
                return Ok(StepStatus::Paused(self.snapshot()));
            }

            if let Some(divider) = divider {
                if i % divider == 0 && self.logged_at != Some(i) {
                    self.logged_at = Some(i);
                    debug!(iteration = i, error = self.error, lambda = self.lambda, "solver progress");
                    return Ok(StepStatus::Progress(self.snapshot()));
                }
            }

            if self.error < self.config.tolerance {
                let report = SolveReport {
                    iterations: i,
                    error: self.error,
                    lambda: self.lambda,
                    active_params: self.active.len(),
                };
                info!(iterations = i, error = self.error, "sketch solved");
                self.outcome = Some(Ok(report.clone()));
                return Ok(StepStatus::Converged(report));
            }

            if self.lambda == 0.0 || self.lambda.is_infinite() {
                return Err(self.fail(values, StopReason::Stuck));
            }

            if let Some(limit) = time_limit {
                if i % TIME_CHECK_INTERVAL == 0 && started_at.elapsed() > limit {
                    return Err(self.fail(values, StopReason::TimeLimit));
                }
            }

            self.iterate(values);
            self.iteration += 1;
            spent += 1;
        }

        Err(self.fail(values, StopReason::IterationLimit))
    }

    /// Step without a budget until the run converges or fails.
    pub fn run_to_end(&mut self, sketch: &mut Sketch) -> Result<SolveReport, SolverError> {
        loop {
            if let StepStatus::Converged(report) = self.step(sketch, None)? {
                return Ok(report);
            }
        }
    }

    /// Abandon the run. Values stay wherever the last accepted step left them.
    pub fn stop(self) {
        debug!(iteration = self.iteration, error = self.error, "solve run stopped");
    }

    fn iterate(&mut self, values: &mut [f64]) {
        for (slot, param) in self.backup.iter_mut().zip(&self.active) {
            *slot = values[param.index()];
        }

        self.grads.fill(0.0);
        for constraint in &self.constraints {
            constraint.accumulate_gradient(values, &mut self.grads);
        }

        for param in &self.active {
            let g = self.grads[param.index()];
            values[param.index()] -= g / (self.lambda + g.abs());
        }

        let step_error = total_error(&self.constraints, values);
        if step_error < self.error {
            self.lambda /= self.config.lambda_factor;
            self.error = step_error;
        } else {
            self.lambda *= self.config.lambda_factor;
            for (value, param) in self.backup.iter().zip(&self.active) {
                values[param.index()] = *value;
            }
        }
    }

    fn fail(&mut self, values: &mut [f64], reason: StopReason) -> SolverError {
        if self.config.rollback_on_error {
            for (value, param) in self.initial.iter().zip(&self.active) {
                values[param.index()] = *value;
            }
        }
        warn!(
            %reason,
            iteration = self.iteration,
            error = self.error,
            lambda = self.lambda,
            rolled_back = self.config.rollback_on_error,
            "solution not found"
        );
        self.outcome = Some(Err(reason));
        self.not_found(reason)
    }

    fn not_found(&self, reason: StopReason) -> SolverError {
        SolverError::SolutionNotFound {
            reason,
            iterations: self.iteration,
            error: self.error,
            lambda: self.lambda,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sketch_types::Constraint;

    fn fixed_point(x: f64, y: f64) -> (Sketch, GeoId) {
        let mut sketch = Sketch::new();
        let p = sketch.insert_point(x, y);
        sketch.insert_constraint(|id| Constraint::Fix { id, p_id: p, x: 10.0, y: 20.0 });
        (sketch, p)
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = SolveConfig::default();
        assert_eq!(config.iterations_limit, 1_000_000);
        assert_eq!(config.log_divider, None);
        assert_eq!(config.time_limit, None);
        assert!(config.rollback_on_error);
        assert_eq!(config.tolerance, 1e-5);
        assert_eq!(config.lambda_initial, 0.001);
        assert_eq!(config.lambda_factor, 2.0);
    }

    #[test]
    fn empty_sketch_converges_immediately() {
        let mut sketch = Sketch::new();
        sketch.insert_point(1.0, 1.0);
        let report = SketchSolver::new(&sketch).solve(&mut sketch, SolveConfig::default()).unwrap();
        assert_eq!(report.iterations, 0);
        assert_eq!(report.active_params, 0);
    }

    #[test]
    fn fix_converges_within_default_tolerance() {
        let (mut sketch, p) = fixed_point(0.0, 0.0);
        let report = SketchSolver::new(&sketch).solve(&mut sketch, SolveConfig::default()).unwrap();
        assert!(report.error < ERROR_TOLERANCE);
        assert!(report.iterations <= 10_000);

        let (x, y) = sketch.point_position(p).unwrap();
        assert_relative_eq!(x, 10.0, epsilon = ERROR_TOLERANCE.sqrt());
        assert_relative_eq!(y, 20.0, epsilon = ERROR_TOLERANCE.sqrt());
    }

    #[test]
    fn log_divider_yields_before_each_checked_iteration() {
        let (mut sketch, _) = fixed_point(0.0, 0.0);
        let solver = SketchSolver::new(&sketch);
        let config = SolveConfig {
            log_divider: Some(10),
            ..Default::default()
        };
        let mut run = solver.start(&sketch, config).unwrap();

        let mut seen = Vec::new();
        let report = loop {
            match run.step(&mut sketch, None).unwrap() {
                StepStatus::Progress(snapshot) => seen.push(snapshot),
                StepStatus::Converged(report) => break report,
                StepStatus::Paused(_) => unreachable!("no budget was given"),
            }
        };

        assert_eq!(seen[0].iteration, 0);
        assert_eq!(seen[0].lambda, 0.001);
        assert_relative_eq!(seen[0].error, 500.0);
        assert!(seen.windows(2).all(|w| w[1].iteration == w[0].iteration + 10));
        assert!(seen.windows(2).all(|w| w[1].error <= w[0].error));
        assert!(seen.last().unwrap().iteration <= report.iterations);
    }

    #[test]
    fn budgeted_steps_resume_where_they_paused() {
        let (mut sketch, _) = fixed_point(0.0, 0.0);
        let solver = SketchSolver::new(&sketch);
        let mut run = solver.start(&sketch, SolveConfig::default()).unwrap();

        match run.step(&mut sketch, Some(5)).unwrap() {
            StepStatus::Paused(snapshot) => assert_eq!(snapshot.iteration, 5),
            other => panic!("expected pause, got {other:?}"),
        }
        let moved = sketch.params().as_slice().to_vec();
        assert_ne!(moved, vec![0.0, 0.0]);

        let report = run.run_to_end(&mut sketch).unwrap();
        assert!(report.iterations > 5);
        assert!(run.is_finished());
        assert!(matches!(run.step(&mut sketch, None), Ok(StepStatus::Converged(_))));
    }

    #[test]
    fn time_limit_counts_from_first_step() {
        let (mut sketch, _) = fixed_point(0.0, 0.0);
        let solver = SketchSolver::new(&sketch);
        let config = SolveConfig {
            time_limit: Some(Duration::from_millis(20)),
            ..SolveConfig::default()
        };
        let mut run = solver.start(&sketch, config).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert!(matches!(run.step(&mut sketch, Some(5)), Ok(StepStatus::Paused(s)) if s.iteration == 5));
        assert!(run.run_to_end(&mut sketch).is_ok());
    }

    #[test]
    fn stop_keeps_current_values() {
        let (mut sketch, p) = fixed_point(0.0, 0.0);
        let solver = SketchSolver::new(&sketch);
        let mut run = solver.start(&sketch, SolveConfig::default()).unwrap();
        run.step(&mut sketch, Some(3)).unwrap();
        let before = sketch.point_position(p);
        run.stop();
        assert_eq!(sketch.point_position(p), before);
        assert_ne!(before, Some((0.0, 0.0)));
    }

    #[test]
    fn iteration_limit_fails_and_rolls_back() {
        let (mut sketch, p) = fixed_point(0.0, 0.0);
        let config = SolveConfig {
            iterations_limit: 10,
            ..Default::default()
        };
        let err = SketchSolver::new(&sketch).solve(&mut sketch, config).unwrap_err();
        assert!(matches!(
            err,
            SolverError::SolutionNotFound { reason: StopReason::IterationLimit, iterations: 11, .. }
        ));
        assert_eq!(sketch.point_position(p), Some((0.0, 0.0)));
    }

    #[test]
    fn failure_without_rollback_leaves_last_values() {
        let (mut sketch, p) = fixed_point(0.0, 0.0);
        let config = SolveConfig {
            iterations_limit: 10,
            rollback_on_error: false,
            ..Default::default()
        };
        let solver = SketchSolver::new(&sketch);
        let mut run = solver.start(&sketch, config).unwrap();
        assert!(run.run_to_end(&mut sketch).is_err());
        assert_ne!(sketch.point_position(p), Some((0.0, 0.0)));

        // A finished run reports again without writing.
        let after = sketch.point_position(p);
        assert!(run.step(&mut sketch, None).is_err());
        assert_eq!(sketch.point_position(p), after);
    }

    #[test]
    fn reindex_tracks_structural_edits() {
        let (mut sketch, _) = fixed_point(0.0, 0.0);
        let mut solver = SketchSolver::new(&sketch);
        assert!(!solver.needs_reindex(&sketch));

        let q = sketch.insert_point(5.0, 5.0);
        sketch.insert_constraint(|id| Constraint::Horizontal { id, a_id: q, b_id: q });
        assert!(solver.needs_reindex(&sketch));
        assert!(solver.start(&sketch, SolveConfig::default()).unwrap_err().is_reference_error());

        solver.reindex(&sketch);
        assert!(!solver.needs_reindex(&sketch));
        assert!(solver.start(&sketch, SolveConfig::default()).is_ok());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = SolveConfig {
            time_limit: Some(Duration::from_millis(250)),
            log_divider: Some(100),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SolveConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);

        let partial: SolveConfig = serde_json::from_str(r#"{"iterations_limit": 50}"#).unwrap();
        assert_eq!(partial.iterations_limit, 50);
        assert!(partial.rollback_on_error);
    }
}
