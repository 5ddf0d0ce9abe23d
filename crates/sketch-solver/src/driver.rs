//! Frame-paced solving for interactive editors.
//!
//! A [`FrameDriver`] owns at most one [`SolveRun`] and advances it from an
//! animation callback. Each tick that falls at least one frame after the
//! previous step runs the solver up to its next log point, so geometry can be
//! redrawn while a long solve is still in flight.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sketch_types::Sketch;
use tracing::debug;

use crate::error::{SolverError, StopReason};
use crate::solver::{SketchSolver, Snapshot, SolveConfig, SolveReport, SolveRun, StepStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Minimum wall-clock gap between two solver steps.
    pub frame_time: Duration,
    pub solve: SolveConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            frame_time: Duration::from_millis(16),
            solve: SolveConfig {
                iterations_limit: 10_000_000,
                log_divider: Some(20_000),
                rollback_on_error: false,
                ..SolveConfig::default()
            },
        }
    }
}

/// Latest progress published for display.
///
/// All zeros when idle or solved; `error` is `-1` after a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SolvingStats {
    pub error: f64,
    pub lambda: f64,
    pub iteration: usize,
}

impl SolvingStats {
    pub fn failed() -> Self {
        Self {
            error: -1.0,
            ..Self::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error < 0.0
    }
}

impl From<Snapshot> for SolvingStats {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            error: snapshot.error,
            lambda: snapshot.lambda,
            iteration: snapshot.iteration,
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverState {
    /// No run, or the frame gap has not elapsed yet.
    Idle,
    Progress(SolvingStats),
    Converged(SolveReport),
    Failed(StopReason),
}

#[derive(Debug, Default)]
pub struct FrameDriver {
    config: DriverConfig,
    run: Option<SolveRun>,
    last_step: Option<Instant>,
    stats: SolvingStats,
}

impl FrameDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn stats(&self) -> SolvingStats {
        self.stats
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Replace any run in flight with a fresh one over the current values.
    pub fn start(&mut self, solver: &SketchSolver, sketch: &Sketch) -> Result<(), SolverError> {
        self.abort();
        self.run = Some(solver.start(sketch, self.config.solve.clone())?);
        Ok(())
    }

    /// Advance the run if a frame has passed since the last step.
    ///
    /// Convergence failures are reported as [`DriverState::Failed`]; the run
    /// is dropped either way once it finishes.
    pub fn tick(&mut self, sketch: &mut Sketch, now: Instant) -> Result<DriverState, SolverError> {
        let Some(run) = self.run.as_mut() else {
            return Ok(DriverState::Idle);
        };
        if let Some(last) = self.last_step {
            if now.saturating_duration_since(last) < self.config.frame_time {
                return Ok(DriverState::Idle);
            }
        }
        self.last_step = Some(now);

        match run.step(sketch, None) {
            Ok(StepStatus::Progress(snapshot)) | Ok(StepStatus::Paused(snapshot)) => {
                self.stats = snapshot.into();
                Ok(DriverState::Progress(self.stats))
            }
            Ok(StepStatus::Converged(report)) => {
                self.finish(SolvingStats::default());
                Ok(DriverState::Converged(report))
            }
            Err(SolverError::SolutionNotFound { reason, .. }) => {
                self.finish(SolvingStats::failed());
                Ok(DriverState::Failed(reason))
            }
            Err(err) => {
                self.finish(SolvingStats::failed());
                Err(err)
            }
        }
    }

    /// Drop the run in flight, leaving values where it last put them.
    pub fn abort(&mut self) {
        if let Some(run) = self.run.take() {
            run.stop();
            debug!("frame driver aborted");
        }
        self.last_step = None;
    }

    fn finish(&mut self, stats: SolvingStats) {
        self.stats = stats;
        self.run = None;
        self.last_step = None;
    }
}
