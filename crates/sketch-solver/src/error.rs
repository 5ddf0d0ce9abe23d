use std::fmt;

use sketch_types::{GeoId, GeoKind};
use thiserror::Error;

/// Why a run gave up before reaching the error tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `lambda` collapsed to zero or overflowed to infinity.
    Stuck,
    IterationLimit,
    TimeLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StopReason::Stuck => "damping factor stuck",
            StopReason::IterationLimit => "iteration limit reached",
            StopReason::TimeLimit => "time limit reached",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Error)]
pub enum SolverError {
    /// A constraint or geometry points at an id that does not exist.
    #[error("unknown geometry reference {id}")]
    UnknownReference { id: GeoId },

    #[error("{id} is a {found}, expected a {expected}")]
    WrongGeometryKind {
        id: GeoId,
        expected: GeoKind,
        found: GeoKind,
    },

    #[error("unsupported constraint kind: {tag}")]
    UnsupportedConstraint { tag: String },

    #[error("solution not found after {iterations} iterations ({reason}, error {error:e}, lambda {lambda:e})")]
    SolutionNotFound {
        reason: StopReason,
        iterations: usize,
        error: f64,
        lambda: f64,
    },

    #[error("malformed sketch document: {0}")]
    Decode(#[from] serde_json::Error),

    /// A document that parsed but does not describe a consistent sketch.
    #[error("malformed sketch document: {detail}")]
    MalformedSketch { detail: String },
}

impl SolverError {
    /// Reference and kind errors mean the sketch itself is malformed.
    pub fn is_reference_error(&self) -> bool {
        matches!(
            self,
            SolverError::UnknownReference { .. } | SolverError::WrongGeometryKind { .. }
        )
    }

    /// Only convergence failures are worth retrying with another budget.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SolverError::SolutionNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_id() {
        let err = SolverError::WrongGeometryKind {
            id: GeoId(12),
            expected: GeoKind::Segment,
            found: GeoKind::Circle,
        };
        assert_eq!(err.to_string(), "geo#12 is a circle, expected a segment");
        assert!(err.is_reference_error());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn convergence_failure_is_recoverable() {
        let err = SolverError::SolutionNotFound {
            reason: StopReason::Stuck,
            iterations: 1486,
            error: 4050.0,
            lambda: f64::INFINITY,
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("damping factor stuck"));
    }
}
