//! Assertion helpers with diagnostic output.
//!
//! Each helper returns `Err(HarnessError::AssertionFailed)` carrying the
//! context label, expected value and actual value.

use sketch_solver::{GeoId, Rect, Sketch, SolveReport, SolverError, StopReason};

use crate::helpers::HarnessError;
use crate::oracle::{self, OracleVerdict};

fn verdict_to_result(verdict: OracleVerdict, ctx: &str) -> Result<(), HarnessError> {
    if verdict.passed {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!("[{}] {}: {}", ctx, verdict.oracle_name, verdict.detail),
        })
    }
}

/// Assert a point's position within `tol` on each axis.
pub fn assert_point_near(
    sketch: &Sketch,
    id: GeoId,
    expected: (f64, f64),
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    verdict_to_result(oracle::check_point_at(sketch, id, expected, tol), ctx)
}

pub fn assert_distance(
    sketch: &Sketch,
    a: GeoId,
    b: GeoId,
    expected: f64,
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    verdict_to_result(oracle::check_distance(sketch, a, b, expected, tol), ctx)
}

/// Assert every constraint residual is below `tol`.
pub fn assert_all_satisfied(sketch: &Sketch, tol: f64, ctx: &str) -> Result<(), HarnessError> {
    verdict_to_result(oracle::check_constraints_satisfied(sketch, tol), ctx)
}

pub fn assert_rect_closed(sketch: &Sketch, rect: &Rect, tol: f64, ctx: &str) -> Result<(), HarnessError> {
    verdict_to_result(oracle::check_rect_closed(sketch, rect, tol), ctx)
}

/// Assert parameter values equal a snapshot taken before a failed solve.
pub fn assert_rolled_back(before: &[f64], sketch: &Sketch, ctx: &str) -> Result<(), HarnessError> {
    verdict_to_result(oracle::check_params_restored(before, sketch), ctx)
}

/// Assert a solve ended in `SolutionNotFound`, returning its stop reason.
pub fn assert_solution_not_found(
    result: Result<SolveReport, SolverError>,
    ctx: &str,
) -> Result<StopReason, HarnessError> {
    match result {
        Err(SolverError::SolutionNotFound { reason, .. }) => Ok(reason),
        Err(other) => Err(HarnessError::AssertionFailed {
            detail: format!("[{}] expected SolutionNotFound, got error: {}", ctx, other),
        }),
        Ok(report) => Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] expected SolutionNotFound, but solved in {} iterations (error {:.3e})",
                ctx, report.iterations, report.error
            ),
        }),
    }
}

/// Assert a solve converged within an iteration budget.
pub fn assert_converged_within(
    result: Result<SolveReport, SolverError>,
    max_iterations: usize,
    ctx: &str,
) -> Result<SolveReport, HarnessError> {
    let report = result.map_err(|err| HarnessError::AssertionFailed {
        detail: format!("[{}] expected convergence, got: {}", ctx, err),
    })?;
    if report.iterations > max_iterations {
        return Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] converged after {} iterations, expected at most {}",
                ctx, report.iterations, max_iterations
            ),
        });
    }
    Ok(report)
}
