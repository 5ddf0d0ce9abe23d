//! Structured text reports of a sketch's state.
//!
//! Plain text rather than JSON: a failing test prints the report and the
//! offending constraint is visible at a glance.

use std::fmt;

use sketch_solver::evaluate::bind;
use sketch_solver::{ConstraintId, ConstraintKind, Geo, GeoIndex, Sketch};

use crate::helpers::HarnessError;
use crate::oracle::OracleVerdict;

/// A complete sketch report.
pub struct SketchReport {
    pub point_count: usize,
    pub segment_count: usize,
    pub circle_count: usize,
    pub param_count: usize,
    pub constraint_entries: Vec<ConstraintEntry>,
    pub oracle_results: Vec<OracleVerdict>,
}

/// One constraint with its current residual.
pub struct ConstraintEntry {
    pub id: ConstraintId,
    pub kind: ConstraintKind,
    pub residual: f64,
}

impl SketchReport {
    /// Build a report from the current parameter values.
    pub fn from_sketch(sketch: &Sketch) -> Result<Self, HarnessError> {
        let index = GeoIndex::build(sketch);
        let values = sketch.params().as_slice();

        let mut constraint_entries = Vec::with_capacity(sketch.constraints().len());
        for constraint in sketch.constraints() {
            let bound = bind(constraint, &index, sketch)?;
            constraint_entries.push(ConstraintEntry {
                id: constraint.id(),
                kind: constraint.kind(),
                residual: bound.error(values),
            });
        }

        let count = |pred: fn(&Geo) -> bool| sketch.geos().iter().filter(|g| pred(g)).count();

        Ok(Self {
            point_count: count(|g| matches!(g, Geo::Point { .. })),
            segment_count: count(|g| matches!(g, Geo::Segment { .. })),
            circle_count: count(|g| matches!(g, Geo::Circle { .. })),
            param_count: sketch.params().len(),
            constraint_entries,
            oracle_results: Vec::new(),
        })
    }

    pub fn with_oracles(mut self, verdicts: Vec<OracleVerdict>) -> Self {
        self.oracle_results = verdicts;
        self
    }

    pub fn total_error(&self) -> f64 {
        self.constraint_entries.iter().map(|e| e.residual).sum()
    }

    /// Entries whose residual is at least `tol`, worst first.
    pub fn unsatisfied(&self, tol: f64) -> Vec<&ConstraintEntry> {
        let mut entries: Vec<_> = self.constraint_entries.iter().filter(|e| e.residual >= tol).collect();
        entries.sort_by(|a, b| b.residual.total_cmp(&a.residual));
        entries
    }

    /// Format the report as text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Sketch Report ===\n\n");
        out.push_str(&format!(
            "Geometry: {} points, {} segments, {} circles ({} params)\n",
            self.point_count, self.segment_count, self.circle_count, self.param_count,
        ));
        out.push_str(&format!(
            "Constraints ({}, total error {:.3e}):\n",
            self.constraint_entries.len(),
            self.total_error(),
        ));
        for entry in &self.constraint_entries {
            out.push_str(&format!("  {} {:<16} {:.3e}\n", entry.id, entry.kind.tag(), entry.residual));
        }

        if !self.oracle_results.is_empty() {
            out.push_str("\nOracles:\n");
            for verdict in &self.oracle_results {
                let mark = if verdict.passed { "PASS" } else { "FAIL" };
                out.push_str(&format!("  [{}] {}: {}\n", mark, verdict.oracle_name, verdict.detail));
            }
        }
        out
    }
}

impl fmt::Display for SketchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
