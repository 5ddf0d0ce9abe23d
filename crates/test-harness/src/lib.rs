//! Test harness for sketch solver development.
//!
//! Provides programmatic tools for scripting sketch edits, verifying the
//! solved geometry at every step, and printing diagnostic reports.
//!
//! # Key Components
//!
//! - [`SketchWorkbench`] - Fluent API for building and solving named geometry
//! - [`oracle`] - Verification functions returning pass/fail verdicts
//! - [`report`] - Structured text sketch descriptions
//! - [`helpers`] - Error type, tracing setup, fixture sketches
//! - [`assertions`] - Assertion helpers with diagnostics

pub mod assertions;
pub mod helpers;
pub mod oracle;
pub mod report;
pub mod workflow;

pub use helpers::{init_tracing, sample_sketch, HarnessError, SampleSketch};
pub use oracle::OracleVerdict;
pub use report::SketchReport;
pub use workflow::SketchWorkbench;
